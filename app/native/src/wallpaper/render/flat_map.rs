//! Equirectangular world map with the day/night terminator.

use std::time::SystemTime;

use super::solar::{subsolar_point, unit_vector};
use super::texture::{Procedural, Surface};
use super::{PixelBuffer, dot, shade_day_night};
use crate::config::FlatMapConfig;

#[derive(Debug)]
pub struct FlatMapRenderer {
    settings: FlatMapConfig,
    day: Surface,
    night: Option<Surface>,
}

impl FlatMapRenderer {
    #[must_use]
    pub fn new(settings: &FlatMapConfig) -> Self {
        Self {
            settings: settings.clone(),
            day: Surface::load_or(&settings.texture, Procedural::EarthDay),
            night: Surface::load_optional(&settings.night_texture),
        }
    }

    pub fn configure(&mut self, settings: &FlatMapConfig) {
        if settings.texture != self.settings.texture {
            self.day = Surface::load_or(&settings.texture, Procedural::EarthDay);
        }
        if settings.night_texture != self.settings.night_texture {
            self.night = Surface::load_optional(&settings.night_texture);
        }
        self.settings = settings.clone();
    }

    pub fn render(&self, width: u32, height: u32, now: SystemTime) -> PixelBuffer {
        let sun = subsolar_point(now);
        let sun_dir = unit_vector(sun.latitude, sun.longitude);
        let night_fallback = Surface::Procedural(Procedural::EarthNight);
        let night = self.night.as_ref().unwrap_or(&night_fallback);
        let (w, h) = (f64::from(width), f64::from(height));

        PixelBuffer::from_fn(width, height, |x, row| {
            let lon = (self.settings.center_longitude + (f64::from(x) + 0.5) / w * 360.0).rem_euclid(360.0) - 180.0;
            let lat = (f64::from(row) + 0.5) / h * 180.0 - 90.0;

            let cos_sun = dot(unit_vector(lat, lon), sun_dir);
            let night = Some(night.sample(lat, lon));
            shade_day_night(self.day.sample(lat, lon), night, cos_sun, self.settings.shading)
        })
    }
}
