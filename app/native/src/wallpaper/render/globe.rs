//! Orthographic Earth.

use std::time::SystemTime;

use super::solar::{subsolar_point, unit_vector};
use super::texture::{Procedural, Surface, scale};
use super::{PixelBuffer, dot, shade_day_night};
use crate::config::GlobeConfig;

/// Inverse orthographic projection.
///
/// `(x, y)` are view-plane coordinates in sphere radii with `y` pointing up;
/// the result is `(latitude, longitude)` in degrees, or `None` off the disc.
#[must_use]
pub fn orthographic_inverse(x: f64, y: f64, center_lat: f64, center_lon: f64) -> Option<(f64, f64)> {
    let rho = x.hypot(y);
    if rho > 1.0 {
        return None;
    }
    if rho < f64::EPSILON {
        return Some((center_lat, center_lon));
    }

    let (lat0, lon0) = (center_lat.to_radians(), center_lon.to_radians());
    let c = rho.asin();
    let (sin_c, cos_c) = c.sin_cos();

    let lat = (cos_c * lat0.sin() + y * sin_c * lat0.cos() / rho).clamp(-1.0, 1.0).asin();
    let lon = lon0 + (x * sin_c).atan2(rho * cos_c * lat0.cos() - y * sin_c * lat0.sin());

    Some((lat.to_degrees(), (lon.to_degrees() + 180.0).rem_euclid(360.0) - 180.0))
}

#[derive(Debug)]
pub struct GlobeRenderer {
    settings: GlobeConfig,
    day: Surface,
    night: Option<Surface>,
}

impl GlobeRenderer {
    #[must_use]
    pub fn new(settings: &GlobeConfig) -> Self {
        Self {
            settings: settings.clone(),
            day: Surface::load_or(&settings.texture, Procedural::EarthDay),
            night: Surface::load_optional(&settings.night_texture),
        }
    }

    pub fn configure(&mut self, settings: &GlobeConfig) {
        if settings.texture != self.settings.texture {
            self.day = Surface::load_or(&settings.texture, Procedural::EarthDay);
        }
        if settings.night_texture != self.settings.night_texture {
            self.night = Surface::load_optional(&settings.night_texture);
        }
        self.settings = settings.clone();
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn render(&self, width: u32, height: u32, now: SystemTime) -> PixelBuffer {
        let sun = subsolar_point(now);
        let sun_dir = unit_vector(sun.latitude, sun.longitude);
        let night_fallback = Surface::Procedural(Procedural::EarthNight);
        let night = self.night.as_ref().unwrap_or(&night_fallback);

        let radius = self.settings.zoom.max(0.05) * f64::from(width.min(height)) / 2.0;
        let (cx, cy) = (f64::from(width) / 2.0, f64::from(height) / 2.0);
        let (lat0, lon0) = (self.settings.latitude.clamp(-90.0, 90.0), self.settings.longitude);

        PixelBuffer::from_fn(width, height, |x, row| {
            let px = (f64::from(x) + 0.5 - cx) / radius;
            let py = (f64::from(row) + 0.5 - cy) / radius;
            let Some((lat, lon)) = orthographic_inverse(px, py, lat0, lon0) else {
                return [0.0; 3];
            };

            let day = self.day.sample(lat, lon);
            let cos_sun = dot(unit_vector(lat, lon), sun_dir);
            let color = shade_day_night(day, Some(night.sample(lat, lon)), cos_sun, self.settings.shading);

            // Limb darkening
            #[allow(clippy::cast_possible_truncation)]
            let limb = (0.75 + 0.25 * (1.0 - px * px - py * py).max(0.0).sqrt()) as f32;
            scale(color, limb)
        })
    }
}
