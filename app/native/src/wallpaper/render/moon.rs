//! The moon in its current phase.

use std::time::SystemTime;

use super::globe::orthographic_inverse;
use super::solar::{moon_phase, moon_sun_direction};
use super::texture::{Procedural, Surface, scale};
use super::{PixelBuffer, dot};
use crate::config::MoonConfig;

/// Light reaching the night side from the Earth.
const EARTHSHINE: f32 = 0.04;

#[derive(Debug)]
pub struct MoonRenderer {
    settings: MoonConfig,
    surface: Surface,
}

impl MoonRenderer {
    #[must_use]
    pub fn new(settings: &MoonConfig) -> Self {
        Self {
            settings: settings.clone(),
            surface: Surface::load_or(&settings.texture, Procedural::Moon),
        }
    }

    pub fn configure(&mut self, settings: &MoonConfig) {
        if settings.texture != self.settings.texture {
            self.surface = Surface::load_or(&settings.texture, Procedural::Moon);
        }
        self.settings = settings.clone();
    }

    pub fn render(&self, width: u32, height: u32, now: SystemTime) -> PixelBuffer {
        self.render_phase(width, height, moon_phase(now))
    }

    /// Renders the moon at an explicit phase in `[0, 1)`.
    pub fn render_phase(&self, width: u32, height: u32, phase: f64) -> PixelBuffer {
        let sun = moon_sun_direction(phase);
        let radius = self.settings.zoom.max(0.05) * f64::from(width.min(height)) / 2.0;
        let (cx, cy) = (f64::from(width) / 2.0, f64::from(height) / 2.0);

        PixelBuffer::from_fn(width, height, |x, row| {
            let px = (f64::from(x) + 0.5 - cx) / radius;
            let py = (f64::from(row) + 0.5 - cy) / radius;
            let Some((lat, lon)) = orthographic_inverse(px, py, 0.0, 0.0) else {
                return [0.0; 3];
            };

            let pz = (1.0 - px * px - py * py).max(0.0).sqrt();
            #[allow(clippy::cast_possible_truncation)]
            let light = dot([px, py, pz], sun).max(0.0) as f32;
            scale(self.surface.sample(lat, lon), EARTHSHINE + (1.0 - EARTHSHINE) * light)
        })
    }
}
