//! Equirectangular surface textures.

use image::RgbImage;

use crate::platform::path::expand;
use crate::wallpaper::processing::load_image;

/// Linear RGB in `0.0..=255.0`.
pub type Color = [f32; 3];

/// Built-in surfaces used when no texture file is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Procedural {
    EarthDay,
    EarthNight,
    Moon,
}

/// A surface sampled by latitude and longitude.
#[derive(Debug, Clone)]
pub enum Surface {
    Texture(RgbImage),
    Procedural(Procedural),
}

impl Surface {
    /// Loads `path`, falling back to `fallback` when the path is empty or
    /// the image cannot be decoded.
    #[must_use]
    pub fn load_or(path: &str, fallback: Procedural) -> Self {
        if path.trim().is_empty() {
            return Self::Procedural(fallback);
        }

        let resolved = expand(path);
        match load_image(&resolved) {
            Ok(image) => Self::Texture(image.to_rgb8()),
            Err(err) => {
                tracing::warn!(error = %err, path = %resolved.display(), "failed to load texture, using built-in surface");
                Self::Procedural(fallback)
            }
        }
    }

    /// Loads an optional texture; an empty path yields `None`.
    #[must_use]
    pub fn load_optional(path: &str) -> Option<Self> {
        if path.trim().is_empty() {
            return None;
        }
        let resolved = expand(path);
        load_image(&resolved)
            .map(|image| Self::Texture(image.to_rgb8()))
            .map_err(|err| {
                tracing::warn!(error = %err, path = %resolved.display(), "failed to load texture");
            })
            .ok()
    }

    /// Color at a point, in degrees.
    #[must_use]
    pub fn sample(&self, latitude: f64, longitude: f64) -> Color {
        match self {
            Self::Texture(image) => sample_bilinear(image, latitude, longitude),
            Self::Procedural(kind) => procedural(*kind, latitude, longitude),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn sample_bilinear(image: &RgbImage, latitude: f64, longitude: f64) -> Color {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return [0.0; 3];
    }

    let u = ((longitude + 180.0) / 360.0).rem_euclid(1.0) * f64::from(width) - 0.5;
    let v = ((90.0 - latitude) / 180.0).clamp(0.0, 1.0) * f64::from(height) - 0.5;

    let x0 = u.floor();
    let y0 = v.floor();
    let fx = (u - x0) as f32;
    let fy = (v - y0) as f32;

    let wrap_x = |x: f64| (x.rem_euclid(f64::from(width))) as u32;
    let clamp_y = |y: f64| y.clamp(0.0, f64::from(height - 1)) as u32;

    let (xa, xb) = (wrap_x(x0), wrap_x(x0 + 1.0));
    let (ya, yb) = (clamp_y(y0), clamp_y(y0 + 1.0));

    let texel = |x: u32, y: u32| {
        let p = image.get_pixel(x.min(width - 1), y).0;
        [f32::from(p[0]), f32::from(p[1]), f32::from(p[2])]
    };

    let top = lerp(texel(xa, ya), texel(xb, ya), fx);
    let bottom = lerp(texel(xa, yb), texel(xb, yb), fx);
    lerp(top, bottom, fy)
}

#[allow(clippy::cast_possible_truncation)]
fn procedural(kind: Procedural, latitude: f64, longitude: f64) -> Color {
    let (lat, lon) = (latitude.to_radians(), longitude.to_radians());
    match kind {
        Procedural::EarthDay => {
            if latitude.abs() > 70.0 {
                return [235.0, 240.0, 245.0];
            }
            let land = (3.0 * lon).sin() * (2.0 * lat).cos() + 0.5 * (5.0 * lon + 1.3).sin() * (4.0 * lat).sin();
            if land > 0.35 {
                let shade = (0.85 + 0.15 * (7.0 * lon).cos() * lat.cos()) as f32;
                [70.0 * shade, 110.0 * shade, 50.0 * shade]
            } else {
                let depth = (0.8 + 0.2 * lat.cos()) as f32;
                [18.0 * depth, 52.0 * depth, 110.0 * depth]
            }
        }
        Procedural::EarthNight => [5.0, 8.0, 18.0],
        Procedural::Moon => {
            let maria = (2.0 * lon + 0.7).sin() * (3.0 * lat).cos();
            let craters = 0.08 * (11.0 * lon).sin() * (9.0 * lat).cos();
            let gray = (150.0 - if maria > 0.55 { 45.0 } else { 0.0 } + 120.0 * craters) as f32;
            [gray, gray, gray * 0.97]
        }
    }
}

/// Linear interpolation between two colors.
#[must_use]
pub fn lerp(a: Color, b: Color, t: f32) -> Color {
    [a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t, a[2] + (b[2] - a[2]) * t]
}

/// Scales a color.
#[must_use]
pub fn scale(color: Color, factor: f32) -> Color { [color[0] * factor, color[1] * factor, color[2] * factor] }

/// Hermite step between `edge0` and `edge1`.
#[must_use]
pub fn smoothstep(edge0: f64, edge1: f64, x: f64) -> f64 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
