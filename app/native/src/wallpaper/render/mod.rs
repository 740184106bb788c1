//! Renderers.
//!
//! Four interchangeable variants turn the current settings into an RGBA
//! pixel buffer. Procedural variants depend on the wall clock, which is
//! quantized to the minute, so two renders within the same minute with the
//! same settings are pixel-identical.
//!
//! Buffers are stored bottom-up: row 0 is the bottom scanline.

pub mod flat_map;
pub mod globe;
pub mod moon;
pub mod solar;
pub mod static_image;
pub mod texture;

use std::path::Path;
use std::time::SystemTime;

use image::{RgbImage, RgbaImage};
use rayon::prelude::*;

pub use flat_map::FlatMapRenderer;
pub use globe::GlobeRenderer;
pub use moon::MoonRenderer;
pub use static_image::StaticImageRenderer;

use self::texture::{Color, lerp, scale, smoothstep};
use crate::config::{RenderMode, TerrapaperConfig};
use crate::wallpaper::processing::ProcessingError;

/// Errors raised while rendering.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Invalid render size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
    #[error("No image to render")]
    NoImage,
    #[error(transparent)]
    Processing(#[from] ProcessingError),
}

/// Bottom-up RGBA8 pixels with opaque alpha.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Opaque black buffer.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let mut data = vec![0u8; width as usize * height as usize * 4];
        data.chunks_exact_mut(4).for_each(|px| px[3] = u8::MAX);
        Self { width, height, data }
    }

    /// Fills a buffer in parallel, one row per task.
    ///
    /// `shade(x, row)` receives the bottom-up row index.
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_fn<F>(width: u32, height: u32, shade: F) -> Self
    where F: Fn(u32, u32) -> Color + Sync {
        let row_len = width as usize * 4;
        let mut data = vec![0u8; row_len * height as usize];

        if row_len > 0 {
            data.par_chunks_mut(row_len).enumerate().for_each(|(row, line)| {
                for (x, px) in line.chunks_exact_mut(4).enumerate() {
                    let color = shade(x as u32, row as u32);
                    px.copy_from_slice(&to_rgba(color));
                }
            });
        }

        Self { width, height, data }
    }

    /// Converts a top-down image, forcing alpha to opaque.
    #[must_use]
    pub fn from_top_down(image: &RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        let row_len = width as usize * 4;
        let mut data = Vec::with_capacity(row_len * height as usize);

        if row_len > 0 {
            for line in image.as_raw().chunks_exact(row_len).rev() {
                data.extend_from_slice(line);
            }
        }
        data.chunks_exact_mut(4).for_each(|px| px[3] = u8::MAX);

        Self { width, height, data }
    }

    #[must_use]
    pub const fn width(&self) -> u32 { self.width }

    #[must_use]
    pub const fn height(&self) -> u32 { self.height }

    /// Raw bytes, bottom row first.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] { &self.data }

    /// One bottom-up row.
    #[must_use]
    pub fn row(&self, row: u32) -> &[u8] {
        let row_len = self.width as usize * 4;
        let start = row as usize * row_len;
        &self.data[start..start + row_len]
    }

    /// Pixel at `x` in bottom-up `row`.
    #[must_use]
    pub fn pixel(&self, x: u32, row: u32) -> [u8; 4] {
        let i = (row as usize * self.width as usize + x as usize) * 4;
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    /// Top-down RGB copy for encoding.
    #[must_use]
    pub fn to_rgb_image(&self) -> RgbImage {
        let mut rgb = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for row in (0..self.height).rev() {
            for px in self.row(row).chunks_exact(4) {
                rgb.extend_from_slice(&px[..3]);
            }
        }
        RgbImage::from_raw(self.width, self.height, rgb).unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_rgba(color: Color) -> [u8; 4] {
    let channel = |v: f32| v.round().clamp(0.0, 255.0) as u8;
    [channel(color[0]), channel(color[1]), channel(color[2]), u8::MAX]
}

/// Blends day and night colors by the cosine of the sun's zenith angle.
pub(crate) fn shade_day_night(day: Color, night: Option<Color>, cos_sun: f64, shading: bool) -> Color {
    if !shading {
        return day;
    }
    #[allow(clippy::cast_possible_truncation)]
    let light = smoothstep(-0.1, 0.1, cos_sun) as f32;
    let night = night.unwrap_or_else(|| scale(day, 0.08));
    lerp(night, day, light)
}

/// Dot product.
pub(crate) fn dot(a: [f64; 3], b: [f64; 3]) -> f64 { a[0] * b[0] + a[1] * b[1] + a[2] * b[2] }

/// One renderer variant, owning its own resources.
#[derive(Debug)]
pub enum Renderer {
    Globe(GlobeRenderer),
    FlatMap(FlatMapRenderer),
    Moon(MoonRenderer),
    StaticImage(StaticImageRenderer),
}

impl Renderer {
    /// Builds the variant for `config.mode`.
    #[must_use]
    pub fn for_config(config: &TerrapaperConfig) -> Self {
        let renderer = match config.mode {
            RenderMode::Globe => Self::Globe(GlobeRenderer::new(&config.globe)),
            RenderMode::FlatMap => Self::FlatMap(FlatMapRenderer::new(&config.flat_map)),
            RenderMode::Moon => Self::Moon(MoonRenderer::new(&config.moon)),
            RenderMode::StaticImage => Self::StaticImage(StaticImageRenderer::new()),
        };
        tracing::debug!(mode = config.mode.display_name(), "renderer initialized");
        renderer
    }

    #[must_use]
    pub const fn mode(&self) -> RenderMode {
        match self {
            Self::Globe(_) => RenderMode::Globe,
            Self::FlatMap(_) => RenderMode::FlatMap,
            Self::Moon(_) => RenderMode::Moon,
            Self::StaticImage(_) => RenderMode::StaticImage,
        }
    }

    /// Applies new settings of the same mode, reloading textures that changed.
    pub fn configure(&mut self, config: &TerrapaperConfig) {
        match self {
            Self::Globe(renderer) => renderer.configure(&config.globe),
            Self::FlatMap(renderer) => renderer.configure(&config.flat_map),
            Self::Moon(renderer) => renderer.configure(&config.moon),
            Self::StaticImage(_) => {}
        }
    }

    /// Sets the image a static-image renderer draws. Ignored by the others.
    pub fn set_image(&mut self, path: Option<&Path>) {
        if let Self::StaticImage(renderer) = self {
            renderer.set_image(path);
        }
    }

    /// Renders a `width` × `height` frame for the minute containing `now`.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty size, or when a static image is missing
    /// or cannot be decoded.
    pub fn render(&mut self, width: u32, height: u32, now: SystemTime) -> Result<PixelBuffer, RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidSize { width, height });
        }

        let now = solar::quantize_to_minute(now);
        match self {
            Self::Globe(renderer) => Ok(renderer.render(width, height, now)),
            Self::FlatMap(renderer) => Ok(renderer.render(width, height, now)),
            Self::Moon(renderer) => Ok(renderer.render(width, height, now)),
            Self::StaticImage(renderer) => renderer.render(width, height),
        }
    }
}
