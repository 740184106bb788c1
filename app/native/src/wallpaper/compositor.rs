//! Multi-display compositing.
//!
//! In independent mode every display is rendered at its own size and the
//! results are blitted into one canvas covering the union of all display
//! bounds. The canvas is then installed as a single spanned wallpaper.

use rayon::prelude::*;

use crate::config::{Bounds, DisplayConfig, TerrapaperConfig};

use super::render::PixelBuffer;

/// One monitor in virtual-desktop coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRegion {
    pub device_id: String,
    pub bounds: Bounds,
}

impl DisplayRegion {
    #[must_use]
    pub fn from_config(display: &DisplayConfig) -> Self {
        Self { device_id: display.id.clone(), bounds: display.bounds }
    }
}

/// Union of all display bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeLayout {
    pub min_left: i64,
    pub min_top: i64,
    pub width: u32,
    pub height: u32,
}

impl CompositeLayout {
    /// Computes the layout of `regions`. `None` when there is nothing to draw.
    #[must_use]
    pub fn from_regions(regions: &[DisplayRegion]) -> Option<Self> {
        let visible = regions.iter().filter(|r| r.bounds.width > 0 && r.bounds.height > 0);

        let (mut left, mut top, mut right, mut bottom) = (i64::MAX, i64::MAX, i64::MIN, i64::MIN);
        let mut any = false;
        for region in visible {
            any = true;
            left = left.min(i64::from(region.bounds.x));
            top = top.min(i64::from(region.bounds.y));
            right = right.max(region.bounds.right());
            bottom = bottom.max(region.bounds.bottom());
        }
        if !any {
            return None;
        }

        Some(Self {
            min_left: left,
            min_top: top,
            width: u32::try_from(right - left).ok()?,
            height: u32::try_from(bottom - top).ok()?,
        })
    }

    /// Offset of `bounds` inside the canvas.
    #[must_use]
    pub fn offset_of(&self, bounds: &Bounds) -> (i64, i64) {
        (i64::from(bounds.x) - self.min_left, i64::from(bounds.y) - self.min_top)
    }
}

/// Top-down RGBA canvas covering the whole virtual desktop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Canvas {
    /// Opaque black canvas.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        let mut data = vec![0u8; width as usize * height as usize * 4];
        data.chunks_exact_mut(4).for_each(|px| px[3] = u8::MAX);
        Self { width, height, data }
    }

    #[must_use]
    pub const fn width(&self) -> u32 { self.width }

    #[must_use]
    pub const fn height(&self) -> u32 { self.height }

    /// Pixel at `(x, y)` counted from the top-left corner.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    /// Copies a bottom-up buffer to `(left, top)`, flipping it upright and
    /// clipping whatever falls outside the canvas.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_possible_wrap)]
    pub fn blit_bottom_up(&mut self, buffer: &PixelBuffer, left: i64, top: i64) {
        let canvas_w = i64::from(self.width);
        let canvas_h = i64::from(self.height);
        let src_w = i64::from(buffer.width());
        let src_h = i64::from(buffer.height());

        let x0 = left.max(0);
        let x1 = (left + src_w).min(canvas_w);
        if x0 >= x1 {
            return;
        }
        let y0 = top.max(0);
        let y1 = (top + src_h).min(canvas_h);
        if y0 >= y1 {
            return;
        }

        let row_len = self.width as usize * 4;
        let copy_len = (x1 - x0) as usize * 4;
        let src_x = (x0 - left) as usize * 4;

        self.data
            .par_chunks_mut(row_len)
            .enumerate()
            .skip(y0 as usize)
            .take((y1 - y0) as usize)
            .for_each(|(y, line)| {
                // Source row counted from the top of the display, then flipped
                let from_top = y as i64 - top;
                let src_row = (src_h - 1 - from_top) as u32;
                let src = &buffer.row(src_row)[src_x..src_x + copy_len];
                let dst = x0 as usize * 4;
                line[dst..dst + copy_len].copy_from_slice(src);
            });
    }

    /// Top-down RGB copy for encoding.
    #[must_use]
    pub fn to_rgb_image(&self) -> image::RgbImage {
        let rgb: Vec<u8> = self.data.chunks_exact(4).flat_map(|px| [px[0], px[1], px[2]]).collect();
        image::RgbImage::from_raw(self.width, self.height, rgb)
            .unwrap_or_else(|| image::RgbImage::new(self.width, self.height))
    }
}

/// Settings for one display: its overrides on top of the global settings.
#[must_use]
pub fn display_settings(global: &TerrapaperConfig, display: &DisplayConfig) -> TerrapaperConfig {
    let mut settings = global.clone();
    if let Some(mode) = display.mode {
        settings.mode = mode;
    }
    if let Some(globe) = &display.globe {
        settings.globe = globe.clone();
    }
    if let Some(flat_map) = &display.flat_map {
        settings.flat_map = flat_map.clone();
    }
    if let Some(moon) = &display.moon {
        settings.moon = moon.clone();
    }
    if let Some(static_image) = &display.static_image {
        settings.static_image = static_image.clone();
    }
    settings.width = display.bounds.width;
    settings.height = display.bounds.height;
    settings.displays = vec![display.clone()];
    settings
}
