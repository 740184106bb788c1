//! A still image scaled to cover the target.

use std::path::{Path, PathBuf};

use image::DynamicImage;

use super::{PixelBuffer, RenderError};
use crate::wallpaper::processing::{ScreenSize, load_image, resize_to_screen};

/// Renders the resolved image, caching both the decode and the last scaled
/// frame.
#[derive(Debug, Default)]
pub struct StaticImageRenderer {
    image: Option<PathBuf>,
    decoded: Option<(PathBuf, DynamicImage)>,
    scaled: Option<(u32, u32, PixelBuffer)>,
}

impl StaticImageRenderer {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Currently selected image.
    #[must_use]
    pub fn image(&self) -> Option<&Path> { self.image.as_deref() }

    pub fn set_image(&mut self, path: Option<&Path>) {
        if self.image.as_deref() != path {
            self.image = path.map(Path::to_path_buf);
            self.scaled = None;
        }
    }

    /// Renders the selected image at `width` × `height`.
    ///
    /// # Errors
    ///
    /// Returns an error if no image is selected or it cannot be decoded.
    pub fn render(&mut self, width: u32, height: u32) -> Result<PixelBuffer, RenderError> {
        let path = self.image.clone().ok_or(RenderError::NoImage)?;

        if let Some((w, h, buffer)) = &self.scaled
            && (*w, *h) == (width, height)
        {
            return Ok(buffer.clone());
        }

        let image = match self.decoded.take() {
            Some((decoded_path, image)) if decoded_path == path => image,
            _ => load_image(&path)?,
        };

        let frame = resize_to_screen(&image, ScreenSize::new(width, height));
        let buffer = PixelBuffer::from_top_down(&frame.to_rgba8());

        self.decoded = Some((path, image));
        self.scaled = Some((width, height, buffer.clone()));
        Ok(buffer)
    }
}
