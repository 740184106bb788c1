//! Wallpaper installation.
//!
//! Rendered frames are encoded into the cache's output directory and the
//! resulting file is handed to the desktop. The core always installs exactly
//! one file per cycle.

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;

use crate::config::FitStyle;

use super::processing::{OUTPUT_QUALITY, ProcessingError, write_jpeg_atomic};

/// File names the output writer alternates between.
pub const OUTPUT_NAMES: [&str; 2] = ["wallpaper-a.jpg", "wallpaper-b.jpg"];

/// Errors that can occur when installing the wallpaper.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("Wallpaper file not found: {0}")]
    FileNotFound(PathBuf),
    #[error("Failed to set wallpaper: {0}")]
    Failed(String),
    #[error(transparent)]
    Encode(#[from] ProcessingError),
}

/// Sets a file as the desktop background.
pub trait WallpaperInstaller: Send + Sync {
    /// Installs `path` using the given placement style.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or the desktop rejects it.
    fn install(&self, path: &Path, fit: FitStyle) -> Result<(), InstallError>;
}

/// Installs wallpapers through the platform desktop API.
#[derive(Debug, Clone, Copy, Default)]
pub struct DesktopInstaller;

impl WallpaperInstaller for DesktopInstaller {
    fn install(&self, path: &Path, fit: FitStyle) -> Result<(), InstallError> {
        if !path.exists() {
            return Err(InstallError::FileNotFound(path.to_path_buf()));
        }

        // Not every desktop supports every mode; the image is still set
        if let Err(err) = wallpaper::set_mode(desktop_mode(fit)) {
            tracing::warn!(error = %err, ?fit, "failed to set wallpaper mode");
        }

        let path_str = path.display().to_string();
        wallpaper::set_from_path(&path_str).map_err(|e| InstallError::Failed(e.to_string()))?;
        tracing::debug!(path = %path_str, ?fit, "wallpaper installed");
        Ok(())
    }
}

const fn desktop_mode(fit: FitStyle) -> wallpaper::Mode {
    match fit {
        FitStyle::Center => wallpaper::Mode::Center,
        FitStyle::Crop => wallpaper::Mode::Crop,
        FitStyle::Fit => wallpaper::Mode::Fit,
        FitStyle::Span => wallpaper::Mode::Span,
        FitStyle::Stretch => wallpaper::Mode::Stretch,
        FitStyle::Tile => wallpaper::Mode::Tile,
    }
}

/// Encodes frames into the output directory.
///
/// Two file names are used in turn: desktops cache wallpapers by path, so
/// rewriting the installed file in place would not show the new frame.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    dir: PathBuf,
}

impl OutputWriter {
    #[must_use]
    pub const fn new(dir: PathBuf) -> Self { Self { dir } }

    #[must_use]
    pub fn dir(&self) -> &Path { &self.dir }

    /// The slot the next frame goes to: a missing one, else the older one.
    #[must_use]
    pub fn next_path(&self) -> PathBuf {
        let modified = |name: &str| fs::metadata(self.dir.join(name)).and_then(|m| m.modified()).ok();

        let slot = match (modified(OUTPUT_NAMES[0]), modified(OUTPUT_NAMES[1])) {
            (None, _) => OUTPUT_NAMES[0],
            (Some(_), None) => OUTPUT_NAMES[1],
            (Some(a), Some(b)) => {
                if a <= b {
                    OUTPUT_NAMES[0]
                } else {
                    OUTPUT_NAMES[1]
                }
            }
        };
        self.dir.join(slot)
    }

    /// Encodes `image` as JPEG into the next slot.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the atomic rename fails.
    pub fn write(&self, image: &RgbImage) -> Result<PathBuf, InstallError> {
        let path = self.next_path();
        write_jpeg_atomic(image, &path, OUTPUT_QUALITY)?;
        Ok(path)
    }
}
