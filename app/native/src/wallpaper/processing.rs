//! Image processing for wallpapers.
//!
//! Lists image folders, scales images to a target size and writes JPEG files
//! atomically into the cache.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, ImageReader, RgbImage};
use natord::compare;

/// Supported image file extensions.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Thumbnail size written next to every downloaded image.
pub const THUMBNAIL_SIZE: ScreenSize = ScreenSize { width: 320, height: 180 };

/// JPEG quality of rendered output.
pub const OUTPUT_QUALITY: u8 = 95;

/// JPEG quality of thumbnails.
const THUMBNAIL_QUALITY: u8 = 85;

/// Prefix of in-progress files. Never matches a cache entry.
pub const TEMP_PREFIX: &str = ".download-";

/// Errors that can occur during image processing.
#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    /// Failed to read or decode the source image.
    #[error("Failed to read image {path}: {message}")]
    ImageRead { path: String, message: String },
    /// Failed to encode or save the processed image.
    #[error("Failed to save image {path}: {message}")]
    ImageSave { path: String, message: String },
}

impl ProcessingError {
    fn read(path: &Path, err: impl std::fmt::Display) -> Self {
        Self::ImageRead {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }

    fn save(path: &Path, err: impl std::fmt::Display) -> Self {
        Self::ImageSave {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

/// Target dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

impl ScreenSize {
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self { Self { width, height } }
}

/// Returns `true` if the path has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Returns `true` for leftovers of an interrupted write.
#[must_use]
pub fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(TEMP_PREFIX))
}

/// Lists supported images directly inside `dir`, in natural order.
#[must_use]
pub fn list_images_in_directory(dir: &Path) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }

    let mut images = Vec::new();

    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() && is_supported_image(&path) && !is_temp_file(&path) {
                images.push(path);
            }
        }
    }

    images.sort_by(|a, b| compare(a.to_string_lossy().as_ref(), b.to_string_lossy().as_ref()));
    images
}

/// Reads the pixel dimensions of an image without decoding it.
#[must_use]
pub fn image_dimensions(path: &Path) -> Option<(u32, u32)> { image::image_dimensions(path).ok() }

/// Decodes an image file.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or decoded.
pub fn load_image(path: &Path) -> Result<DynamicImage, ProcessingError> {
    ImageReader::open(path)
        .map_err(|e| ProcessingError::read(path, e))?
        .with_guessed_format()
        .map_err(|e| ProcessingError::read(path, e))?
        .decode()
        .map_err(|e| ProcessingError::read(path, e))
}

/// Scales an image to cover `screen`, center-cropping the overflow.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn resize_to_screen(img: &DynamicImage, screen: ScreenSize) -> DynamicImage {
    let (img_width, img_height) = img.dimensions();
    let target_width = screen.width.max(1);
    let target_height = screen.height.max(1);

    if (img_width, img_height) == (target_width, target_height) {
        return img.clone();
    }

    let scale_x = f64::from(target_width) / f64::from(img_width.max(1));
    let scale_y = f64::from(target_height) / f64::from(img_height.max(1));
    let scale = scale_x.max(scale_y);

    let scaled_width = ((f64::from(img_width) * scale).ceil() as u32).max(target_width);
    let scaled_height = ((f64::from(img_height) * scale).ceil() as u32).max(target_height);

    // CatmullRom is close to Lanczos3 in quality at a fraction of the cost
    let resized = img.resize_exact(
        scaled_width,
        scaled_height,
        image::imageops::FilterType::CatmullRom,
    );

    let crop_x = (scaled_width - target_width) / 2;
    let crop_y = (scaled_height - target_height) / 2;

    resized.crop_imm(crop_x, crop_y, target_width, target_height)
}

/// Encodes `img` as JPEG and moves it into place at `dest` in one rename.
///
/// # Errors
///
/// Returns an error if the temporary file cannot be created, encoding fails
/// or the rename fails. No partial file is left at `dest`.
pub fn write_jpeg_atomic(img: &RgbImage, dest: &Path, quality: u8) -> Result<(), ProcessingError> {
    let dir = dest.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| ProcessingError::save(dest, e))?;

    let tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(".jpg")
        .tempfile_in(dir)
        .map_err(|e| ProcessingError::save(dest, e))?;

    {
        let mut writer = BufWriter::new(tmp.as_file());
        let encoder = JpegEncoder::new_with_quality(&mut writer, quality);
        img.write_with_encoder(encoder).map_err(|e| ProcessingError::save(dest, e))?;
        writer.flush().map_err(|e| ProcessingError::save(dest, e))?;
    }

    tmp.persist(dest).map_err(|e| ProcessingError::save(dest, e.error))?;
    Ok(())
}

/// Writes a cover-scaled JPEG thumbnail of `source` to `dest`.
///
/// # Errors
///
/// Returns an error if the source cannot be decoded or the thumbnail cannot be written.
pub fn write_thumbnail(source: &Path, dest: &Path) -> Result<(), ProcessingError> {
    let img = load_image(source)?;
    let thumb = resize_to_screen(&img, THUMBNAIL_SIZE);
    write_jpeg_atomic(&thumb.to_rgb8(), dest, THUMBNAIL_QUALITY)
}
