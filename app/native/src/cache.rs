//! Cache directory utilities.
//!
//! Provides a centralized way to get the application's cache directory.
//! Uses the platform cache directory (`~/.cache/terrapaper` on Linux,
//! `~/Library/Caches/terrapaper` on macOS) with a fallback to
//! `/tmp/terrapaper` if the cache directory is unavailable.
//!
//! Layout below the root:
//!
//! - `images/<source>/<id>.<ext>` - downloaded provider images
//! - `thumbnails/<source>/<id>.jpg` - thumbnail sidecars
//! - `imports/<id>.<ext>` - images imported by the user
//! - `output/` - rendered wallpapers handed to the desktop

use std::path::{Path, PathBuf};

use crate::constants::APP_ID;
use crate::platform::path::expand;

/// Subdirectory holding downloaded provider images.
pub const IMAGES_DIR: &str = "images";

/// Subdirectory holding thumbnail sidecars.
pub const THUMBNAILS_DIR: &str = "thumbnails";

/// Subdirectory holding user-imported images.
pub const IMPORTS_DIR: &str = "imports";

/// Subdirectory holding rendered wallpapers.
pub const OUTPUT_DIR: &str = "output";

/// Returns the default root cache directory for the application.
#[must_use]
pub fn get_cache_dir() -> PathBuf {
    dirs::cache_dir().map_or_else(|| PathBuf::from(format!("/tmp/{APP_ID}")), |cache| cache.join(APP_ID))
}

/// Returns the cache root to use for a configured directory.
///
/// An empty value selects the platform default; anything else is tilde-expanded.
#[must_use]
pub fn resolve_cache_dir(configured: &str) -> PathBuf {
    if configured.trim().is_empty() {
        get_cache_dir()
    } else {
        expand(configured)
    }
}

/// Clears the regenerable parts of a cache root.
///
/// Removes downloaded images, thumbnails and rendered output. Imported user
/// images are originals and are left in place.
///
/// # Returns
///
/// * `Ok(bytes_freed)` - The approximate number of bytes freed
/// * `Err(error)` - If the operation failed
///
/// # Errors
///
/// Returns an error if a directory exists but cannot be measured or removed.
pub fn clear_cache(root: &Path) -> std::io::Result<u64> {
    let mut bytes_freed = 0u64;

    for subdir in [IMAGES_DIR, THUMBNAILS_DIR, OUTPUT_DIR] {
        let dir = root.join(subdir);
        if !dir.exists() {
            continue;
        }

        bytes_freed += calculate_dir_size(&dir)?;
        std::fs::remove_dir_all(&dir)?;
    }

    Ok(bytes_freed)
}

/// Calculates the total size of a directory in bytes.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn calculate_dir_size(path: &Path) -> std::io::Result<u64> {
    let mut total = 0u64;

    if path.is_dir() {
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                total += calculate_dir_size(&path)?;
            } else {
                total += entry.metadata().map(|m| m.len()).unwrap_or(0);
            }
        }
    }

    Ok(total)
}

/// Formats a byte count as a human-readable string.
///
/// # Returns
///
/// A human-readable string like "1.5 MB" or "256 KB"
#[must_use]
#[allow(clippy::cast_precision_loss)] // Precision loss is acceptable for human-readable output
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} bytes")
    }
}
