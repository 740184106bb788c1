//! Local cache store.
//!
//! Layout under the cache root:
//!
//! ```text
//! images/<source>/<id>.<ext>      downloaded images
//! thumbnails/<source>/<id>.jpg    thumbnail sidecars
//! imports/<id>.<ext>              user imports (the `user` source)
//! output/                         rendered wallpapers
//! ```
//!
//! An entry only counts as valid when its size exceeds the configured
//! minimum, so truncated downloads are never picked up.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::cache::{IMAGES_DIR, IMPORTS_DIR, OUTPUT_DIR, THUMBNAILS_DIR, resolve_cache_dir};
use crate::config::CacheConfig;
use crate::constants::USER_SOURCE;
use crate::platform::path::is_within;

use super::metadata::sanitize_id;
use super::processing::{self, is_supported_image, list_images_in_directory};

/// Errors raised by cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("Not a supported image: {0}")]
    UnsupportedImage(PathBuf),
    #[error("Image not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Processing(#[from] processing::ProcessingError),
}

/// One cached image file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub source: String,
    /// Sanitized id (the file stem).
    pub id: String,
    pub path: PathBuf,
    pub size: u64,
    pub modified: SystemTime,
}

/// File cache keyed by `(source, sanitized id)`.
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
    min_valid_bytes: u64,
}

impl CacheStore {
    #[must_use]
    pub const fn new(root: PathBuf, min_valid_bytes: u64) -> Self { Self { root, min_valid_bytes } }

    /// Builds a store from the `cache` settings.
    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(resolve_cache_dir(&config.directory), config.min_valid_bytes)
    }

    #[must_use]
    pub fn root(&self) -> &Path { &self.root }

    #[must_use]
    pub const fn min_valid_bytes(&self) -> u64 { self.min_valid_bytes }

    #[must_use]
    pub fn images_root(&self) -> PathBuf { self.root.join(IMAGES_DIR) }

    #[must_use]
    pub fn thumbnails_root(&self) -> PathBuf { self.root.join(THUMBNAILS_DIR) }

    #[must_use]
    pub fn imports_root(&self) -> PathBuf { self.root.join(IMPORTS_DIR) }

    #[must_use]
    pub fn output_dir(&self) -> PathBuf { self.root.join(OUTPUT_DIR) }

    /// Directory holding the images of `source`.
    #[must_use]
    pub fn source_dir(&self, source: &str) -> PathBuf {
        if source == USER_SOURCE {
            self.imports_root()
        } else {
            self.images_root().join(sanitize_id(source))
        }
    }

    /// Destination path for a new entry.
    #[must_use]
    pub fn entry_path(&self, source: &str, id: &str, extension: &str) -> PathBuf {
        self.source_dir(source).join(format!("{}.{extension}", sanitize_id(id)))
    }

    /// Thumbnail sidecar path for an entry.
    #[must_use]
    pub fn thumbnail_path(&self, source: &str, id: &str) -> PathBuf {
        self.thumbnails_root()
            .join(sanitize_id(source))
            .join(format!("{}.jpg", sanitize_id(id)))
    }

    /// Returns `true` if `path` lies in the user import tree.
    #[must_use]
    pub fn is_user_import(&self, path: &Path) -> bool { is_within(path, &self.imports_root()) }

    /// Size threshold an entry of `source` has to exceed.
    fn threshold(&self, source: &str) -> u64 {
        // Imports were copied locally and cannot be truncated downloads
        if source == USER_SOURCE { 0 } else { self.min_valid_bytes }
    }

    /// Returns `true` if `path` is a usable entry of `source`.
    #[must_use]
    pub fn is_valid(&self, source: &str, path: &Path) -> bool {
        fs::metadata(path).is_ok_and(|m| m.is_file() && m.len() > self.threshold(source))
    }

    /// Looks up the cached file for `(source, id)` regardless of extension.
    #[must_use]
    pub fn find_entry(&self, source: &str, id: &str) -> Option<CacheEntry> {
        let stem = sanitize_id(id);
        self.entries(source).into_iter().find(|entry| entry.id == stem)
    }

    /// Valid entries of `source`, oldest first.
    ///
    /// New downloads are appended at the end, so positions of existing
    /// entries stay stable between scans.
    #[must_use]
    pub fn entries(&self, source: &str) -> Vec<CacheEntry> {
        let threshold = self.threshold(source);
        let mut entries: Vec<CacheEntry> = list_images_in_directory(&self.source_dir(source))
            .into_iter()
            .filter_map(|path| {
                let meta = fs::metadata(&path).ok()?;
                if meta.len() <= threshold {
                    return None;
                }
                Some(CacheEntry {
                    source: source.to_string(),
                    id: path.file_stem()?.to_string_lossy().into_owned(),
                    size: meta.len(),
                    modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
                    path,
                })
            })
            .collect();

        // Stable sort keeps the natural file-name order for equal timestamps
        entries.sort_by(|a, b| a.modified.cmp(&b.modified));
        entries
    }

    /// Most recently modified valid entry of `source`.
    #[must_use]
    pub fn newest_entry(&self, source: &str) -> Option<CacheEntry> {
        self.entries(source).pop()
    }

    /// Names of sources with a cache directory, sorted.
    #[must_use]
    pub fn sources(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.images_root()) else {
            return Vec::new();
        };

        let mut names: Vec<String> = entries
            .flatten()
            .filter(|e| e.path().is_dir())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort_by(|a, b| natord::compare(a, b));
        names
    }

    /// Maps a cached file back to its `(source, id)`.
    #[must_use]
    pub fn identify(&self, path: &Path) -> Option<(String, String)> {
        let id = path.file_stem()?.to_string_lossy().into_owned();
        if self.is_user_import(path) {
            return Some((USER_SOURCE.to_string(), id));
        }
        if !is_within(path, &self.images_root()) {
            return None;
        }
        let source = path.parent()?.file_name()?.to_string_lossy().into_owned();
        Some((source, id))
    }

    /// Writes the thumbnail sidecar for an entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be decoded or the thumbnail written.
    pub fn write_thumbnail(
        &self,
        source: &str,
        id: &str,
        image: &Path,
    ) -> Result<PathBuf, CacheError> {
        let dest = self.thumbnail_path(source, id);
        processing::write_thumbnail(image, &dest)?;
        Ok(dest)
    }

    /// Copies a local image into the import tree under a fresh id.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is not a supported image or cannot be copied.
    pub fn import(&self, path: &Path) -> Result<CacheEntry, CacheError> {
        if !path.is_file() {
            return Err(CacheError::NotFound(path.display().to_string()));
        }
        if !is_supported_image(path) {
            return Err(CacheError::UnsupportedImage(path.to_path_buf()));
        }

        let extension = path
            .extension()
            .map_or_else(|| "jpg".to_string(), |e| e.to_string_lossy().to_lowercase());
        let id = uuid::Uuid::now_v7().to_string();
        let dest = self.entry_path(USER_SOURCE, &id, &extension);

        fs::create_dir_all(self.imports_root())?;
        let size = fs::copy(path, &dest)?;

        if let Err(err) = self.write_thumbnail(USER_SOURCE, &id, &dest) {
            tracing::warn!(error = %err, path = %dest.display(), "failed to write import thumbnail");
        }

        Ok(CacheEntry {
            source: USER_SOURCE.to_string(),
            id,
            size,
            modified: fs::metadata(&dest)?.modified().unwrap_or_else(|_| SystemTime::now()),
            path: dest,
        })
    }
}
