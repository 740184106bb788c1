//! Favorite images.
//!
//! Favorites outlive the cache: every record keeps the provider URLs so the
//! image can be fetched again after a retention sweep, and the ids of all
//! favorites protect their cache entries from the sweep.
//!
//! The list is persisted as JSON in the config directory and guarded by a
//! mutex, since the render worker reads it while building rotation pools
//! and user commands append to it.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::metadata::sanitize_id;
use super::retention::ProtectedEntries;
use super::store::CacheStore;

/// File name of the favorites list inside the config directory.
pub const FAVORITES_FILE: &str = "favorites.json";

/// Errors raised while persisting favorites.
#[derive(Debug, thiserror::Error)]
pub enum FavoritesError {
    #[error("Failed to write favorites: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to encode favorites: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A user-curated image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FavoriteRecord {
    pub source: String,
    pub image_id: String,
    pub title: String,
    pub thumbnail_url: String,
    pub full_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_cache_path: Option<PathBuf>,
}

impl FavoriteRecord {
    fn matches(&self, source: &str, image_id: &str) -> bool {
        self.source == source && self.image_id == image_id
    }
}

/// Persistent, mutex-guarded favorites list.
#[derive(Debug)]
pub struct Favorites {
    path: PathBuf,
    records: Mutex<Vec<FavoriteRecord>>,
}

impl Favorites {
    /// Loads favorites from `path`.
    ///
    /// A missing file yields an empty list; an unreadable one is logged and
    /// treated as empty so the daemon keeps running.
    #[must_use]
    pub fn load(path: PathBuf) -> Self {
        let records = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|err| {
                tracing::warn!(error = %err, path = %path.display(), "ignoring unreadable favorites file");
                Vec::new()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => {
                tracing::warn!(error = %err, path = %path.display(), "failed to read favorites file");
                Vec::new()
            }
        };

        Self { path, records: Mutex::new(records) }
    }

    /// Loads `favorites.json` from the config directory.
    #[must_use]
    pub fn load_from_dir(config_dir: &Path) -> Self { Self::load(config_dir.join(FAVORITES_FILE)) }

    #[must_use]
    pub fn path(&self) -> &Path { &self.path }

    /// Snapshot of all records in insertion order.
    #[must_use]
    pub fn list(&self) -> Vec<FavoriteRecord> { self.records.lock().clone() }

    #[must_use]
    pub fn len(&self) -> usize { self.records.lock().len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.records.lock().is_empty() }

    #[must_use]
    pub fn contains(&self, source: &str, image_id: &str) -> bool {
        self.records.lock().iter().any(|r| r.matches(source, image_id))
    }

    /// Adds a record, replacing an existing one for the same image.
    ///
    /// Returns `true` if the image was not a favorite before.
    ///
    /// # Errors
    ///
    /// Returns an error if the list cannot be persisted. The in-memory list
    /// is left unchanged in that case.
    pub fn add(&self, record: FavoriteRecord) -> Result<bool, FavoritesError> {
        let mut records = self.records.lock();
        let mut next = records.clone();

        let added = match next.iter_mut().find(|r| r.matches(&record.source, &record.image_id)) {
            Some(existing) => {
                *existing = record;
                false
            }
            None => {
                next.push(record);
                true
            }
        };

        self.persist(&next)?;
        *records = next;
        Ok(added)
    }

    /// Removes a record. Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the list cannot be persisted.
    pub fn remove(&self, source: &str, image_id: &str) -> Result<bool, FavoritesError> {
        let mut records = self.records.lock();
        let next: Vec<FavoriteRecord> =
            records.iter().filter(|r| !r.matches(source, image_id)).cloned().collect();

        if next.len() == records.len() {
            return Ok(false);
        }

        self.persist(&next)?;
        *records = next;
        Ok(true)
    }

    /// Sanitized `(source, id)` pairs protected from the retention sweep.
    #[must_use]
    pub fn protected_entries(&self) -> ProtectedEntries {
        self.records
            .lock()
            .iter()
            .map(|r| (sanitize_id(&r.source), sanitize_id(&r.image_id)))
            .collect()
    }

    /// Local files of all favorites that still resolve to a valid entry.
    ///
    /// `localCachePath` is tried first, then the cache path derived from
    /// `(source, id)`.
    #[must_use]
    pub fn resolve_paths(&self, store: &CacheStore) -> Vec<PathBuf> {
        self.list().iter().filter_map(|record| resolve_record(store, record)).collect()
    }

    fn persist(&self, records: &[FavoriteRecord]) -> Result<(), FavoritesError> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let tmp = tempfile::NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer_pretty(&mut writer, records)?;
            writer.flush()?;
        }
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Resolves one favorite to a valid local file.
#[must_use]
pub fn resolve_record(store: &CacheStore, record: &FavoriteRecord) -> Option<PathBuf> {
    record
        .local_cache_path
        .as_ref()
        .filter(|path| store.is_valid(&record.source, path))
        .cloned()
        .or_else(|| store.find_entry(&record.source, &record.image_id).map(|e| e.path))
}
