//! Cache retention sweep.
//!
//! Runs once at startup. For every source directory the newest file is
//! always kept; older files past the maximum age are deleted unless a
//! favorite of that same source protects them. Thumbnails are swept the same
//! way without protection. Deletion failures are logged and the sweep
//! continues.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use crate::config::CacheConfig;

use super::store::CacheStore;

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Entries spared by the sweep, as sanitized `(source, id)` pairs.
pub type ProtectedEntries = HashSet<(String, String)>;

/// Maximum ages for the two cache kinds. `None` keeps files forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub max_age: Option<Duration>,
    pub thumbnail_max_age: Option<Duration>,
}

impl RetentionPolicy {
    /// Converts day counts, where 0 disables the sweep for that kind.
    #[must_use]
    pub fn from_days(max_age_days: u32, thumbnail_max_age_days: u32) -> Self {
        let to_age = |days: u32| {
            (days > 0).then(|| Duration::from_secs(u64::from(days) * SECS_PER_DAY))
        };
        Self {
            max_age: to_age(max_age_days),
            thumbnail_max_age: to_age(thumbnail_max_age_days),
        }
    }

    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::from_days(config.max_age_days, config.thumbnail_max_age_days)
    }
}

/// What a sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub removed: usize,
    pub bytes_freed: u64,
    /// Expired files kept because a favorite references them.
    pub protected: usize,
}

impl SweepReport {
    fn merge(&mut self, other: Self) {
        self.removed += other.removed;
        self.bytes_freed += other.bytes_freed;
        self.protected += other.protected;
    }
}

/// Sweeps images and thumbnails of every source in `store`.
///
/// User imports are never swept.
#[must_use]
pub fn sweep(
    store: &CacheStore,
    policy: RetentionPolicy,
    protected: &ProtectedEntries,
    now: SystemTime,
) -> SweepReport {
    let mut report = SweepReport::default();

    if let Some(max_age) = policy.max_age {
        for dir in subdirectories(&store.images_root()) {
            report.merge(sweep_dir(&dir, max_age, now, protected));
        }
    }

    if let Some(max_age) = policy.thumbnail_max_age {
        let unprotected = ProtectedEntries::new();
        for dir in subdirectories(&store.thumbnails_root()) {
            report.merge(sweep_dir(&dir, max_age, now, &unprotected));
        }
    }

    if report.removed > 0 {
        tracing::info!(
            removed = report.removed,
            bytes_freed = report.bytes_freed,
            protected = report.protected,
            "cache retention sweep finished"
        );
    } else {
        tracing::debug!(protected = report.protected, "cache retention sweep removed nothing");
    }

    report
}

/// Sweeps a single directory of files.
///
/// Files are ordered newest first; the newest is kept unconditionally and
/// the rest are removed once older than `max_age` unless `protected` holds
/// the directory name paired with their stem.
#[must_use]
pub fn sweep_dir(
    dir: &Path,
    max_age: Duration,
    now: SystemTime,
    protected: &ProtectedEntries,
) -> SweepReport {
    let mut report = SweepReport::default();

    let Ok(entries) = fs::read_dir(dir) else {
        return report;
    };
    let source = dir.file_name().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();

    let mut files: Vec<(std::path::PathBuf, SystemTime, u64)> = entries
        .flatten()
        .filter_map(|entry| {
            let meta = entry.metadata().ok()?;
            meta.is_file().then(|| {
                (entry.path(), meta.modified().unwrap_or(SystemTime::UNIX_EPOCH), meta.len())
            })
        })
        .collect();

    files.sort_by(|a, b| b.1.cmp(&a.1));

    for (path, modified, size) in files.into_iter().skip(1) {
        let age = now.duration_since(modified).unwrap_or_default();
        if age <= max_age {
            continue;
        }

        let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        if protected.contains(&(source.clone(), stem)) {
            report.protected += 1;
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                report.removed += 1;
                report.bytes_freed += size;
            }
            Err(err) => {
                tracing::warn!(error = %err, path = %path.display(), "failed to remove expired cache file");
            }
        }
    }

    report
}

fn subdirectories(root: &Path) -> Vec<std::path::PathBuf> {
    fs::read_dir(root)
        .map(|entries| entries.flatten().map(|e| e.path()).filter(|p| p.is_dir()).collect())
        .unwrap_or_default()
}
