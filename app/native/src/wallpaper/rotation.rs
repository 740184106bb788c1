//! Rotation pools.
//!
//! A pool is rebuilt from a cache scan before every cycle and a cursor that
//! only ever grows picks `pool[index % len]`. The blended `all` pool is
//! shuffled with a fixed seed, so the traversal order is mixed but the same
//! on every run for the same cache contents.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::config::TerrapaperConfig;
use crate::constants::USER_SOURCE;

use super::favorites::Favorites;
use super::store::CacheStore;

/// Seed of the `all` pool shuffle.
pub const ROTATION_SEED: u64 = 0x7465_7272_6170_6170;

/// What a rotation pool is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationSource {
    /// Weighted blend of every source plus favorites.
    All,
    Favorites,
    /// User imports.
    User,
    /// One named source.
    Source(String),
}

impl RotationSource {
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "" | "all" => Self::All,
            "favorites" => Self::Favorites,
            USER_SOURCE => Self::User,
            name => Self::Source(name.to_string()),
        }
    }
}

impl fmt::Display for RotationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Favorites => f.write_str("favorites"),
            Self::User => f.write_str(USER_SOURCE),
            Self::Source(name) => f.write_str(name),
        }
    }
}

/// Ordered, cyclable list of local image files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationPool {
    paths: Vec<PathBuf>,
}

impl RotationPool {
    #[must_use]
    pub const fn new(paths: Vec<PathBuf>) -> Self { Self { paths } }

    #[must_use]
    pub fn paths(&self) -> &[PathBuf] { &self.paths }

    #[must_use]
    pub fn len(&self) -> usize { self.paths.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.paths.is_empty() }

    /// Entry at `index`, wrapping around. `None` for an empty pool.
    #[must_use]
    pub fn select(&self, index: u64) -> Option<&Path> {
        if self.paths.is_empty() {
            return None;
        }
        let len = self.paths.len() as u64;
        let slot = usize::try_from(index % len).ok()?;
        self.paths.get(slot).map(PathBuf::as_path)
    }
}

/// Builds the pool for `source` by scanning the cache.
#[must_use]
pub fn build_pool(
    store: &CacheStore,
    favorites: &Favorites,
    config: &TerrapaperConfig,
    source: &RotationSource,
) -> RotationPool {
    let paths = match source {
        RotationSource::All => blended_paths(store, favorites, config),
        RotationSource::Favorites => dedup(favorites.resolve_paths(store)),
        RotationSource::User => entry_paths(store, USER_SOURCE),
        RotationSource::Source(name) => entry_paths(store, name),
    };
    RotationPool::new(paths)
}

fn entry_paths(store: &CacheStore, source: &str) -> Vec<PathBuf> {
    store.entries(source).into_iter().map(|entry| entry.path).collect()
}

fn dedup(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    paths.into_iter().filter(|path| seen.insert(path.clone())).collect()
}

/// Concatenates every source repeated by its weight, appends favorites not
/// already present and shuffles with [`ROTATION_SEED`].
fn blended_paths(store: &CacheStore, favorites: &Favorites, config: &TerrapaperConfig) -> Vec<PathBuf> {
    let mut sources: BTreeSet<String> = store.sources().into_iter().collect();
    sources.extend(config.sources.iter().map(|s| s.name.clone()).filter(|n| !n.is_empty()));
    sources.insert(USER_SOURCE.to_string());

    let mut paths = Vec::new();
    for source in &sources {
        let weight = config.rotation_weight(source);
        if weight == 0 {
            continue;
        }
        let entries = entry_paths(store, source);
        for _ in 0..weight {
            paths.extend(entries.iter().cloned());
        }
    }

    let present: HashSet<PathBuf> = paths.iter().cloned().collect();
    paths.extend(dedup(favorites.resolve_paths(store)).into_iter().filter(|p| !present.contains(p)));

    paths.shuffle(&mut StdRng::seed_from_u64(ROTATION_SEED));
    paths
}

/// Monotonic rotation index for one process run.
#[derive(Debug, Default)]
pub struct RotationCursor {
    index: AtomicU64,
}

impl RotationCursor {
    #[must_use]
    pub const fn new() -> Self { Self { index: AtomicU64::new(0) } }

    /// Returns the next entry of `pool` and advances by one.
    ///
    /// An empty pool yields `None` and leaves the index untouched.
    pub fn advance(&self, pool: &RotationPool) -> Option<PathBuf> {
        if pool.is_empty() {
            return None;
        }
        let index = self.index.fetch_add(1, Ordering::SeqCst);
        pool.select(index).map(Path::to_path_buf)
    }

    #[must_use]
    pub fn position(&self) -> u64 { self.index.load(Ordering::SeqCst) }
}

/// Chooses this cycle's rotation override, if rotation is enabled.
pub fn next_override(
    cursor: &RotationCursor,
    store: &CacheStore,
    favorites: &Favorites,
    config: &TerrapaperConfig,
) -> Option<PathBuf> {
    if !config.rotation.enabled {
        return None;
    }

    let source = RotationSource::parse(&config.rotation.source);
    let pool = build_pool(store, favorites, config, &source);
    let chosen = cursor.advance(&pool);

    match &chosen {
        Some(path) => tracing::debug!(
            source = %source,
            pool = pool.len(),
            path = %path.display(),
            "rotation advanced"
        ),
        None => tracing::debug!(source = %source, "rotation pool is empty"),
    }
    chosen
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::config::SourceConfig;
    use crate::wallpaper::favorites::FavoriteRecord;

    fn write(store: &CacheStore, source: &str, id: &str) -> PathBuf {
        let path = store.entry_path(source, id, "jpg");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"image bytes").unwrap();
        path
    }

    fn setup() -> (TempDir, CacheStore, Favorites) {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(temp.path().join("cache"), 0);
        let favorites = Favorites::load_from_dir(temp.path());
        (temp, store, favorites)
    }

    #[test]
    fn test_parse_rotation_source() {
        assert_eq!(RotationSource::parse("all"), RotationSource::All);
        assert_eq!(RotationSource::parse(""), RotationSource::All);
        assert_eq!(RotationSource::parse("favorites"), RotationSource::Favorites);
        assert_eq!(RotationSource::parse("user"), RotationSource::User);
        assert_eq!(RotationSource::parse("apod"), RotationSource::Source("apod".to_string()));
        assert_eq!(RotationSource::Source("apod".to_string()).to_string(), "apod");
    }

    // ========================================================================
    // Cursor
    // ========================================================================

    #[test]
    fn test_rotation_wraps_after_full_cycle() {
        let pool = RotationPool::new((0..4).map(|i| PathBuf::from(format!("f{i}"))).collect());
        let cursor = RotationCursor::new();

        let picked: Vec<PathBuf> = (0..5).filter_map(|_| cursor.advance(&pool)).collect();
        let expected: Vec<PathBuf> = ["f0", "f1", "f2", "f3", "f0"].iter().map(PathBuf::from).collect();
        assert_eq!(picked, expected);
    }

    #[test]
    fn test_empty_pool_selects_nothing_and_keeps_index() {
        let cursor = RotationCursor::new();
        assert_eq!(cursor.advance(&RotationPool::default()), None);
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_pool_shrinking_keeps_wrapping() {
        let cursor = RotationCursor::new();
        let big = RotationPool::new(vec![PathBuf::from("a"), PathBuf::from("b"), PathBuf::from("c")]);
        cursor.advance(&big);
        cursor.advance(&big);

        let small = RotationPool::new(vec![PathBuf::from("a")]);
        assert_eq!(cursor.advance(&small), Some(PathBuf::from("a")));
    }

    // ========================================================================
    // Pools
    // ========================================================================

    #[test]
    fn test_single_source_pool_is_oldest_first() {
        let (_temp, store, favorites) = setup();
        let first = write(&store, "apod", "first");
        let second = write(&store, "apod", "second");
        let later = fs::metadata(&first).unwrap().modified().unwrap() + std::time::Duration::from_secs(5);
        fs::File::options().write(true).open(&second).unwrap().set_modified(later).unwrap();

        let pool = build_pool(
            &store,
            &favorites,
            &TerrapaperConfig::default(),
            &RotationSource::Source("apod".to_string()),
        );
        assert_eq!(pool.paths(), &[first, second]);
    }

    #[test]
    fn test_all_pool_is_weighted_and_deterministic() {
        let (_temp, store, favorites) = setup();
        write(&store, "apod", "a1");
        write(&store, "apod", "a2");
        write(&store, "bing", "b1");
        write(&store, USER_SOURCE, "u1");

        let mut config = TerrapaperConfig::default();
        config.sources.push(SourceConfig { name: "apod".to_string(), weight: 3, ..Default::default() });
        config.rotation.weights.insert(USER_SOURCE.to_string(), 0);

        let pool = build_pool(&store, &favorites, &config, &RotationSource::All);
        // apod 2 × 3, bing 1 × 1, user excluded
        assert_eq!(pool.len(), 7);
        assert!(pool.paths().iter().all(|p| !store.is_user_import(p)));

        let again = build_pool(&store, &favorites, &config, &RotationSource::All);
        assert_eq!(pool, again);
    }

    #[test]
    fn test_all_pool_appends_missing_favorites_once() {
        let (_temp, store, favorites) = setup();
        write(&store, "apod", "a1");
        let loved = write(&store, "archive", "loved");

        let mut config = TerrapaperConfig::default();
        config.rotation.weights.insert("archive".to_string(), 0);
        favorites
            .add(FavoriteRecord {
                source: "archive".to_string(),
                image_id: "loved".to_string(),
                ..Default::default()
            })
            .unwrap();

        let pool = build_pool(&store, &favorites, &config, &RotationSource::All);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.paths().iter().filter(|p| **p == loved).count(), 1);
    }

    #[test]
    fn test_favorites_pool() {
        let (_temp, store, favorites) = setup();
        let path = write(&store, "apod", "a1");
        write(&store, "apod", "a2");
        favorites
            .add(FavoriteRecord { source: "apod".to_string(), image_id: "a1".to_string(), ..Default::default() })
            .unwrap();

        let pool = build_pool(&store, &favorites, &TerrapaperConfig::default(), &RotationSource::Favorites);
        assert_eq!(pool.paths(), &[path]);
    }

    #[test]
    fn test_next_override_requires_rotation_enabled() {
        let (_temp, store, favorites) = setup();
        write(&store, "apod", "a1");
        let cursor = RotationCursor::new();

        let mut config = TerrapaperConfig::default();
        assert!(next_override(&cursor, &store, &favorites, &config).is_none());
        assert_eq!(cursor.position(), 0);

        config.rotation.enabled = true;
        config.rotation.source = "apod".to_string();
        assert!(next_override(&cursor, &store, &favorites, &config).is_some());
        assert_eq!(cursor.position(), 1);
    }
}
