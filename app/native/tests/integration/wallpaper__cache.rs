//! Integration tests for downloads, retention and favorites.
//!
//! Covers:
//! - Downloads that fail part-way leave nothing at the destination
//! - The retention sweep keeps the newest entry of every source
//! - Favorites survive the sweep and feed the favorites rotation pool

use std::fs::{self, File};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use terrapaper_lib::config::TerrapaperConfig;
use terrapaper_lib::constants::USER_SOURCE;
use terrapaper_lib::wallpaper::retention::{self, RetentionPolicy};
use terrapaper_lib::wallpaper::rotation::{RotationSource, build_pool};
use terrapaper_lib::wallpaper::{DownloadError, Downloader, FavoriteRecord, Favorites, HttpFetch};

use crate::common::*;

const DAY: Duration = Duration::from_secs(86_400);

fn set_age(path: &std::path::Path, now: SystemTime, age: Duration) {
    File::options().write(true).open(path).unwrap().set_modified(now - age).unwrap();
}

fn favorite(source: &str, id: &str) -> FavoriteRecord {
    FavoriteRecord {
        source: source.to_string(),
        image_id: id.to_string(),
        ..Default::default()
    }
}

// ============================================================================
// Downloads
// ============================================================================

#[test]
fn test_download_interrupted_leaves_no_file() {
    let ws = Workspace::new();
    let url = image_url("apod", "a");
    let fetcher = MapFetcher::default().with_truncated(&url, vec![1; 4096]);
    let downloader = Downloader::new(Arc::new(fetcher), 1024);
    let dest = ws.store.entry_path("apod", "a", "png");

    let result = downloader.download(&url, &dest);

    assert!(matches!(result, Err(DownloadError::Http(_))));
    assert!(!dest.exists());
    let leftovers = fs::read_dir(dest.parent().unwrap()).unwrap().count();
    assert_eq!(leftovers, 0, "temporary file should be removed");
}

#[test]
fn test_download_too_small_is_rejected() {
    let ws = Workspace::new();
    let url = image_url("apod", "tiny");
    let downloader = Downloader::new(Arc::new(MapFetcher::default().with(&url, vec![0; 100])), 1024);
    let dest = ws.store.entry_path("apod", "tiny", "png");

    let result = downloader.download(&url, &dest);

    assert!(matches!(result, Err(DownloadError::TooSmall { bytes: 100, min: 1024 })));
    assert!(!dest.exists());
}

#[test]
fn test_download_complete_lands_at_destination() {
    let ws = Workspace::new();
    let url = image_url("apod", "ok");
    let body = png_bytes(32, 32);
    let downloader = Downloader::new(Arc::new(MapFetcher::default().with(&url, body.clone())), 16);
    let dest = ws.store.entry_path("apod", "ok", "png");

    assert_eq!(downloader.download(&url, &dest).unwrap(), body.len() as u64);
    assert_eq!(fs::read(&dest).unwrap(), body);
}

#[test]
fn test_download_refuses_private_hosts() {
    let ws = Workspace::new();
    let fetcher = Arc::new(MapFetcher::default());
    let shared: Arc<dyn HttpFetch> = fetcher.clone();
    let downloader = Downloader::new(shared, 0);

    let result = downloader.download("http://192.168.1.10/a.png", &ws.store.entry_path("apod", "a", "png"));

    assert!(matches!(result, Err(DownloadError::BlockedHost(_))));
    assert_eq!(fetcher.request_count(), 0);
}

// ============================================================================
// Retention
// ============================================================================

#[test]
fn test_sweep_keeps_newest_entry_of_each_source() {
    let ws = Workspace::new();
    let now = SystemTime::now();
    for (i, id) in ["old", "older", "oldest"].iter().enumerate() {
        let path = cache_png(&ws.store, "apod", id, 8, 8);
        set_age(&path, now, DAY * (30 + i as u32));
    }
    let single = cache_png(&ws.store, "bing", "only", 8, 8);
    set_age(&single, now, DAY * 90);

    let report = retention::sweep(&ws.store, RetentionPolicy::from_days(7, 0), &Default::default(), now);

    assert_eq!(report.removed, 2);
    let remaining: Vec<String> = ws.store.entries("apod").into_iter().map(|e| e.id).collect();
    assert_eq!(remaining, vec!["old"]);
    assert!(single.exists(), "the only entry of a source is never swept");
}

#[test]
fn test_sweep_spares_favorites_and_imports() {
    let ws = Workspace::new();
    let now = SystemTime::now();
    let newest = cache_png(&ws.store, "apod", "newest", 8, 8);
    let loved = cache_png(&ws.store, "apod", "loved", 8, 8);
    let stale = cache_png(&ws.store, "apod", "stale", 8, 8);
    let import = cache_png(&ws.store, USER_SOURCE, "mine", 8, 8);
    set_age(&newest, now, DAY * 20);
    set_age(&loved, now, DAY * 40);
    set_age(&stale, now, DAY * 40);
    set_age(&import, now, DAY * 400);

    ws.favorites.add(favorite("apod", "loved")).unwrap();
    let report = retention::sweep(&ws.store, RetentionPolicy::from_days(7, 0), &ws.favorites.protected_entries(), now);

    assert_eq!(report.removed, 1);
    assert_eq!(report.protected, 1);
    assert!(newest.exists());
    assert!(loved.exists());
    assert!(!stale.exists());
    assert!(import.exists());
}

#[test]
fn test_sweep_disabled_removes_nothing() {
    let ws = Workspace::new();
    let now = SystemTime::now();
    for id in ["a", "b", "c"] {
        let path = cache_png(&ws.store, "apod", id, 8, 8);
        set_age(&path, now, DAY * 365);
    }

    let report = retention::sweep(&ws.store, RetentionPolicy::from_days(0, 0), &Default::default(), now);

    assert_eq!(report.removed, 0);
    assert_eq!(ws.store.entries("apod").len(), 3);
}

// ============================================================================
// Favorites
// ============================================================================

#[test]
fn test_favorites_persist_across_loads() {
    let ws = Workspace::new();
    ws.favorites.add(favorite("apod", "a")).unwrap();
    ws.favorites.add(favorite("bing", "b")).unwrap();
    assert!(!ws.favorites.add(favorite("apod", "a")).unwrap());

    let reloaded = Favorites::load_from_dir(&ws.config_dir());
    assert_eq!(reloaded.len(), 2);
    assert!(reloaded.contains("bing", "b"));

    assert!(reloaded.remove("apod", "a").unwrap());
    assert!(!Favorites::load_from_dir(&ws.config_dir()).contains("apod", "a"));
}

#[test]
fn test_favorites_pool_skips_missing_files() {
    let ws = Workspace::new();
    let cached = cache_png(&ws.store, "apod", "a", 8, 8);
    ws.favorites.add(favorite("apod", "a")).unwrap();
    ws.favorites.add(favorite("apod", "gone")).unwrap();

    let pool = build_pool(&ws.store, &ws.favorites, &TerrapaperConfig::default(), &RotationSource::Favorites);

    assert_eq!(pool.paths(), &[cached]);
}
