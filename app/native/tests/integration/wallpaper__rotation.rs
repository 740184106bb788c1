//! Integration tests for rotation pools.
//!
//! Covers:
//! - The cursor walks a pool in order and wraps around
//! - The `all` pool honors source weights and is stable between builds
//! - Render cycles in image mode advance the rotation, procedural ones do not

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use terrapaper_lib::config::RenderMode;
use terrapaper_lib::constants::USER_SOURCE;
use terrapaper_lib::wallpaper::rotation::{RotationCursor, RotationPool, RotationSource, build_pool};
use terrapaper_lib::wallpaper::{CycleOutcome, CycleRunner, FavoriteRecord};

use crate::common::*;

// ============================================================================
// Cursor
// ============================================================================

#[test]
fn test_cursor_visits_every_entry_then_wraps() {
    let ws = Workspace::new();
    for id in ["a", "b", "c"] {
        cache_png(&ws.store, "apod", id, 8, 8);
    }
    let pool = build_pool(&ws.store, &ws.favorites, &ws.config(), &RotationSource::Source("apod".into()));
    let cursor = RotationCursor::new();

    let first_lap: Vec<_> = (0..3).filter_map(|_| cursor.advance(&pool)).collect();
    let second_lap: Vec<_> = (0..3).filter_map(|_| cursor.advance(&pool)).collect();

    assert_eq!(first_lap, pool.paths());
    assert_eq!(second_lap, first_lap);
    assert_eq!(cursor.position(), 6);
}

#[test]
fn test_cursor_on_empty_pool_stays_put() {
    let cursor = RotationCursor::new();
    assert!(cursor.advance(&RotationPool::default()).is_none());
    assert_eq!(cursor.position(), 0);
}

// ============================================================================
// Blended pool
// ============================================================================

#[test]
fn test_all_pool_applies_weights() {
    let ws = Workspace::new();
    let apod = cache_png(&ws.store, "apod", "a", 8, 8);
    let bing = cache_png(&ws.store, "bing", "b", 8, 8);
    let mine = cache_png(&ws.store, USER_SOURCE, "mine", 8, 8);

    let mut config = ws.config();
    config.rotation.weights.insert("apod".into(), 3);
    config.rotation.weights.insert("bing".into(), 0);

    let pool = build_pool(&ws.store, &ws.favorites, &config, &RotationSource::All);
    let count = |path: &PathBuf| pool.paths().iter().filter(|p| *p == path).count();

    assert_eq!(pool.len(), 4);
    assert_eq!(count(&apod), 3);
    assert_eq!(count(&bing), 0);
    assert_eq!(count(&mine), 1);
}

#[test]
fn test_all_pool_order_is_stable() {
    let ws = Workspace::new();
    for i in 0..6 {
        cache_png(&ws.store, "apod", &format!("img{i}"), 8, 8);
    }
    let config = ws.config();

    let first = build_pool(&ws.store, &ws.favorites, &config, &RotationSource::All);
    let second = build_pool(&ws.store, &ws.favorites, &config, &RotationSource::All);

    assert_eq!(first, second);
}

#[test]
fn test_all_pool_adds_favorites_once() {
    let ws = Workspace::new();
    let apod = cache_png(&ws.store, "apod", "a", 8, 8);
    ws.favorites
        .add(FavoriteRecord {
            source: "apod".into(),
            image_id: "a".into(),
            ..Default::default()
        })
        .unwrap();

    let pool = build_pool(&ws.store, &ws.favorites, &ws.config(), &RotationSource::All);

    assert_eq!(pool.paths(), &[apod]);
}

// ============================================================================
// Render cycles
// ============================================================================

#[test]
fn test_image_cycles_follow_rotation_order() {
    let ws = Workspace::new();
    for id in ["one", "two", "three"] {
        cache_png(&ws.store, USER_SOURCE, id, 16, 16);
    }
    let mut config = ws.config();
    config.mode = RenderMode::StaticImage;
    config.rotation.enabled = true;
    config.rotation.source = USER_SOURCE.to_string();

    let expected = build_pool(&ws.store, &ws.favorites, &config, &RotationSource::User);
    let installer = Arc::new(RecordingInstaller::default());
    let mut cycle = ws.cycle(Arc::clone(&installer));
    let stop = AtomicBool::new(false);

    let mut shown = Vec::new();
    for _ in 0..4 {
        let report = cycle.run_cycle(&config, &stop).unwrap();
        assert_eq!(report.outcome, CycleOutcome::Updated);
        shown.push(cycle.state().snapshot().current_image.unwrap().local_path);
    }

    assert_eq!(&shown[..3], expected.paths());
    assert_eq!(shown[3], shown[0]);
    assert_eq!(installer.count(), 4);
}

#[test]
fn test_procedural_cycles_leave_rotation_alone() {
    let ws = Workspace::new();
    cache_png(&ws.store, USER_SOURCE, "one", 16, 16);
    let mut config = ws.config();
    config.mode = RenderMode::Moon;
    config.rotation.enabled = true;

    let installer = Arc::new(RecordingInstaller::default());
    let mut cycle = ws.cycle(Arc::clone(&installer));
    cycle.run_cycle(&config, &AtomicBool::new(false)).unwrap();

    assert_eq!(cycle.rotation().position(), 0);
    assert!(cycle.state().snapshot().current_image.is_none());
    assert_eq!(installer.count(), 1);
}
