//! Integration tests for the image resolution chain.
//!
//! Covers:
//! - Cached selections are used without asking the provider
//! - Provider images below the quality threshold are never installed
//! - Offline sources fall back to the newest acceptable cache entry
//! - User imports bypass the quality gate

use std::sync::Arc;

use terrapaper_lib::constants::USER_SOURCE;
use terrapaper_lib::wallpaper::resolver::{MIN_QUALITY_DIMENSION, ResolutionStep, passes_quality_gate};
use terrapaper_lib::wallpaper::{ImageProvider, ImageResolver, ProviderRegistry, ResolveRequest};

use crate::common::*;

fn resolver_with(ws: &Workspace, fetcher: MapFetcher, provider: ListProvider) -> (ImageResolver, Arc<ListProvider>) {
    let provider = Arc::new(provider);
    let shared: Arc<dyn ImageProvider> = provider.clone();
    let mut registry = ProviderRegistry::default();
    registry.insert(shared);
    (ws.resolver(Arc::new(fetcher), registry), provider)
}

fn request(source: &str) -> ResolveRequest<'_> { ResolveRequest { source, ..Default::default() } }

// ============================================================================
// Quality gate
// ============================================================================

#[test]
fn test_quality_gate_threshold() {
    let ws = Workspace::new();
    let small = cache_png(&ws.store, "apod", "small", 16, 16);

    assert!(!passes_quality_gate(&ws.store, "apod", &small, None));
    assert!(passes_quality_gate(&ws.store, "apod", &small, Some(MIN_QUALITY_DIMENSION)));
    assert!(!passes_quality_gate(&ws.store, "apod", &small, Some(MIN_QUALITY_DIMENSION - 1)));
}

#[test]
fn test_quality_gate_exempts_user_imports() {
    let ws = Workspace::new();
    let import = cache_png(&ws.store, USER_SOURCE, "tiny", 4, 4);

    assert!(passes_quality_gate(&ws.store, USER_SOURCE, &import, None));
}

#[test]
fn test_low_resolution_candidate_is_never_downloaded() {
    let ws = Workspace::new();
    let small = metadata("apod", "small", 800, 600);
    let fetcher = MapFetcher::default().with(&image_url("apod", "small"), png_bytes(8, 8));
    let (resolver, _) = resolver_with(&ws, fetcher, ListProvider::new("apod", Some(vec![small])));

    assert!(resolver.resolve(&request("apod")).is_none());
    assert!(ws.store.entries("apod").is_empty());
}

#[test]
fn test_download_failing_gate_is_removed() {
    let ws = Workspace::new();
    // No dimensions in the feed, so the file header decides
    let mut meta = metadata("apod", "liar", 0, 0);
    meta.width = None;
    meta.height = None;
    let fetcher = MapFetcher::default().with(&image_url("apod", "liar"), png_bytes(32, 32));
    let (resolver, _) = resolver_with(&ws, fetcher, ListProvider::new("apod", Some(vec![meta])));

    assert!(resolver.resolve(&request("apod")).is_none());
    assert!(ws.store.find_entry("apod", "liar").is_none());
}

// ============================================================================
// Chain order
// ============================================================================

#[test]
fn test_cached_selection_skips_provider() {
    let ws = Workspace::new();
    let large = cache_png(&ws.store, "apod", "big", 1200, 800);
    let meta = metadata("apod", "big", 1200, 800);
    let (resolver, provider) = resolver_with(&ws, MapFetcher::default(), ListProvider::new("apod", Some(vec![meta])));

    let resolved = resolver
        .resolve(&ResolveRequest { selection: Some("big"), ..request("apod") })
        .unwrap();

    assert_eq!(resolved.path, large);
    assert_eq!(resolved.step, ResolutionStep::CachedSelection);
    assert_eq!(*provider.calls.lock(), 0);
}

#[test]
fn test_selection_downloads_when_not_cached() {
    let ws = Workspace::new();
    let others = vec![metadata("apod", "first", 2000, 1000), metadata("apod", "wanted", 2000, 1000)];
    let fetcher = MapFetcher::default()
        .with(&image_url("apod", "first"), png_bytes(8, 8))
        .with(&image_url("apod", "wanted"), png_bytes(8, 8));
    let (resolver, _) = resolver_with(&ws, fetcher, ListProvider::new("apod", Some(others)));

    let resolved = resolver
        .resolve(&ResolveRequest { selection: Some("wanted"), ..request("apod") })
        .unwrap();

    assert_eq!(resolved.id, "wanted");
    assert_eq!(resolved.step, ResolutionStep::DownloadedSelection);
    assert_eq!(resolved.url.as_deref(), Some(image_url("apod", "wanted").as_str()));
    assert!(resolved.path.exists());
}

#[test]
fn test_offline_source_falls_back_to_cache() {
    let ws = Workspace::new();
    cache_png(&ws.store, "apod", "small", 16, 16);
    let good = cache_png(&ws.store, "apod", "good", 1920, 1080);
    let (resolver, provider) = resolver_with(&ws, MapFetcher::default(), ListProvider::new("apod", None));

    let resolved = resolver
        .resolve(&ResolveRequest { selection: Some("missing"), ..request("apod") })
        .unwrap();

    assert_eq!(resolved.path, good);
    assert_eq!(resolved.step, ResolutionStep::CacheFallback);
    assert_eq!(*provider.calls.lock(), 1);
}

#[test]
fn test_unselected_source_downloads_first_acceptable_candidate() {
    let ws = Workspace::new();
    let items = vec![metadata("apod", "low", 640, 480), metadata("apod", "high", 3840, 2160)];
    let fetcher = MapFetcher::default().with(&image_url("apod", "high"), png_bytes(8, 8));
    let (resolver, _) = resolver_with(&ws, fetcher, ListProvider::new("apod", Some(items)));

    let resolved = resolver.resolve(&request("apod")).unwrap();

    assert_eq!(resolved.id, "high");
    assert_eq!(resolved.step, ResolutionStep::FirstCandidate);
    assert_eq!(resolved.title, "apod high");
}

#[test]
fn test_rotation_override_wins() {
    let ws = Workspace::new();
    cache_png(&ws.store, USER_SOURCE, "newest", 4, 4);
    let chosen = cache_png(&ws.store, USER_SOURCE, "chosen", 4, 4);
    let resolver = ws.resolver(Arc::new(MapFetcher::default()), ProviderRegistry::default());

    let resolved = resolver
        .resolve(&ResolveRequest { rotation_override: Some(&chosen), ..request(USER_SOURCE) })
        .unwrap();

    assert_eq!(resolved.path, chosen);
    assert_eq!(resolved.source, USER_SOURCE);
    assert_eq!(resolved.id, "chosen");
    assert_eq!(resolved.step, ResolutionStep::RotationOverride);
}

#[test]
fn test_user_source_without_imports_resolves_nothing() {
    let ws = Workspace::new();
    let resolver = ws.resolver(Arc::new(MapFetcher::default()), ProviderRegistry::default());

    assert!(resolver.resolve(&request(USER_SOURCE)).is_none());
}
