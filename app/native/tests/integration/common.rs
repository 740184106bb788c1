//! Shared test doubles and fixtures.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

use parking_lot::Mutex;
use reqwest::Url;
use tempfile::TempDir;
use terrapaper_lib::config::{FitStyle, TerrapaperConfig};
use terrapaper_lib::wallpaper::{
    CacheStore, DownloadError, Downloader, Favorites, HttpFetch, ImageMetadata, ImageProvider, ImageResolver,
    InstallError, ProviderRegistry, RenderCycle, SharedCycleState, StatusEvent, StatusSink, WallpaperInstaller,
};

// ============================================================================
// Images
// ============================================================================

/// Encodes a black PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgb8(image::RgbImage::new(width, height))
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

/// Writes a cache entry for `source`/`id` and returns its path.
pub fn cache_png(store: &CacheStore, source: &str, id: &str, width: u32, height: u32) -> PathBuf {
    let path = store.entry_path(source, id, "png");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, png_bytes(width, height)).unwrap();
    path
}

/// Provider metadata with a download URL on `example.com`.
pub fn metadata(source: &str, id: &str, width: u32, height: u32) -> ImageMetadata {
    let mut meta = ImageMetadata {
        source: source.to_string(),
        id: id.to_string(),
        title: format!("{source} {id}"),
        width: Some(width),
        height: Some(height),
        ..Default::default()
    };
    meta.urls.full = image_url(source, id);
    meta
}

pub fn image_url(source: &str, id: &str) -> String { format!("https://example.com/{source}/{id}.png") }

// ============================================================================
// HTTP
// ============================================================================

/// Serves canned bodies by URL and fails everything else with a 404.
#[derive(Default)]
pub struct MapFetcher {
    bodies: HashMap<String, Vec<u8>>,
    /// Bytes written before failing, keyed by URL.
    truncated: HashMap<String, Vec<u8>>,
    pub requests: Mutex<Vec<String>>,
}

impl MapFetcher {
    pub fn with(mut self, url: &str, body: Vec<u8>) -> Self {
        self.bodies.insert(url.to_string(), body);
        self
    }

    /// Streams `partial` and then fails, like a dropped connection.
    pub fn with_truncated(mut self, url: &str, partial: Vec<u8>) -> Self {
        self.truncated.insert(url.to_string(), partial);
        self
    }

    pub fn request_count(&self) -> usize { self.requests.lock().len() }
}

impl HttpFetch for MapFetcher {
    fn fetch_into(&self, url: &Url, sink: &mut dyn Write) -> Result<u64, DownloadError> {
        self.requests.lock().push(url.to_string());

        if let Some(partial) = self.truncated.get(url.as_str()) {
            sink.write_all(partial)?;
            return Err(DownloadError::Http("connection reset".to_string()));
        }

        match self.bodies.get(url.as_str()) {
            Some(body) => {
                sink.write_all(body)?;
                Ok(body.len() as u64)
            }
            None => Err(DownloadError::Status { status: 404, url: url.to_string() }),
        }
    }
}

// ============================================================================
// Providers
// ============================================================================

/// Provider returning a fixed candidate list.
pub struct ListProvider {
    name: String,
    items: Option<Vec<ImageMetadata>>,
    pub calls: Mutex<usize>,
}

impl ListProvider {
    pub fn new(name: &str, items: Option<Vec<ImageMetadata>>) -> Self {
        Self { name: name.to_string(), items, calls: Mutex::new(0) }
    }
}

impl ImageProvider for ListProvider {
    fn name(&self) -> &str { &self.name }

    fn list_candidates(&self, _selector: &str) -> Option<Vec<ImageMetadata>> {
        *self.calls.lock() += 1;
        self.items.clone()
    }
}

// ============================================================================
// Desktop
// ============================================================================

/// Records installs instead of touching the desktop.
#[derive(Default)]
pub struct RecordingInstaller {
    pub installs: Mutex<Vec<(PathBuf, FitStyle)>>,
}

impl RecordingInstaller {
    pub fn count(&self) -> usize { self.installs.lock().len() }

    pub fn last(&self) -> Option<(PathBuf, FitStyle)> { self.installs.lock().last().cloned() }
}

impl WallpaperInstaller for RecordingInstaller {
    fn install(&self, path: &Path, fit: FitStyle) -> Result<(), InstallError> {
        self.installs.lock().push((path.to_path_buf(), fit));
        Ok(())
    }
}

/// Forwards status events to a channel.
pub struct ChannelSink(Mutex<Sender<StatusEvent>>);

impl ChannelSink {
    pub fn new() -> (Arc<Self>, Receiver<StatusEvent>) {
        let (tx, rx) = mpsc::channel();
        (Arc::new(Self(Mutex::new(tx))), rx)
    }
}

impl StatusSink for ChannelSink {
    fn publish(&self, event: StatusEvent) { let _ = self.0.lock().send(event); }
}

// ============================================================================
// Fixture
// ============================================================================

/// Temporary cache and config directories with a small render size.
pub struct Workspace {
    pub temp: TempDir,
    pub store: CacheStore,
    pub favorites: Arc<Favorites>,
}

impl Workspace {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(temp.path().join("cache"), 0);
        let favorites = Arc::new(Favorites::load_from_dir(&temp.path().join("config")));
        Self { temp, store, favorites }
    }

    pub fn config_dir(&self) -> PathBuf { self.temp.path().join("config") }

    /// Default settings pointed at this workspace, rendering 64×32 frames.
    pub fn config(&self) -> TerrapaperConfig {
        let mut config = TerrapaperConfig::default();
        config.width = 64;
        config.height = 32;
        config.cache.directory = self.store.root().display().to_string();
        config
    }

    pub fn resolver(&self, fetcher: Arc<dyn HttpFetch>, providers: ProviderRegistry) -> ImageResolver {
        ImageResolver::new(self.store.clone(), Downloader::new(fetcher, 0), providers)
    }

    /// A cycle with no providers that records its installs.
    pub fn cycle(&self, installer: Arc<RecordingInstaller>) -> RenderCycle {
        let resolver = self.resolver(Arc::new(MapFetcher::default()), ProviderRegistry::default());
        RenderCycle::new(resolver, Arc::clone(&self.favorites), installer, SharedCycleState::default())
    }
}
