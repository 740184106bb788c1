//! Wallpaper orchestration core.
//!
//! Everything between the settings snapshot and the installed desktop image:
//! the cache store, providers and downloads, the image resolution chain,
//! rotation and prefetch, the renderers, the compositor, the update gate and
//! the scheduler that drives it all.

pub mod compositor;
pub mod cycle;
pub mod download;
pub mod favorites;
pub mod gate;
pub mod install;
pub mod metadata;
pub mod prefetch;
pub mod processing;
pub mod provider;
pub mod render;
pub mod resolver;
pub mod retention;
pub mod rotation;
pub mod scheduler;
pub mod state;
pub mod status;
pub mod store;

use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

pub use cycle::{CycleError, CycleReport, CycleRunner, RenderCycle};
pub use download::{DownloadError, Downloader, HttpFetch, ReqwestFetcher};
pub use favorites::{FavoriteRecord, Favorites, FavoritesError};
pub use gate::UpdateGate;
pub use install::{DesktopInstaller, InstallError, WallpaperInstaller};
pub use metadata::ImageMetadata;
pub use provider::{ImageProvider, ProviderRegistry};
pub use resolver::{ImageResolver, ResolveRequest, ResolvedImage};
pub use retention::{ProtectedEntries, RetentionPolicy, SweepReport};
pub use scheduler::Scheduler;
pub use state::SharedCycleState;
pub use status::{CycleOutcome, LogStatusSink, StatusEvent, StatusSink};
pub use store::{CacheEntry, CacheError, CacheStore};

use self::prefetch::Prefetcher;
use crate::config::{TerrapaperConfig, env::load_api_keys};

/// The long-lived collaborators of one process, built from a configuration.
///
/// The cache directory, providers and API keys are read once here; changing
/// them takes effect on the next start.
#[derive(Debug, Clone)]
pub struct WallpaperServices {
    store: CacheStore,
    downloader: Downloader,
    providers: ProviderRegistry,
    favorites: Arc<Favorites>,
    state: SharedCycleState,
}

impl WallpaperServices {
    /// Builds the services with the production HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn from_config(config: &TerrapaperConfig, config_dir: &Path) -> Result<Self, DownloadError> {
        let fetcher: Arc<dyn HttpFetch> = Arc::new(ReqwestFetcher::new()?);
        Ok(Self::with_fetcher(config, config_dir, fetcher))
    }

    /// Builds the services around a custom fetcher.
    #[must_use]
    pub fn with_fetcher(config: &TerrapaperConfig, config_dir: &Path, fetcher: Arc<dyn HttpFetch>) -> Self {
        let store = CacheStore::from_config(&config.cache);
        let keys = load_api_keys(&config.api_keys, config_dir);
        let providers = ProviderRegistry::from_config(config, &keys, &fetcher);
        let downloader = Downloader::new(fetcher, config.cache.min_valid_bytes);
        let favorites = Arc::new(Favorites::load_from_dir(config_dir));

        tracing::debug!(
            cache = %store.root().display(),
            providers = providers.names().len(),
            favorites = favorites.len(),
            "wallpaper services ready"
        );

        Self {
            store,
            downloader,
            providers,
            favorites,
            state: SharedCycleState::default(),
        }
    }

    #[must_use]
    pub const fn store(&self) -> &CacheStore { &self.store }

    #[must_use]
    pub const fn providers(&self) -> &ProviderRegistry { &self.providers }

    #[must_use]
    pub const fn favorites(&self) -> &Arc<Favorites> { &self.favorites }

    #[must_use]
    pub const fn state(&self) -> &SharedCycleState { &self.state }

    #[must_use]
    pub fn resolver(&self) -> ImageResolver {
        ImageResolver::new(self.store.clone(), self.downloader.clone(), self.providers.clone())
    }

    #[must_use]
    pub fn prefetcher(&self) -> Prefetcher {
        Prefetcher::new(self.store.clone(), self.downloader.clone(), self.providers.clone())
    }

    /// Builds the render cycle, prefetching after every run.
    #[must_use]
    pub fn render_cycle(&self, installer: Arc<dyn WallpaperInstaller>) -> RenderCycle {
        RenderCycle::new(self.resolver(), Arc::clone(&self.favorites), installer, self.state.clone())
            .with_prefetcher(self.prefetcher())
    }

    /// Runs the retention sweep, protecting every favorite.
    pub fn sweep(&self, config: &TerrapaperConfig) -> SweepReport {
        let policy = RetentionPolicy::from_config(&config.cache);
        let report = retention::sweep(&self.store, policy, &self.favorites.protected_entries(), SystemTime::now());
        if report.removed > 0 {
            tracing::info!(
                removed = report.removed,
                bytes_freed = report.bytes_freed,
                protected = report.protected,
                "cache sweep finished"
            );
        }
        report
    }
}
