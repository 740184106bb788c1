//! Background prefetch.
//!
//! After every cycle the prefetcher grows under-populated source pools on a
//! detached thread. It shares nothing with the render path except the cache
//! directory, where every write is an atomic rename.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;

use crate::config::{PrefetchConfig, TerrapaperConfig};
use crate::platform::thread::spawn_named_thread;

use super::download::Downloader;
use super::provider::{ImageProvider, ProviderRegistry};
use super::resolver::{candidate_may_pass, passes_quality_gate};
use super::store::CacheStore;

/// Decides whether a source is fetched in this cycle.
///
/// Pools below `min_pool_size` are fetched every cycle unless the source is
/// quota-constrained; everything else is fetched once every
/// `maintenance_every` cycles.
#[must_use]
pub fn should_fetch(pool_size: usize, cycle: u64, quota_constrained: bool, policy: &PrefetchConfig) -> bool {
    let maintenance = cycle % u64::from(policy.maintenance_every.max(1)) == 0;
    if quota_constrained {
        return maintenance;
    }
    pool_size < policy.min_pool_size || maintenance
}

/// Outcome of one prefetch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrefetchReport {
    /// Sources whose cadence allowed a fetch.
    pub fetched_sources: usize,
    pub downloaded: usize,
    pub failed: usize,
}

struct Inner {
    store: CacheStore,
    downloader: Downloader,
    providers: ProviderRegistry,
    in_flight: AtomicBool,
    cycle: AtomicU64,
}

/// Grows the cache from the configured providers.
#[derive(Clone)]
pub struct Prefetcher {
    inner: Arc<Inner>,
}

impl Prefetcher {
    #[must_use]
    pub fn new(store: CacheStore, downloader: Downloader, providers: ProviderRegistry) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                downloader,
                providers,
                in_flight: AtomicBool::new(false),
                cycle: AtomicU64::new(0),
            }),
        }
    }

    /// Starts a detached prefetch run for the cycle that just finished.
    ///
    /// Returns `None` when prefetching is disabled or a previous run is still
    /// going; the cycle counter advances either way.
    pub fn spawn(&self, config: Arc<TerrapaperConfig>) -> Option<JoinHandle<()>> {
        let cycle = self.inner.cycle.fetch_add(1, Ordering::SeqCst);
        if !config.prefetch.enabled || self.inner.providers.is_empty() {
            return None;
        }

        if self.inner.in_flight.swap(true, Ordering::SeqCst) {
            tracing::debug!("prefetch still running, skipping");
            return None;
        }

        let inner = Arc::clone(&self.inner);
        let handle = spawn_named_thread("prefetch", move || {
            inner.run(&config.prefetch, cycle);
            inner.in_flight.store(false, Ordering::SeqCst);
        });

        if handle.is_none() {
            self.inner.in_flight.store(false, Ordering::SeqCst);
        }
        handle
    }

    /// Runs one prefetch pass on the calling thread.
    pub fn run_once(&self, policy: &PrefetchConfig, cycle: u64) -> PrefetchReport {
        self.inner.run(policy, cycle)
    }

    /// Cycles seen so far.
    #[must_use]
    pub fn cycles(&self) -> u64 { self.inner.cycle.load(Ordering::SeqCst) }
}

impl std::fmt::Debug for Prefetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Prefetcher")
            .field("in_flight", &self.inner.in_flight.load(Ordering::SeqCst))
            .field("cycle", &self.inner.cycle.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl Inner {
    fn run(&self, policy: &PrefetchConfig, cycle: u64) -> PrefetchReport {
        let mut report = PrefetchReport::default();

        for name in self.providers.names() {
            let Some(provider) = self.providers.get(&name) else {
                continue;
            };
            let pool_size = self.store.entries(&name).len();
            if !should_fetch(pool_size, cycle, provider.is_quota_constrained(), policy) {
                continue;
            }

            report.fetched_sources += 1;
            let (downloaded, failed) = self.fetch_batch(provider.as_ref(), policy.batch_size);
            report.downloaded += downloaded;
            report.failed += failed;
        }

        if report.downloaded > 0 || report.failed > 0 {
            tracing::info!(
                cycle,
                downloaded = report.downloaded,
                failed = report.failed,
                "prefetch finished"
            );
        }
        report
    }

    /// Downloads up to `batch_size` uncached candidates of one provider.
    fn fetch_batch(&self, provider: &dyn ImageProvider, batch_size: usize) -> (usize, usize) {
        let Some(candidates) = provider.list_candidates(provider.default_selector()) else {
            return (0, 1);
        };

        let mut downloaded = 0;
        let mut failed = 0;
        let missing = candidates
            .iter()
            .filter(|meta| candidate_may_pass(meta))
            .filter(|meta| self.store.find_entry(&meta.source, &meta.id).is_none())
            .take(batch_size);

        for meta in missing {
            match self.downloader.fetch_image(&self.store, meta) {
                Ok(path) if passes_quality_gate(&self.store, &meta.source, &path, meta.max_dimension()) => {
                    downloaded += 1;
                }
                Ok(path) => {
                    tracing::debug!(id = %meta.id, "prefetched image is below the quality threshold");
                    if let Err(err) = std::fs::remove_file(&path) {
                        tracing::warn!(error = %err, path = %path.display(), "failed to remove rejected image");
                    }
                    failed += 1;
                }
                Err(err) => {
                    tracing::warn!(error = %err, source = %meta.source, id = %meta.id, "prefetch download failed");
                    failed += 1;
                }
            }
        }

        (downloaded, failed)
    }
}
