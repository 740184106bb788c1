//! Image resolution chain.
//!
//! Picks the concrete local file a still-image render uses. Steps are tried
//! in order and the first result that passes the quality gate wins:
//!
//! 1. the rotation override chosen for this cycle
//! 2. the explicit selection, from cache or downloaded on a miss
//! 3. the newest valid cached entry of the source
//! 4. with no selection and an empty cache, the first acceptable candidate
//!
//! Every failure falls through to the next step; the chain itself never
//! fails, it only yields `None`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::USER_SOURCE;

use super::download::Downloader;
use super::metadata::ImageMetadata;
use super::processing::image_dimensions;
use super::provider::ProviderRegistry;
use super::store::{CacheEntry, CacheStore};

/// Smallest accepted `max(width, height)` for provider images.
pub const MIN_QUALITY_DIMENSION: u32 = 1080;

/// Which step of the chain produced an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStep {
    RotationOverride,
    CachedSelection,
    DownloadedSelection,
    CacheFallback,
    FirstCandidate,
}

/// A local image ready to render, with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub path: PathBuf,
    pub source: String,
    pub id: String,
    pub title: String,
    pub url: Option<String>,
    pub step: ResolutionStep,
}

/// Input of one resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveRequest<'a> {
    pub source: &'a str,
    /// Explicitly selected image id.
    pub selection: Option<&'a str>,
    /// Query passed to the provider on a cache miss.
    pub selector: &'a str,
    pub rotation_override: Option<&'a Path>,
}

/// Returns `true` if a local file is good enough to become the wallpaper.
///
/// User imports are exempt. `known_max` is the larger metadata dimension
/// when the provider reported one; otherwise the file header is read.
#[must_use]
pub fn passes_quality_gate(store: &CacheStore, source: &str, path: &Path, known_max: Option<u32>) -> bool {
    if source == USER_SOURCE || store.is_user_import(path) {
        return true;
    }

    known_max
        .or_else(|| image_dimensions(path).map(|(w, h)| w.max(h)))
        .is_some_and(|max| max >= MIN_QUALITY_DIMENSION)
}

/// Returns `false` only when the metadata proves the image is too small.
pub(crate) fn candidate_may_pass(meta: &ImageMetadata) -> bool {
    meta.source == USER_SOURCE || meta.max_dimension().is_none_or(|max| max >= MIN_QUALITY_DIMENSION)
}

/// Resolves images against the cache and the providers.
#[derive(Debug, Clone)]
pub struct ImageResolver {
    store: CacheStore,
    downloader: Downloader,
    providers: ProviderRegistry,
}

impl ImageResolver {
    #[must_use]
    pub const fn new(store: CacheStore, downloader: Downloader, providers: ProviderRegistry) -> Self {
        Self { store, downloader, providers }
    }

    #[must_use]
    pub const fn store(&self) -> &CacheStore { &self.store }

    #[must_use]
    pub const fn downloader(&self) -> &Downloader { &self.downloader }

    #[must_use]
    pub const fn providers(&self) -> &ProviderRegistry { &self.providers }

    /// Runs the chain for `request`.
    #[must_use]
    pub fn resolve(&self, request: &ResolveRequest<'_>) -> Option<ResolvedImage> {
        if let Some(path) = request.rotation_override {
            if let Some(resolved) = self.from_rotation(request.source, path) {
                return Some(resolved);
            }
            tracing::debug!(path = %path.display(), "rotation override rejected");
        }

        if let Some(id) = request.selection
            && let Some(resolved) = self.from_selection(request.source, id, request.selector)
        {
            return Some(resolved);
        }

        if let Some(resolved) = self.from_cache(request.source) {
            return Some(resolved);
        }

        if request.selection.is_none() {
            return self.fetch_first_candidate(request.source, request.selector);
        }

        None
    }

    fn from_rotation(&self, requested_source: &str, path: &Path) -> Option<ResolvedImage> {
        let (source, id) = self.store.identify(path).unwrap_or_else(|| {
            let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
            (requested_source.to_string(), stem)
        });

        if !self.store.is_valid(&source, path) || !passes_quality_gate(&self.store, &source, path, None) {
            return None;
        }

        Some(ResolvedImage {
            path: path.to_path_buf(),
            source,
            id,
            title: String::new(),
            url: None,
            step: ResolutionStep::RotationOverride,
        })
    }

    fn from_selection(&self, source: &str, id: &str, selector: &str) -> Option<ResolvedImage> {
        if let Some(entry) = self.store.find_entry(source, id)
            && passes_quality_gate(&self.store, source, &entry.path, None)
        {
            return Some(resolved_from_entry(entry, ResolutionStep::CachedSelection));
        }

        if source == USER_SOURCE {
            return None;
        }

        let candidates = self.list_candidates(source, selector)?;
        match candidates.iter().find(|meta| meta.id == id) {
            Some(meta) if candidate_may_pass(meta) => {
                self.download(meta, ResolutionStep::DownloadedSelection)
            }
            Some(_) => {
                tracing::info!(source, id, "selected image is below the quality threshold");
                None
            }
            None => {
                tracing::info!(source, id, "selected image not offered by provider, using first candidate");
                self.first_acceptable(&candidates)
            }
        }
    }

    fn from_cache(&self, source: &str) -> Option<ResolvedImage> {
        self.store
            .entries(source)
            .into_iter()
            .rev()
            .find(|entry| passes_quality_gate(&self.store, source, &entry.path, None))
            .map(|entry| resolved_from_entry(entry, ResolutionStep::CacheFallback))
    }

    /// Lists the provider and downloads the first candidate that passes the gate.
    fn fetch_first_candidate(&self, source: &str, selector: &str) -> Option<ResolvedImage> {
        if source == USER_SOURCE {
            return None;
        }
        let candidates = self.list_candidates(source, selector)?;
        self.first_acceptable(&candidates)
    }

    fn first_acceptable(&self, candidates: &[ImageMetadata]) -> Option<ResolvedImage> {
        candidates
            .iter()
            .filter(|meta| candidate_may_pass(meta))
            .find_map(|meta| self.download(meta, ResolutionStep::FirstCandidate))
    }

    fn list_candidates(&self, source: &str, selector: &str) -> Option<Vec<ImageMetadata>> {
        let Some(provider) = self.providers.get(source) else {
            tracing::debug!(source, "no provider configured for source");
            return None;
        };
        let selector = if selector.is_empty() { provider.default_selector() } else { selector };
        provider.list_candidates(selector)
    }

    /// Fetches `meta` unless it is already cached, then applies the gate.
    ///
    /// A downloaded file that fails the gate is deleted again.
    fn download(&self, meta: &ImageMetadata, step: ResolutionStep) -> Option<ResolvedImage> {
        let cached = self.store.find_entry(&meta.source, &meta.id).map(|entry| entry.path);
        let path = match cached {
            Some(path) => path,
            None => match self.downloader.fetch_image(&self.store, meta) {
                Ok(path) => path,
                Err(err) => {
                    tracing::warn!(error = %err, source = %meta.source, id = %meta.id, "image download failed");
                    return None;
                }
            },
        };

        if !passes_quality_gate(&self.store, &meta.source, &path, meta.max_dimension()) {
            tracing::info!(source = %meta.source, id = %meta.id, "downloaded image is below the quality threshold");
            if let Err(err) = fs::remove_file(&path) {
                tracing::warn!(error = %err, path = %path.display(), "failed to remove rejected image");
            }
            return None;
        }

        Some(ResolvedImage {
            path,
            source: meta.source.clone(),
            id: meta.id.clone(),
            title: meta.title.clone(),
            url: meta.urls.best().map(str::to_string),
            step,
        })
    }
}

fn resolved_from_entry(entry: CacheEntry, step: ResolutionStep) -> ResolvedImage {
    ResolvedImage {
        path: entry.path,
        source: entry.source,
        id: entry.id,
        title: String::new(),
        url: None,
        step,
    }
}
