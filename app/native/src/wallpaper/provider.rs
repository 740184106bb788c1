//! Image source providers.
//!
//! A provider lists candidate images of one remote catalog. The core never
//! retries a provider: `None` means "unavailable this cycle".

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;

use crate::config::env::{ApiKeys, DEMO_KEY};
use crate::config::{SourceConfig, TerrapaperConfig};

use super::download::{HttpFetch, validate_url};
use super::metadata::{ImageMetadata, ImageUrls};

/// A remote catalog of images.
pub trait ImageProvider: Send + Sync {
    /// Source name, also the cache directory name.
    fn name(&self) -> &str;

    /// Lists candidate images for `selector`. Returns `None` on any failure.
    fn list_candidates(&self, selector: &str) -> Option<Vec<ImageMetadata>>;

    /// Whether requests count against a small shared quota.
    fn is_quota_constrained(&self) -> bool { false }

    /// Selector used when the caller has none.
    fn default_selector(&self) -> &str { "" }
}

/// Provider for a JSON feed URL.
///
/// The feed must return a JSON array of image objects or a single object.
/// Field names of the common catalogs are accepted (`url`/`hdurl`,
/// `date` as id, `copyright` as attribution).
pub struct JsonFeedProvider {
    name: String,
    feed_url: String,
    api_key: String,
    default_selector: String,
    quota_constrained: bool,
    fetcher: Arc<dyn HttpFetch>,
}

impl JsonFeedProvider {
    /// Builds a provider for a configured source.
    #[must_use]
    pub fn from_source(source: &SourceConfig, keys: &ApiKeys, fetcher: Arc<dyn HttpFetch>) -> Self {
        let api_key = keys.key_or_demo(&source.api_key_var).to_string();
        let uses_key = source.feed_url.contains("{apiKey}");
        let quota_constrained = source.shared_quota || (uses_key && api_key == DEMO_KEY);

        Self {
            name: source.name.clone(),
            feed_url: source.feed_url.clone(),
            api_key,
            default_selector: source.selector.clone(),
            quota_constrained,
            fetcher,
        }
    }

    /// Feed URL with placeholders substituted.
    #[must_use]
    pub fn feed_url_for(&self, selector: &str) -> String {
        let selector = if selector.is_empty() { &self.default_selector } else { selector };
        self.feed_url
            .replace("{apiKey}", &urlencoding::encode(&self.api_key))
            .replace("{selector}", &urlencoding::encode(selector))
    }

    fn fetch_feed(&self, selector: &str) -> Result<Vec<ImageMetadata>, String> {
        let url = validate_url(&self.feed_url_for(selector)).map_err(|e| e.to_string())?;
        let body = self.fetcher.fetch_bytes(&url).map_err(|e| e.to_string())?;
        parse_feed(&self.name, &body).map_err(|e| e.to_string())
    }
}

impl ImageProvider for JsonFeedProvider {
    fn name(&self) -> &str { &self.name }

    fn list_candidates(&self, selector: &str) -> Option<Vec<ImageMetadata>> {
        match self.fetch_feed(selector) {
            Ok(items) => {
                tracing::debug!(source = %self.name, count = items.len(), "feed listed");
                Some(items)
            }
            Err(err) => {
                tracing::warn!(source = %self.name, error = %err, "image provider unavailable");
                None
            }
        }
    }

    fn is_quota_constrained(&self) -> bool { self.quota_constrained }

    fn default_selector(&self) -> &str { &self.default_selector }
}

/// One feed item as returned by the catalogs.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct FeedItem {
    #[serde(alias = "date")]
    id: String,
    title: String,
    #[serde(alias = "full")]
    url: String,
    #[serde(alias = "hdUrl", alias = "hd")]
    hdurl: String,
    #[serde(alias = "thumbnail", alias = "thumbnail_url")]
    thumbnail_url: String,
    urls: Option<ImageUrls>,
    width: Option<u32>,
    height: Option<u32>,
    #[serde(alias = "copyright", alias = "credit")]
    attribution: String,
    #[serde(alias = "media_type")]
    media_type: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FeedBody {
    Many(Vec<FeedItem>),
    One(Box<FeedItem>),
}

impl FeedItem {
    fn into_metadata(self, source: &str) -> Option<ImageMetadata> {
        if !self.media_type.is_empty() && self.media_type != "image" {
            return None;
        }

        let mut urls = self.urls.unwrap_or_default();
        if urls.full.is_empty() {
            urls.full = self.url;
        }
        if urls.hd.is_empty() {
            urls.hd = self.hdurl;
        }
        if urls.thumbnail.is_empty() {
            urls.thumbnail = self.thumbnail_url;
        }

        let id = if self.id.is_empty() { id_from_url(urls.best()?)? } else { self.id };

        Some(ImageMetadata {
            source: source.to_string(),
            id,
            title: self.title,
            urls,
            width: self.width,
            height: self.height,
            attribution: self.attribution.trim().to_string(),
        })
    }
}

/// Parses a feed body into metadata for `source`.
///
/// Items that are not images or carry neither id nor URL are skipped.
///
/// # Errors
///
/// Returns an error if the body is not a JSON array or object.
pub fn parse_feed(source: &str, body: &[u8]) -> Result<Vec<ImageMetadata>, serde_json::Error> {
    let items = match serde_json::from_slice::<FeedBody>(body)? {
        FeedBody::Many(items) => items,
        FeedBody::One(item) => vec![*item],
    };
    Ok(items.into_iter().filter_map(|item| item.into_metadata(source)).collect())
}

fn id_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next()?;
    let segment = path.trim_end_matches('/').rsplit('/').next()?;
    let stem = segment.rsplit_once('.').map_or(segment, |(stem, _)| stem);
    (!stem.is_empty()).then(|| stem.to_string())
}

/// Providers by source name.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn ImageProvider>>,
}

impl ProviderRegistry {
    /// Builds JSON feed providers for every configured source with a feed URL.
    #[must_use]
    pub fn from_config(config: &TerrapaperConfig, keys: &ApiKeys, fetcher: &Arc<dyn HttpFetch>) -> Self {
        let mut registry = Self::default();
        for source in &config.sources {
            if source.name.is_empty() || source.feed_url.is_empty() {
                tracing::warn!(source = %source.name, "skipping source without name or feed URL");
                continue;
            }
            registry.insert(Arc::new(JsonFeedProvider::from_source(source, keys, Arc::clone(fetcher))));
        }
        registry
    }

    pub fn insert(&mut self, provider: Arc<dyn ImageProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn ImageProvider>> { self.providers.get(name).cloned() }

    /// Provider names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> { self.providers.keys().cloned().collect() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.providers.is_empty() }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry").field("providers", &self.names()).finish()
    }
}
