//! HTTP fetching and atomic downloads into the cache.
//!
//! Every download validates its URL first, streams into a temporary file
//! next to the destination and is renamed into place only once complete and
//! larger than the validity threshold. A failed or partial download leaves
//! nothing at the destination path.

use std::fs;
use std::io::Write;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;

use super::metadata::ImageMetadata;
use super::processing::TEMP_PREFIX;
use super::store::CacheStore;

/// Request timeout for feeds and images.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Redirect hops followed before giving up.
const MAX_REDIRECTS: usize = 10;

/// User agent sent with every request.
const USER_AGENT: &str = concat!("terrapaper/", env!("CARGO_PKG_VERSION"));

/// Errors raised while fetching remote content.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("Invalid URL '{0}'")]
    InvalidUrl(String),
    #[error("Refusing to fetch from non-public host '{0}'")]
    BlockedHost(String),
    #[error("Unsupported URL scheme '{0}'")]
    UnsupportedScheme(String),
    #[error("Request failed: {0}")]
    Http(String),
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
    #[error("Download too small ({bytes} bytes, need more than {min})")]
    TooSmall { bytes: u64, min: u64 },
    #[error("No download URL for image '{0}'")]
    MissingUrl(String),
    #[error("Download I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Synchronous HTTP GET, abstracted so tests can run without a network.
pub trait HttpFetch: Send + Sync {
    /// Streams the response body into `sink` and returns the byte count.
    ///
    /// # Errors
    ///
    /// Returns an error on connection failure, timeout or a non-2xx status.
    fn fetch_into(&self, url: &Url, sink: &mut dyn Write) -> Result<u64, DownloadError>;

    /// Returns the whole response body.
    ///
    /// # Errors
    ///
    /// See [`HttpFetch::fetch_into`].
    fn fetch_bytes(&self, url: &Url) -> Result<Vec<u8>, DownloadError> {
        let mut body = Vec::new();
        self.fetch_into(url, &mut body)?;
        Ok(body)
    }
}

/// [`HttpFetch`] backed by a blocking reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    /// Creates a fetcher with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, DownloadError> { Self::with_timeout(DEFAULT_TIMEOUT) }

    /// Creates a fetcher with a custom timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn with_timeout(timeout: Duration) -> Result<Self, DownloadError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .redirect(Policy::custom(|attempt| {
                if follows_redirect(attempt.url(), attempt.previous().len()) {
                    attempt.follow()
                } else {
                    attempt.stop()
                }
            }))
            .build()
            .map_err(|e| DownloadError::Http(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl HttpFetch for ReqwestFetcher {
    fn fetch_into(&self, url: &Url, sink: &mut dyn Write) -> Result<u64, DownloadError> {
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| DownloadError::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DownloadError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        response.copy_to(sink).map_err(|e| DownloadError::Http(e.to_string()))
    }
}

/// Parses `raw` and rejects anything but http(s) URLs on public hosts.
///
/// Hostnames are not resolved; only literal addresses and `localhost` are
/// checked.
///
/// # Errors
///
/// Returns an error for malformed URLs, other schemes, and loopback,
/// link-local, private or unspecified hosts.
pub fn validate_url(raw: &str) -> Result<Url, DownloadError> {
    let url = Url::parse(raw.trim()).map_err(|_| DownloadError::InvalidUrl(raw.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(DownloadError::UnsupportedScheme(url.scheme().to_string()));
    }

    let Some(host) = url.host_str().filter(|h| !h.is_empty()) else {
        return Err(DownloadError::InvalidUrl(raw.to_string()));
    };

    let literal = host.trim_start_matches('[').trim_end_matches(']');
    let blocked = match literal.parse::<IpAddr>() {
        Ok(ip) => !is_public_ip(ip),
        Err(_) => {
            let domain = host.trim_end_matches('.').to_ascii_lowercase();
            domain == "localhost" || domain.ends_with(".localhost")
        }
    };

    if blocked {
        return Err(DownloadError::BlockedHost(host.to_string()));
    }

    Ok(url)
}

/// Whether a redirect to `next` may be followed after `hops` earlier hops.
///
/// Redirect targets pass the same checks as the original URL.
fn follows_redirect(next: &Url, hops: usize) -> bool {
    hops < MAX_REDIRECTS && validate_url(next.as_str()).is_ok()
}

fn is_public_ipv4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    // 100.64.0.0/10 carrier-grade NAT
    let shared = a == 100 && (64..128).contains(&b);
    !(ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || shared)
}

fn is_public_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_public_ipv4(v4),
        IpAddr::V6(v6) => {
            if let Some(mapped) = v6.to_ipv4_mapped() {
                return is_public_ipv4(mapped);
            }
            let first = v6.segments()[0];
            let unique_local = first & 0xfe00 == 0xfc00;
            let link_local = first & 0xffc0 == 0xfe80;
            !(v6.is_loopback() || v6.is_unspecified() || unique_local || link_local)
        }
    }
}

/// Downloads files into the cache.
#[derive(Clone)]
pub struct Downloader {
    fetcher: Arc<dyn HttpFetch>,
    min_valid_bytes: u64,
}

impl std::fmt::Debug for Downloader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Downloader")
            .field("min_valid_bytes", &self.min_valid_bytes)
            .finish_non_exhaustive()
    }
}

impl Downloader {
    #[must_use]
    pub fn new(fetcher: Arc<dyn HttpFetch>, min_valid_bytes: u64) -> Self {
        Self { fetcher, min_valid_bytes }
    }

    /// The fetcher used for requests, shared with feed providers.
    #[must_use]
    pub fn fetcher(&self) -> Arc<dyn HttpFetch> { Arc::clone(&self.fetcher) }

    /// Downloads `url` to `dest` atomically. Returns the byte count.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is rejected, the request fails, the body
    /// is not larger than the validity threshold or the rename fails.
    pub fn download(&self, url: &str, dest: &Path) -> Result<u64, DownloadError> {
        let url = validate_url(url)?;

        let dir = dest.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        // Dropping the temp file on any early return deletes it
        let mut tmp = tempfile::Builder::new().prefix(TEMP_PREFIX).tempfile_in(dir)?;

        let bytes = self.fetcher.fetch_into(&url, tmp.as_file_mut())?;
        tmp.as_file_mut().flush()?;

        if bytes <= self.min_valid_bytes {
            return Err(DownloadError::TooSmall { bytes, min: self.min_valid_bytes });
        }

        tmp.persist(dest).map_err(|e| DownloadError::Io(e.error))?;
        tracing::debug!(url = %url, path = %dest.display(), bytes, "download complete");
        Ok(bytes)
    }

    /// Downloads the best URL of `meta` into its cache entry and writes the
    /// thumbnail sidecar. Thumbnail failures are only logged.
    ///
    /// # Errors
    ///
    /// Returns an error if the image has no URL or the download fails.
    pub fn fetch_image(&self, store: &CacheStore, meta: &ImageMetadata) -> Result<PathBuf, DownloadError> {
        let url = meta.urls.best().ok_or_else(|| DownloadError::MissingUrl(meta.id.clone()))?;
        let dest = store.entry_path(&meta.source, &meta.id, meta.file_extension());

        self.download(url, &dest)?;

        if let Err(err) = store.write_thumbnail(&meta.source, &meta.id, &dest) {
            tracing::warn!(error = %err, id = %meta.id, "failed to write thumbnail");
        }

        Ok(dest)
    }
}
