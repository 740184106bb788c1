//! Image metadata returned by providers.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Longest file stem produced by [`sanitize_id`].
const MAX_ID_LEN: usize = 120;

static UNSAFE_ID_CHARS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]+").ok());

/// Download locations of one image, from smallest to largest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImageUrls {
    pub thumbnail: String,
    pub full: String,
    pub hd: String,
}

impl ImageUrls {
    /// Returns the largest available URL.
    #[must_use]
    pub fn best(&self) -> Option<&str> {
        [&self.hd, &self.full, &self.thumbnail]
            .into_iter()
            .map(String::as_str)
            .find(|url| !url.is_empty())
    }
}

/// One candidate image from a provider. `id` is unique within `source`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImageMetadata {
    pub source: String,
    pub id: String,
    pub title: String,
    pub urls: ImageUrls,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub attribution: String,
}

impl ImageMetadata {
    /// Larger of width and height, when both are known.
    #[must_use]
    pub fn max_dimension(&self) -> Option<u32> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some(w.max(h)),
            _ => None,
        }
    }

    /// Sanitized id used as the cache file stem.
    #[must_use]
    pub fn file_stem(&self) -> String { sanitize_id(&self.id) }

    /// File extension to store the download under, taken from the URL path.
    #[must_use]
    pub fn file_extension(&self) -> &'static str {
        self.urls.best().map_or("jpg", extension_from_url)
    }
}

/// Maps an id onto a safe file stem.
///
/// Runs of characters outside `[A-Za-z0-9._-]` become `_`, leading dots are
/// dropped and the result is capped in length. Never returns an empty string.
#[must_use]
pub fn sanitize_id(id: &str) -> String {
    let replaced = UNSAFE_ID_CHARS
        .as_ref()
        .map_or_else(|| id.to_string(), |re| re.replace_all(id, "_").into_owned());

    let trimmed: String =
        replaced.trim_start_matches('.').chars().take(MAX_ID_LEN).collect();

    if trimmed.is_empty() || trimmed.chars().all(|c| c == '_') {
        "image".to_string()
    } else {
        trimmed
    }
}

/// Extension of the last URL path segment, normalized to a supported image type.
#[must_use]
pub fn extension_from_url(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let segment = path.rsplit('/').next().unwrap_or_default();
    let ext = segment.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());

    match ext.as_deref() {
        Some("png") => "png",
        Some("webp") => "webp",
        Some("jpeg") => "jpeg",
        _ => "jpg",
    }
}
