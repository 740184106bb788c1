//! Render cycle state.
//!
//! Not persisted. Tracks what is on the desktop right now so "promote the
//! current wallpaper to a favorite" needs no lookups.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::RwLock;

use super::favorites::FavoriteRecord;
use super::resolver::ResolvedImage;
use crate::config::{FitStyle, RenderMode};

/// Where the displayed image came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageProvenance {
    pub source: String,
    pub id: String,
    pub url: Option<String>,
    pub local_path: PathBuf,
    pub title: String,
}

impl From<&ResolvedImage> for ImageProvenance {
    fn from(image: &ResolvedImage) -> Self {
        Self {
            source: image.source.clone(),
            id: image.id.clone(),
            url: image.url.clone(),
            local_path: image.path.clone(),
            title: image.title.clone(),
        }
    }
}

impl ImageProvenance {
    /// Builds the favorite record for this image.
    #[must_use]
    pub fn to_favorite(&self) -> FavoriteRecord {
        FavoriteRecord {
            source: self.source.clone(),
            image_id: self.id.clone(),
            title: self.title.clone(),
            thumbnail_url: String::new(),
            full_url: self.url.clone().unwrap_or_default(),
            local_cache_path: Some(self.local_path.clone()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderCycleState {
    pub last_update: Option<SystemTime>,
    pub current_mode: Option<RenderMode>,
    pub current_image_style: Option<FitStyle>,
    /// `None` for procedural modes.
    pub current_image: Option<ImageProvenance>,
}

/// Shared handle to the state, written by the render worker.
#[derive(Debug, Clone, Default)]
pub struct SharedCycleState {
    inner: Arc<RwLock<RenderCycleState>>,
}

impl SharedCycleState {
    #[must_use]
    pub fn snapshot(&self) -> RenderCycleState { self.inner.read().clone() }

    /// Records a successful install.
    pub fn record_install(&self, mode: RenderMode, style: FitStyle, image: Option<ImageProvenance>) {
        let mut state = self.inner.write();
        state.last_update = Some(SystemTime::now());
        state.current_mode = Some(mode);
        state.current_image_style = Some(style);
        state.current_image = image;
    }

    /// Favorite record for the image currently on the desktop.
    #[must_use]
    pub fn current_favorite(&self) -> Option<FavoriteRecord> {
        self.inner.read().current_image.as_ref().map(ImageProvenance::to_favorite)
    }
}
