//! Update gate.
//!
//! On the very first launch the gate starts open so the default view is
//! rendered right away. Every later launch starts gated: the wallpaper that
//! is already installed stays until the user changes a setting or asks for
//! an update.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Marker file recording that the app has launched before.
pub const LAUNCH_MARKER: &str = ".launched";

/// Two-state gate suppressing automatic cycles.
#[derive(Debug)]
pub struct UpdateGate {
    open: AtomicBool,
}

impl UpdateGate {
    #[must_use]
    pub const fn open() -> Self { Self { open: AtomicBool::new(true) } }

    #[must_use]
    pub const fn gated() -> Self { Self { open: AtomicBool::new(false) } }

    /// Builds the gate for this launch from the marker in `state_dir`.
    ///
    /// The marker is created on the first launch. A marker that cannot be
    /// written is logged and the gate opens anyway.
    #[must_use]
    pub fn on_launch(state_dir: &Path) -> Self {
        let marker = marker_path(state_dir);
        if marker.exists() {
            tracing::debug!("subsequent launch, updates wait for the user");
            return Self::gated();
        }

        if let Err(err) = fs::create_dir_all(state_dir).and_then(|()| fs::write(&marker, b"")) {
            tracing::warn!(error = %err, path = %marker.display(), "failed to write launch marker");
        }
        tracing::info!("first launch, rendering the default view");
        Self::open()
    }

    #[must_use]
    pub fn is_open(&self) -> bool { self.open.load(Ordering::SeqCst) }

    /// Opens the gate. Returns `true` if it was closed.
    pub fn release(&self) -> bool { !self.open.swap(true, Ordering::SeqCst) }
}

#[must_use]
pub fn marker_path(state_dir: &Path) -> PathBuf { state_dir.join(LAUNCH_MARKER) }
