//! Shared settings snapshot.
//!
//! Settings are published through a `tokio::sync::watch` channel. Readers
//! take a cheap `Arc` snapshot per cycle; subscribers learn that a change
//! happened without holding any lock across a render.

use std::sync::Arc;

use tokio::sync::watch;

use super::TerrapaperConfig;

/// Handle to the current settings. Clones share the same channel.
#[derive(Clone)]
pub struct SettingsHandle {
    sender: Arc<watch::Sender<Arc<TerrapaperConfig>>>,
}

impl SettingsHandle {
    /// Creates a handle publishing `config` as the initial snapshot.
    #[must_use]
    pub fn new(config: TerrapaperConfig) -> Self {
        let (sender, _) = watch::channel(Arc::new(config));
        Self { sender: Arc::new(sender) }
    }

    /// Returns the current settings.
    #[must_use]
    pub fn snapshot(&self) -> Arc<TerrapaperConfig> { Arc::clone(&self.sender.borrow()) }

    /// Replaces the settings and notifies subscribers.
    pub fn replace(&self, config: TerrapaperConfig) { self.sender.send_replace(Arc::new(config)); }

    /// Mutates the settings in place and notifies subscribers.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut TerrapaperConfig),
    {
        self.sender.send_modify(|current| f(Arc::make_mut(current)));
    }

    /// Creates a subscription that reports changes made after this call.
    #[must_use]
    pub fn subscribe(&self) -> SettingsSubscription {
        SettingsSubscription { receiver: self.sender.subscribe() }
    }
}

impl std::fmt::Debug for SettingsHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsHandle").finish_non_exhaustive()
    }
}

/// Observer of settings changes.
pub struct SettingsSubscription {
    receiver: watch::Receiver<Arc<TerrapaperConfig>>,
}

impl SettingsSubscription {
    /// Returns `true` once per batch of changes since the last call.
    pub fn take_changed(&mut self) -> bool {
        if self.receiver.has_changed().unwrap_or(false) {
            self.receiver.borrow_and_update();
            return true;
        }
        false
    }
}
