//! Configuration file watcher for hot-reloading.
//!
//! Watches the configuration file and publishes every successfully parsed
//! revision through the [`SettingsHandle`]. A revision that fails to parse is
//! logged and the previous settings stay in effect.

use std::path::{Path, PathBuf};
use std::sync::mpsc::RecvTimeoutError;
use std::thread::JoinHandle;
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};

use super::{SettingsHandle, load_config_from_path};
use crate::platform::thread::spawn_named_thread;

/// Debounce duration for config file changes.
/// Some editors trigger multiple events per save (write to temp, rename, etc.).
const CONFIG_DEBOUNCE_MS: u64 = 200;

/// Starts watching the configuration file for changes.
///
/// Returns `None` if the watcher thread could not be spawned.
pub fn watch_config_file(config_path: PathBuf, settings: SettingsHandle) -> Option<JoinHandle<()>> {
    spawn_named_thread("config-watcher", move || run_watcher(&config_path, &settings))
}

fn run_watcher(config_path: &Path, settings: &SettingsHandle) {
    let config_filename =
        config_path.file_name().map(std::ffi::OsStr::to_os_string).unwrap_or_default();

    let (tx, rx) = std::sync::mpsc::channel();

    let mut watcher: RecommendedWatcher = match notify::recommended_watcher(tx) {
        Ok(w) => w,
        Err(err) => {
            tracing::warn!(error = %err, "failed to create config watcher");
            return;
        }
    };

    // Watch the parent directory to catch editors that save by rename
    let watch_path = config_path.parent().unwrap_or(config_path);

    if let Err(err) = watcher.watch(watch_path, RecursiveMode::NonRecursive) {
        tracing::warn!(error = %err, path = %watch_path.display(), "failed to watch config file");
        return;
    }

    let debounce = Duration::from_millis(CONFIG_DEBOUNCE_MS);

    loop {
        match rx.recv() {
            Ok(Ok(event)) => {
                let affects_config = event
                    .paths
                    .iter()
                    .any(|p| p.file_name().is_some_and(|name| name == config_filename));

                if !affects_config {
                    continue;
                }

                // Swallow the burst of events a single save produces
                loop {
                    match rx.recv_timeout(debounce) {
                        Ok(_) => {}
                        Err(RecvTimeoutError::Timeout) => break,
                        Err(RecvTimeoutError::Disconnected) => return,
                    }
                }

                reload(config_path, settings);
            }
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "config watch error");
            }
            Err(_) => break,
        }
    }
}

fn reload(config_path: &Path, settings: &SettingsHandle) {
    match load_config_from_path(config_path) {
        Ok((config, _)) => {
            if *settings.snapshot() == config {
                tracing::debug!("config file touched without changes");
                return;
            }
            settings.replace(config);
            tracing::info!(path = %config_path.display(), "configuration reloaded");
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to reload configuration, keeping previous settings");
        }
    }
}
