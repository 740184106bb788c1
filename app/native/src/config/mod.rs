//! Configuration module for Terrapaper.
//!
//! This module provides configuration types, loading functionality, the
//! shared settings handle and file watching for hot-reloading configuration
//! changes.
//!
//! The configuration file supports JSONC format (JSON with comments).
//! Both single-line (`//`) and multi-line (`/* */`) comments are allowed.

pub mod env;
mod settings;
pub mod template;
pub mod types;
mod watcher;

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub use settings::{SettingsHandle, SettingsSubscription};
pub use types::{
    Bounds, CacheConfig, ConfigError, DisplayConfig, DisplayMode, FitStyle, FlatMapConfig,
    GlobeConfig, MoonConfig, PrefetchConfig, RenderMode, RotationConfig, SourceConfig,
    StaticImageConfig, TerrapaperConfig, config_paths, load_config as load_config_default,
    load_config_from_path,
};
pub use watcher::watch_config_file;

use crate::constants::APP_ID;

/// Custom config path override (set via CLI --config flag).
static CUSTOM_CONFIG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Sets a custom configuration file path to use instead of the default search paths.
///
/// Returns `true` if the path was set successfully, `false` if a path was already set.
pub fn set_custom_config_path(path: PathBuf) -> bool { CUSTOM_CONFIG_PATH.set(path).is_ok() }

/// A configuration together with the file it was read from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: TerrapaperConfig,
    /// `None` when defaults are in use because no file could be loaded.
    pub path: Option<PathBuf>,
}

impl LoadedConfig {
    /// Directory holding the config file, favorites and the launch marker.
    #[must_use]
    pub fn config_dir(&self) -> PathBuf { config_dir_for(self.path.as_deref()) }
}

/// Loads the configuration from disk.
///
/// If no configuration file exists, a template is written to the preferred
/// location and defaults are used. Parse failures also fall back to defaults.
#[must_use]
pub fn load_or_default() -> LoadedConfig {
    let result = CUSTOM_CONFIG_PATH.get().map_or_else(load_config_default, |path| {
        load_config_from_path(path)
    });

    match result {
        Ok((config, path)) => LoadedConfig { config, path: Some(path) },
        Err(ConfigError::NotFound) => LoadedConfig {
            config: TerrapaperConfig::default(),
            path: create_default_config_file(),
        },
        Err(err) => {
            tracing::warn!(error = %err, "failed to load configuration, using defaults");
            LoadedConfig {
                config: TerrapaperConfig::default(),
                path: CUSTOM_CONFIG_PATH.get().cloned(),
            }
        }
    }
}

/// Returns the path a new configuration file should be written to.
#[must_use]
pub fn preferred_config_path() -> Option<PathBuf> {
    CUSTOM_CONFIG_PATH.get().cloned().or_else(|| config_paths().into_iter().next())
}

/// Directory holding `config_path`, or the preferred config directory.
#[must_use]
pub fn config_dir_for(config_path: Option<&Path>) -> PathBuf {
    config_path
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .or_else(|| preferred_config_path().and_then(|p| p.parent().map(Path::to_path_buf)))
        .or_else(|| dirs::config_dir().map(|dir| dir.join(APP_ID)))
        .unwrap_or_else(|| std::env::temp_dir().join(APP_ID))
}

/// Creates a template configuration file at the preferred location.
fn create_default_config_file() -> Option<PathBuf> {
    let Some(config_path) = preferred_config_path() else {
        tracing::debug!("no config path available for creating template");
        return None;
    };

    if config_path.exists() {
        return None;
    }

    match template::create_config_file(&config_path) {
        Ok(()) => {
            tracing::info!(path = %config_path.display(), "created default configuration file");
            Some(config_path)
        }
        Err(err) => {
            tracing::debug!(
                error = %err,
                path = %config_path.display(),
                "failed to create default configuration file"
            );
            None
        }
    }
}
