//! Terrapaper - renders the Earth, the Moon or a rotating photo library onto
//! the desktop background.
//!
//! This library provides both the background daemon and the CLI. The daemon
//! runs the render scheduler until the process is terminated; CLI commands
//! work directly on the cache, favorites and configuration files.

pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod platform;
pub mod schema;
pub mod wallpaper;

use std::sync::Arc;

use crate::config::{LoadedConfig, SettingsHandle};
use crate::error::TerrapaperError;
use crate::wallpaper::{DesktopInstaller, LogStatusSink, Scheduler, UpdateGate, WallpaperServices};

/// Runs the daemon with the configuration found on disk.
///
/// Blocks until the scheduler exits.
///
/// # Errors
///
/// Returns an error if the wallpaper services cannot be created.
pub fn run() -> Result<(), TerrapaperError> { run_with(config::load_or_default()) }

/// Runs the daemon with an already loaded configuration.
///
/// Sweeps the cache once, starts the config watcher, decides the update gate
/// from the launch marker and hands control to the scheduler.
///
/// # Errors
///
/// Returns an error if the wallpaper services cannot be created.
pub fn run_with(loaded: LoadedConfig) -> Result<(), TerrapaperError> {
    let config_dir = loaded.config_dir();
    let LoadedConfig { config, path } = loaded;

    let services = WallpaperServices::from_config(&config, &config_dir)?;
    services.sweep(&config);

    let settings = SettingsHandle::new(config);
    if let Some(path) = path {
        config::watch_config_file(path, settings.clone());
    }

    let gate = UpdateGate::on_launch(&config_dir);
    let cycle = services.render_cycle(Arc::new(DesktopInstaller));
    let scheduler = Scheduler::start(cycle, settings, gate, Arc::new(LogStatusSink));

    tracing::info!(config_dir = %config_dir.display(), "terrapaper running");
    scheduler.join();
    Ok(())
}
