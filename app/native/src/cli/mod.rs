//! CLI module for Terrapaper.
//!
//! Commands work directly on the cache, favorites and configuration files;
//! none of them talk to a running daemon. `update` renders and installs one
//! wallpaper in-process.

mod commands;
mod output;

use clap::Parser;
pub use commands::Cli;

use crate::error::TerrapaperError;

/// Runs the CLI.
///
/// Parses command-line arguments and executes the appropriate command.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn run() -> Result<(), TerrapaperError> {
    let cli = Cli::parse();
    cli.execute()
}
