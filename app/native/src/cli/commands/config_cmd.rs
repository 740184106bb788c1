//! Config CLI commands.
//!
//! Commands for managing the Terrapaper configuration file.

use std::path::{Path, PathBuf};

use clap::Subcommand;

use crate::config::template::{create_config_file, generate_config_template};
use crate::config::{config_paths, preferred_config_path};
use crate::error::TerrapaperError;

/// Config management commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum ConfigCommands {
    /// Initialize a new configuration file with all options documented.
    ///
    /// Creates a new configuration file at the default location with all
    /// available options commented out.
    #[command(
        name = "init",
        after_long_help = r#"Examples:
  terrapaper config init              # Create config at default location
  terrapaper config init --force      # Overwrite existing config
  terrapaper config init --path ~/my-config.jsonc  # Create at custom path
  terrapaper config init --stdout     # Print template to stdout"#
    )]
    Init {
        /// Overwrite existing configuration file if it exists.
        #[arg(long, short)]
        force: bool,

        /// Custom path for the configuration file.
        /// If not specified, uses ~/.config/terrapaper/config.jsonc
        #[arg(long, short, value_name = "PATH")]
        path: Option<PathBuf>,

        /// Print the configuration template to stdout instead of writing to a file.
        #[arg(long)]
        stdout: bool,
    },

    /// Show the configuration file search paths.
    ///
    /// Marks the file currently in use, if any.
    Path,
}

/// Execute config subcommands.
///
/// # Errors
///
/// Returns an error if the configuration file cannot be created.
pub fn execute(cmd: &ConfigCommands) -> Result<(), TerrapaperError> {
    match cmd {
        ConfigCommands::Init { force, path, stdout } => {
            if *stdout {
                println!("{}", generate_config_template());
                return Ok(());
            }
            let path = path
                .clone()
                .or_else(preferred_config_path)
                .unwrap_or_else(|| PathBuf::from("config.jsonc"));
            let path = init_config(*force, &path)?;

            println!("Configuration file created at: {}", path.display());
            println!("\nAll options are commented out by default.");
            println!("Edit the file and uncomment the options you want to configure.");
            Ok(())
        }
        ConfigCommands::Path => {
            show_config_path(&config_paths());
            Ok(())
        }
    }
}

/// Writes the template to `path` unless it exists and `force` is off.
fn init_config(force: bool, path: &Path) -> Result<PathBuf, TerrapaperError> {
    if path.exists() && !force {
        return Err(TerrapaperError::ConfigError(format!(
            "Configuration file already exists at: {}\nUse --force to overwrite.",
            path.display()
        )));
    }

    create_config_file(path).map_err(|e| {
        TerrapaperError::ConfigError(format!("Failed to create config file {}: {e}", path.display()))
    })?;
    Ok(path.to_path_buf())
}

fn show_config_path(paths: &[PathBuf]) {
    println!("Configuration file search paths (in priority order):\n");

    let mut found_config = false;
    for (i, path) in paths.iter().enumerate() {
        let exists = path.exists();
        let marker = if exists && !found_config {
            found_config = true;
            " (active)"
        } else if exists {
            " (exists)"
        } else {
            ""
        };

        println!("  {}. {}{}", i + 1, path.display(), marker);
    }

    if !found_config {
        println!("\nNo configuration file found.");
        println!("Run 'terrapaper config init' to create one.");
    }
}
