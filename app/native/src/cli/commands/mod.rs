//! CLI command definitions using Clap.
//!
//! This module defines all CLI commands and their arguments, organized into
//! domain-specific submodules:
//!
//! - `cache` - Cache inspection and cleanup
//! - `config_cmd` - Configuration file management
//! - `favorites` - Favorites list management
//! - `wallpaper` - One-shot updates, imports and rotation previews

use std::io;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Generator, Shell, generate};

use crate::config::{self, LoadedConfig};
use crate::error::TerrapaperError;
use crate::wallpaper::WallpaperServices;
use crate::{logging, schema};

pub mod cache;
pub mod config_cmd;
pub mod favorites;
pub mod wallpaper;

pub use cache::CacheCommands;
pub use config_cmd::ConfigCommands;
pub use favorites::FavoritesCommands;
pub use self::wallpaper::RotationCommands;

/// Application version from Cargo.toml.
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Terrapaper - renders the Earth, the Moon or your photos onto the desktop.
///
/// Without a command, runs the background daemon.
#[derive(Parser, Debug)]
#[command(name = "terrapaper")]
#[command(author, version = APP_VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a custom configuration file.
    ///
    /// Overrides the default configuration file search paths.
    /// Supports JSONC format (JSON with comments).
    #[arg(long, short, global = true, value_name = "PATH")]
    pub config: Option<String>,

    /// Print debug logs to stderr.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum Commands {
    /// Run the background daemon.
    ///
    /// Renders on a timer and whenever the configuration file changes. This
    /// is the same as running `terrapaper` without a command.
    Run,

    /// Render and install a wallpaper now.
    #[command(after_long_help = r#"Examples:
  terrapaper update              # Render with the current configuration
  terrapaper update --favorite   # Also add the installed image to favorites"#)]
    Update {
        /// Add the installed image to favorites.
        #[arg(long)]
        favorite: bool,
    },

    /// Cache management commands.
    ///
    /// Inspect, sweep and clear the image cache.
    #[command(subcommand)]
    Cache(CacheCommands),

    /// Favorites management commands.
    #[command(subcommand)]
    Favorites(FavoritesCommands),

    /// Import local images into the `user` source.
    ///
    /// Files are copied into the cache; directories are imported one level
    /// deep, in natural file-name order.
    Import {
        /// Image files or directories to import.
        #[arg(required = true, value_name = "PATH")]
        paths: Vec<PathBuf>,
    },

    /// Rotation commands.
    #[command(subcommand)]
    Rotation(RotationCommands),

    /// Configuration file management commands.
    ///
    /// Initialize, view, and manage the configuration file.
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Output Terrapaper configuration JSON Schema.
    ///
    /// Outputs a JSON Schema to stdout that describes the structure of the
    /// configuration file. Can be redirected to a file for use with editors
    /// that support JSON Schema validation.
    Schema,

    /// Generate shell completions.
    ///
    /// Outputs shell completion script to stdout for the specified shell.
    ///
    /// Usage:
    ///   eval "$(terrapaper completions --shell zsh)"
    ///   terrapaper completions --shell fish > ~/.config/fish/completions/terrapaper.fish
    Completions {
        /// The shell to generate completions for.
        #[arg(long, short, value_enum)]
        shell: Shell,
    },
}

impl Cli {
    /// Returns the custom config path if specified via --config flag.
    #[must_use]
    pub fn config_path(&self) -> Option<PathBuf> { self.config.as_ref().map(PathBuf::from) }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command execution fails.
    pub fn execute(&self) -> Result<(), TerrapaperError> {
        let daemon = matches!(self.command, None | Some(Commands::Run));
        logging::init(self.verbose, daemon);

        if let Some(path) = self.config_path() {
            if !path.exists() {
                return Err(TerrapaperError::ConfigError(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            config::set_custom_config_path(path);
        }

        let Some(command) = &self.command else {
            return crate::run();
        };

        match command {
            Commands::Run => crate::run(),
            Commands::Update { favorite } => wallpaper::execute_update(*favorite),
            Commands::Cache(cmd) => cache::execute(cmd),
            Commands::Favorites(cmd) => favorites::execute(cmd),
            Commands::Import { paths } => wallpaper::execute_import(paths),
            Commands::Rotation(cmd) => wallpaper::execute_rotation(cmd),
            Commands::Config(cmd) => config_cmd::execute(cmd),
            Commands::Schema => {
                println!("{}", schema::print_schema());
                Ok(())
            }
            Commands::Completions { shell } => {
                Self::print_completions(*shell);
                Ok(())
            }
        }
    }

    /// Print shell completions to stdout.
    fn print_completions<G: Generator>(generator: G) {
        let mut cmd = Self::command();
        generate(generator, &mut cmd, "terrapaper", &mut io::stdout());
    }
}

/// Configuration and services a command works with.
pub(crate) struct CommandContext {
    pub loaded: LoadedConfig,
    pub services: WallpaperServices,
}

impl CommandContext {
    /// Loads the configuration and builds the wallpaper services.
    pub(crate) fn load() -> Result<Self, TerrapaperError> {
        let loaded = config::load_or_default();
        let services = WallpaperServices::from_config(&loaded.config, &loaded.config_dir())?;
        Ok(Self { loaded, services })
    }
}
