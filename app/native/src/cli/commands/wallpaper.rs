//! Wallpaper CLI commands.
//!
//! One-shot updates, local imports and rotation previews.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use clap::Subcommand;
use colored::Colorize;
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use super::CommandContext;
use crate::cli::output;
use crate::error::TerrapaperError;
use crate::wallpaper::processing::list_images_in_directory;
use crate::wallpaper::rotation::{self, RotationPool, RotationSource};
use crate::wallpaper::{CacheEntry, CacheStore, CycleOutcome, CycleReport, CycleRunner, DesktopInstaller};

/// Rotation subcommands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum RotationCommands {
    /// Show the order the rotation pool will be walked in.
    #[command(after_long_help = r#"Examples:
  terrapaper rotation preview                     # Pool of rotation.source
  terrapaper rotation preview --source favorites  # Favorites only
  terrapaper rotation preview --limit 5 --json"#)]
    Preview {
        /// Pool to preview: `all`, `favorites`, `user` or a source name.
        /// Defaults to `rotation.source` from the configuration.
        #[arg(long, short)]
        source: Option<String>,

        /// Show at most this many entries.
        #[arg(long, short, default_value_t = 20)]
        limit: usize,

        /// Output as JSON.
        #[arg(long, short)]
        json: bool,
    },
}

/// Runs a single render cycle and installs the result.
///
/// # Errors
///
/// Returns an error if the cycle fails, or if `favorite` is set and the
/// installed wallpaper has no source image.
pub fn execute_update(favorite: bool) -> Result<(), TerrapaperError> {
    let context = CommandContext::load()?;
    let config = &context.loaded.config;
    let mut cycle = context.services.render_cycle(Arc::new(DesktopInstaller));

    let report = cycle.run_cycle(config, &AtomicBool::new(false))?;
    print_report(&report);

    if !favorite || report.outcome != CycleOutcome::Updated {
        return Ok(());
    }

    let record = cycle.state().current_favorite().ok_or_else(|| {
        TerrapaperError::InvalidArguments(format!(
            "{} wallpapers have no source image to favorite",
            config.mode.display_name()
        ))
    })?;
    let label = format!("{}/{}", record.source, record.image_id);
    if context.services.favorites().add(record)? {
        println!("Added {label} to favorites.");
    } else {
        println!("{label} is already a favorite.");
    }
    Ok(())
}

fn print_report(report: &CycleReport) {
    let outcome = match report.outcome {
        CycleOutcome::Updated => "updated".green(),
        CycleOutcome::Skipped => "skipped".yellow(),
        CycleOutcome::Failed => "failed".red(),
    };
    println!("{} {} ({})", outcome.bold(), report.description, report.source);
    if let Some(path) = &report.path {
        println!("{}", path.display().to_string().dimmed());
    }
}

/// Expands directories one level deep, in natural file-name order.
fn expand_import_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    paths
        .iter()
        .flat_map(|path| {
            if path.is_dir() { list_images_in_directory(path) } else { vec![path.clone()] }
        })
        .collect()
}

/// Imports every file, reporting failures without stopping.
fn import_all(store: &CacheStore, files: &[PathBuf]) -> (Vec<CacheEntry>, Vec<(PathBuf, String)>) {
    let mut imported = Vec::new();
    let mut failed = Vec::new();
    for file in files {
        match store.import(file) {
            Ok(entry) => {
                tracing::debug!(path = %file.display(), id = %entry.id, "image imported");
                imported.push(entry);
            }
            Err(err) => failed.push((file.clone(), err.to_string())),
        }
    }
    (imported, failed)
}

/// Copies local images into the `user` source.
///
/// # Errors
///
/// Returns an error if no image could be imported.
pub fn execute_import(paths: &[PathBuf]) -> Result<(), TerrapaperError> {
    let context = CommandContext::load()?;
    let files = expand_import_paths(paths);
    if files.is_empty() {
        return Err(TerrapaperError::InvalidArguments("No images found to import".to_string()));
    }

    let (imported, failed) = import_all(context.services.store(), &files);
    for entry in &imported {
        println!("{} {}", "imported".green(), entry.id);
    }
    for (path, reason) in &failed {
        eprintln!("{} {}: {reason}", "skipped".yellow(), path.display());
    }

    if imported.is_empty() {
        return Err(TerrapaperError::CacheError(format!("None of {} file(s) could be imported", files.len())));
    }
    println!("Imported {} of {} file(s).", imported.len(), files.len());
    Ok(())
}

/// Execute rotation subcommands.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded.
pub fn execute_rotation(cmd: &RotationCommands) -> Result<(), TerrapaperError> {
    let context = CommandContext::load()?;
    let config = &context.loaded.config;

    match cmd {
        RotationCommands::Preview { source, limit, json } => {
            let source = RotationSource::parse(source.as_deref().unwrap_or(&config.rotation.source));
            let pool = rotation::build_pool(
                context.services.store(),
                context.services.favorites(),
                config,
                &source,
            );
            print_preview(context.services.store(), &source, &pool, *limit, *json);
            Ok(())
        }
    }
}

#[derive(Debug, Serialize)]
struct PreviewEntry {
    position: usize,
    source: String,
    id: String,
    path: String,
}

fn preview_entries(store: &CacheStore, pool: &RotationPool, limit: usize) -> Vec<PreviewEntry> {
    pool.paths()
        .iter()
        .take(limit)
        .enumerate()
        .map(|(position, path)| {
            let (source, id) = store.identify(path).unwrap_or_else(|| (String::new(), file_stem(path)));
            PreviewEntry {
                position,
                source,
                id,
                path: path.display().to_string(),
            }
        })
        .collect()
}

fn file_stem(path: &Path) -> String {
    path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
}

fn print_preview(store: &CacheStore, source: &RotationSource, pool: &RotationPool, limit: usize, json: bool) {
    #[derive(Tabled)]
    struct PreviewRow {
        #[tabled(rename = "#")]
        position: usize,
        #[tabled(rename = "Source")]
        source: String,
        #[tabled(rename = "ID")]
        id: String,
    }

    let entries = preview_entries(store, pool, limit);
    if json {
        output::print_highlighted_json(&serde_json::to_value(&entries).unwrap_or_default());
        return;
    }
    if entries.is_empty() {
        println!("{}", format!("The '{source}' rotation pool is empty.").dimmed());
        return;
    }

    let rows: Vec<PreviewRow> = entries
        .into_iter()
        .map(|e| PreviewRow {
            position: e.position,
            source: e.source,
            id: output::truncate(&e.id, 48),
        })
        .collect();

    println!("{}", format!("Rotation '{source}' ({} entries)", pool.len()).bold());
    println!("{}", Table::new(rows).with(Style::rounded()));
}
