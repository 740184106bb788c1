//! Cache CLI commands.

use clap::Subcommand;
use colored::Colorize;
use serde::Serialize;
use tabled::settings::object::Columns;
use tabled::settings::{Alignment, Modify, Style};
use tabled::{Table, Tabled};

use super::CommandContext;
use crate::cache::{self, format_bytes};
use crate::cli::output;
use crate::constants::USER_SOURCE;
use crate::error::TerrapaperError;
use crate::wallpaper::{CacheEntry, CacheStore};

/// Cache subcommands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum CacheCommands {
    /// Print the cache root directory.
    Path,

    /// Remove downloaded images, thumbnails and rendered output.
    ///
    /// Imported images are originals and are kept.
    #[command(after_long_help = r#"Examples:
  terrapaper cache clear   # Free the space used by downloads"#)]
    Clear,

    /// Run the retention sweep now.
    ///
    /// Deletes entries older than `cache.maxAgeDays`, always keeping the
    /// newest entry of every source and anything in favorites.
    Sweep,

    /// List cached sources, or the entries of one source.
    #[command(after_long_help = r#"Examples:
  terrapaper cache list                  # One row per source
  terrapaper cache list --source apod    # Entries of one source
  terrapaper cache list --json           # Machine-readable output"#)]
    List {
        /// Only list entries of this source.
        #[arg(long, short)]
        source: Option<String>,

        /// Output as JSON.
        #[arg(long, short)]
        json: bool,
    },
}

/// Execute cache subcommands.
///
/// # Errors
///
/// Returns an error if the cache cannot be read or modified.
pub fn execute(cmd: &CacheCommands) -> Result<(), TerrapaperError> {
    let context = CommandContext::load()?;
    let store = context.services.store();

    match cmd {
        CacheCommands::Path => {
            println!("{}", store.root().display());
            Ok(())
        }
        CacheCommands::Clear => clear(store),
        CacheCommands::Sweep => {
            let report = context.services.sweep(&context.loaded.config);
            println!(
                "Removed {} file(s), freed {}. {} expired favorite(s) kept.",
                report.removed,
                format_bytes(report.bytes_freed),
                report.protected
            );
            Ok(())
        }
        CacheCommands::List { source, json } => {
            match source {
                Some(source) => list_entries(store, source, *json),
                None => list_sources(store, *json),
            }
            Ok(())
        }
    }
}

fn clear(store: &CacheStore) -> Result<(), TerrapaperError> {
    if !store.root().exists() {
        println!("Cache directory does not exist. Nothing to clear.");
        return Ok(());
    }

    let bytes_freed = cache::clear_cache(store.root())
        .map_err(|err| TerrapaperError::CacheError(format!("Failed to clear cache: {err}")))?;
    println!("Cache cleared successfully. Freed {}.", format_bytes(bytes_freed));
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SourceSummary {
    source: String,
    entries: usize,
    bytes: u64,
    newest: Option<String>,
}

/// Summaries of every source, the `user` imports last.
fn summarize(store: &CacheStore) -> Vec<SourceSummary> {
    let mut sources = store.sources();
    sources.push(USER_SOURCE.to_string());

    sources
        .into_iter()
        .map(|source| {
            let entries = store.entries(&source);
            SourceSummary {
                bytes: entries.iter().map(|e| e.size).sum(),
                newest: entries.last().map(|e| e.id.clone()),
                entries: entries.len(),
                source,
            }
        })
        .filter(|summary| summary.entries > 0)
        .collect()
}

fn list_sources(store: &CacheStore, json: bool) {
    #[derive(Tabled)]
    struct SourceRow {
        #[tabled(rename = "Source")]
        source: String,
        #[tabled(rename = "Entries")]
        entries: usize,
        #[tabled(rename = "Size")]
        size: String,
        #[tabled(rename = "Newest")]
        newest: String,
    }

    let summaries = summarize(store);
    if json {
        output::print_highlighted_json(&serde_json::to_value(&summaries).unwrap_or_default());
        return;
    }
    if summaries.is_empty() {
        println!("{}", "The cache is empty.".dimmed());
        return;
    }

    let rows: Vec<SourceRow> = summaries
        .iter()
        .map(|s| SourceRow {
            source: s.source.clone(),
            entries: s.entries,
            size: format_bytes(s.bytes),
            newest: output::truncate(s.newest.as_deref().unwrap_or(""), 40),
        })
        .collect();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..3)).with(Alignment::right()))
        .to_string();

    println!("{}", format!("Cache ({})", store.root().display()).bold());
    println!("{table}");
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EntryView {
    id: String,
    path: String,
    bytes: u64,
    age_days: u64,
}

impl From<&CacheEntry> for EntryView {
    fn from(entry: &CacheEntry) -> Self {
        let age = entry.modified.elapsed().map(|d| d.as_secs() / 86_400).unwrap_or(0);
        Self {
            id: entry.id.clone(),
            path: entry.path.display().to_string(),
            bytes: entry.size,
            age_days: age,
        }
    }
}

fn list_entries(store: &CacheStore, source: &str, json: bool) {
    #[derive(Tabled)]
    struct EntryRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Size")]
        size: String,
        #[tabled(rename = "Age")]
        age: String,
    }

    // Newest first reads better on a terminal
    let entries: Vec<EntryView> = store.entries(source).iter().rev().map(EntryView::from).collect();
    if json {
        output::print_highlighted_json(&serde_json::to_value(&entries).unwrap_or_default());
        return;
    }
    if entries.is_empty() {
        println!("{}", format!("No cached images for '{source}'.").dimmed());
        return;
    }

    let rows: Vec<EntryRow> = entries
        .iter()
        .map(|e| EntryRow {
            id: output::truncate(&e.id, 48),
            size: format_bytes(e.bytes),
            age: format!("{}d", e.age_days),
        })
        .collect();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..3)).with(Alignment::right()))
        .to_string();

    println!("{}", format!("{source} ({})", entries.len()).bold());
    println!("{table}");
}
