//! Favorites CLI commands.

use clap::Subcommand;
use colored::Colorize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use super::CommandContext;
use crate::cli::output;
use crate::error::TerrapaperError;
use crate::wallpaper::favorites::resolve_record;
use crate::wallpaper::{CacheStore, FavoriteRecord};

/// Favorites subcommands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum FavoritesCommands {
    /// List favorites.
    List {
        /// Output as JSON.
        #[arg(long, short)]
        json: bool,
    },

    /// Add an image to favorites.
    ///
    /// Favorites are never removed by the retention sweep.
    #[command(after_long_help = r#"Examples:
  terrapaper favorites add apod 2024-01-01
  terrapaper favorites add user 0192f4c8-7d3a-7cc1-b1a6-5e1c0f9d2a11"#)]
    Add {
        /// Source the image belongs to.
        source: String,
        /// Image id within the source.
        id: String,
    },

    /// Remove an image from favorites.
    Remove {
        /// Source the image belongs to.
        source: String,
        /// Image id within the source.
        id: String,
    },
}

/// Execute favorites subcommands.
///
/// # Errors
///
/// Returns an error if the favorites file cannot be written.
pub fn execute(cmd: &FavoritesCommands) -> Result<(), TerrapaperError> {
    let context = CommandContext::load()?;
    let store = context.services.store();
    let favorites = context.services.favorites();

    match cmd {
        FavoritesCommands::List { json } => {
            print_favorites(store, &favorites.list(), *json);
            Ok(())
        }
        FavoritesCommands::Add { source, id } => {
            let record = record_for(store, source, id);
            let cached = record.local_cache_path.is_some();
            if favorites.add(record)? {
                println!("Added {source}/{id} to favorites.");
                if !cached {
                    println!("{}", "The image is not cached yet.".dimmed());
                }
            } else {
                println!("{source}/{id} is already a favorite.");
            }
            Ok(())
        }
        FavoritesCommands::Remove { source, id } => {
            if favorites.remove(source, id)? {
                println!("Removed {source}/{id} from favorites.");
                Ok(())
            } else {
                Err(TerrapaperError::FavoritesError(format!("{source}/{id} is not a favorite")))
            }
        }
    }
}

/// Builds a record, filling the local path when the image is cached.
fn record_for(store: &CacheStore, source: &str, id: &str) -> FavoriteRecord {
    FavoriteRecord {
        source: source.to_string(),
        image_id: id.to_string(),
        local_cache_path: store.find_entry(source, id).map(|e| e.path),
        ..Default::default()
    }
}

fn print_favorites(store: &CacheStore, records: &[FavoriteRecord], json: bool) {
    #[derive(Tabled)]
    struct FavoriteRow {
        #[tabled(rename = "Source")]
        source: String,
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Title")]
        title: String,
        #[tabled(rename = "Cached")]
        cached: String,
    }

    if json {
        output::print_highlighted_json(&serde_json::to_value(records).unwrap_or_default());
        return;
    }
    if records.is_empty() {
        println!("{}", "No favorites yet.".dimmed());
        return;
    }

    let rows: Vec<FavoriteRow> = records
        .iter()
        .map(|r| FavoriteRow {
            source: r.source.clone(),
            id: output::truncate(&r.image_id, 40),
            title: output::truncate(&r.title, 40),
            cached: output::format_bool(resolve_record(store, r).is_some()),
        })
        .collect();

    println!("{}", format!("Favorites ({})", records.len()).bold());
    println!("{}", Table::new(rows).with(Style::rounded()));
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::wallpaper::resolver::tests::cache_png;

    #[test]
    fn test_record_for_cached_image() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(temp.path().to_path_buf(), 0);
        let path = cache_png(&store, "apod", "2024-01-01", 8, 8);

        let record = record_for(&store, "apod", "2024-01-01");
        assert_eq!(record.image_id, "2024-01-01");
        assert_eq!(record.local_cache_path, Some(path));
    }

    #[test]
    fn test_record_for_missing_image() {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(temp.path().to_path_buf(), 0);

        let record = record_for(&store, "apod", "missing");
        assert_eq!(record.source, "apod");
        assert_eq!(record.image_id, "missing");
        assert!(record.local_cache_path.is_none());
    }
}
