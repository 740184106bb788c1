//! Configuration template generation.
//!
//! Generates a commented configuration template with all available options.

use std::fs;
use std::path::Path;

/// Generates a configuration template with all options commented out.
#[must_use]
pub fn generate_config_template() -> String {
    r##"// Terrapaper Configuration File
// ============================
// This file uses JSONC format (JSON with comments).
// All options below are commented out and show their default values.
// Uncomment and modify the options you want to configure.

{
  // ============================================================================
  // Rendering
  // ============================================================================
  // What to draw: "globe", "flatMap", "moon" or "staticImage"
  // "mode": "globe",
  //
  // How output is spread across monitors: "sameOnAll", "span" or "independent"
  // "displayMode": "sameOnAll",
  //
  // Placement style: "center", "crop", "fit", "span", "stretch" or "tile"
  // "fit": "crop",
  //
  // Seconds between automatic updates (0 = only update on request)
  // "updateInterval": 600,
  //
  // Render size when no displays are configured
  // "width": 1920,
  // "height": 1080,

  // "globe": {
  //   "longitude": 0.0,
  //   "latitude": 20.0,
  //   // Diameter relative to the shorter screen side
  //   "zoom": 0.9,
  //   // Equirectangular textures (empty = built-in surface)
  //   "texture": "",
  //   "nightTexture": "",
  //   "shading": true
  // },

  // "flatMap": {
  //   "centerLongitude": 0.0,
  //   "texture": "",
  //   "nightTexture": "",
  //   "shading": true
  // },

  // "moon": {
  //   "texture": "",
  //   "zoom": 0.8
  // },

  // ============================================================================
  // Still Images
  // ============================================================================
  // "staticImage": {
  //   // "user" (imported images) or the name of a source below
  //   "source": "user",
  //   // Explicit image id per source
  //   "selections": {}
  // },
  //
  // Remote catalogs. The feed must return a JSON array of image objects.
  // "{apiKey}" and "{selector}" are substituted in the feed URL.
  // "sources": [
  //   // {
  //   //   "name": "apod",
  //   //   "feedUrl": "https://api.nasa.gov/planetary/apod?api_key={apiKey}&count=10",
  //   //   "apiKeyVar": "NASA_API_KEY",
  //   //   "sharedQuota": false,
  //   //   "weight": 1,
  //   //   "selector": ""
  //   // }
  // ],
  //
  // Path to a .env file holding the variables named by "apiKeyVar"
  // "apiKeys": "",

  // ============================================================================
  // Rotation and Prefetch
  // ============================================================================
  // "rotation": {
  //   "enabled": false,
  //   // "all", "favorites", "user" or a source name
  //   "source": "all",
  //   // Per-source weights for the "all" pool
  //   "weights": {}
  // },
  //
  // "prefetch": {
  //   "enabled": true,
  //   "minPoolSize": 5,
  //   "maintenanceEvery": 12,
  //   "batchSize": 3
  // },

  // ============================================================================
  // Cache
  // ============================================================================
  // "cache": {
  //   // Empty = platform cache directory
  //   "directory": "",
  //   // 0 = keep forever
  //   "maxAgeDays": 30,
  //   "thumbnailMaxAgeDays": 7,
  //   // Smaller files are treated as truncated downloads
  //   "minValidBytes": 10240
  // },

  // ============================================================================
  // Displays
  // ============================================================================
  // Each display may override "mode", "globe", "flatMap", "moon" and "staticImage"
  // "displays": [
  //   // { "id": "left", "bounds": { "x": 0, "y": 0, "width": 1920, "height": 1080 } },
  //   // { "id": "right", "bounds": { "x": 1920, "y": 200, "width": 1280, "height": 1024 },
  //   //   "mode": "moon" }
  // ]
}
"##
    .to_string()
}

/// Creates a configuration file with the template at the specified path.
///
/// Creates parent directories if they don't exist.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn create_config_file(path: &Path) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, generate_config_template())
}
