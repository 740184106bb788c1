//! Configuration types for Terrapaper.
//!
//! This module provides the configuration types and loading functionality.
//! The configuration file supports JSONC format (JSON with comments).
//! Both single-line (`//`) and multi-line (`/* */`) comments are allowed.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::constants::{APP_ID, USER_SOURCE};

/// What gets drawn onto the desktop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum RenderMode {
    /// The Earth as seen from space, lit by the current position of the Sun.
    #[default]
    Globe,
    /// An equirectangular world map with the day/night terminator.
    FlatMap,
    /// The Moon in its current phase.
    Moon,
    /// A still image resolved from a provider, favorites or user imports.
    StaticImage,
}

impl RenderMode {
    /// Returns the lowercase display name used in status messages.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Globe => "globe",
            Self::FlatMap => "flat map",
            Self::Moon => "moon",
            Self::StaticImage => "image",
        }
    }
}

/// How rendered output is spread across monitors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum DisplayMode {
    /// Render once at the primary size; the desktop repeats it on every monitor.
    #[default]
    SameOnAll,
    /// Render once at the size of the whole virtual desktop and span it.
    Span,
    /// Render every configured display separately and composite the results.
    Independent,
}

/// Placement style passed to the desktop when installing a single-screen image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FitStyle {
    /// Center the image without scaling.
    Center,
    /// Scale to cover the screen, cropping the overflow.
    #[default]
    Crop,
    /// Scale to fit inside the screen.
    Fit,
    /// Stretch one image across every monitor.
    Span,
    /// Stretch to the screen size ignoring aspect ratio.
    Stretch,
    /// Repeat the image.
    Tile,
}

/// Globe renderer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct GlobeConfig {
    /// Longitude in degrees at the center of the view.
    pub longitude: f64,
    /// Latitude in degrees at the center of the view.
    pub latitude: f64,
    /// Globe diameter relative to the shorter screen side (1.0 fills it).
    pub zoom: f64,
    /// Equirectangular day texture. Empty selects the built-in surface.
    pub texture: String,
    /// Equirectangular night texture (city lights). Empty darkens the day texture.
    pub night_texture: String,
    /// Whether to shade the night side.
    pub shading: bool,
}

impl Default for GlobeConfig {
    fn default() -> Self {
        Self {
            longitude: 0.0,
            latitude: 20.0,
            zoom: 0.9,
            texture: String::new(),
            night_texture: String::new(),
            shading: true,
        }
    }
}

/// Flat map renderer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct FlatMapConfig {
    /// Longitude in degrees at the horizontal center of the map.
    pub center_longitude: f64,
    /// Equirectangular day texture. Empty selects the built-in surface.
    pub texture: String,
    /// Equirectangular night texture. Empty darkens the day texture.
    pub night_texture: String,
    /// Whether to shade the night side.
    pub shading: bool,
}

impl Default for FlatMapConfig {
    fn default() -> Self {
        Self {
            center_longitude: 0.0,
            texture: String::new(),
            night_texture: String::new(),
            shading: true,
        }
    }
}

/// Moon renderer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct MoonConfig {
    /// Equirectangular lunar texture. Empty selects the built-in surface.
    pub texture: String,
    /// Moon diameter relative to the shorter screen side.
    pub zoom: f64,
}

impl Default for MoonConfig {
    fn default() -> Self { Self { texture: String::new(), zoom: 0.8 } }
}

/// Still-image selection state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct StaticImageConfig {
    /// Source to draw images from (`user` or the name of a configured source).
    pub source: String,
    /// Explicitly selected image id per source.
    pub selections: BTreeMap<String, String>,
    /// Query passed to the provider. Empty uses the source's own selector.
    pub selector: String,
}

impl Default for StaticImageConfig {
    fn default() -> Self {
        Self {
            source: USER_SOURCE.to_string(),
            selections: BTreeMap::new(),
            selector: String::new(),
        }
    }
}

impl StaticImageConfig {
    /// Returns the explicit selection for the active source, if any.
    #[must_use]
    pub fn selection(&self) -> Option<&str> {
        self.selections.get(&self.source).map(String::as_str).filter(|id| !id.is_empty())
    }
}

/// A remote image catalog.
///
/// The feed URL must return a JSON array of image metadata objects. The
/// placeholders `{apiKey}` and `{selector}` are substituted before the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct SourceConfig {
    /// Unique source name, also used as the cache directory name.
    pub name: String,
    /// Metadata feed URL.
    pub feed_url: String,
    /// Name of the variable in the `apiKeys` file holding this source's key.
    pub api_key_var: String,
    /// Whether the key is a shared, low-rate key. Forces conservative prefetching.
    pub shared_quota: bool,
    /// Weight of this source in the "all" rotation pool.
    pub weight: u32,
    /// Query or category passed as `{selector}`.
    pub selector: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            feed_url: String::new(),
            api_key_var: String::new(),
            shared_quota: false,
            weight: 1,
            selector: String::new(),
        }
    }
}

/// Rotation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct RotationConfig {
    /// Whether each cycle advances to the next cached image.
    pub enabled: bool,
    /// Pool to rotate through: `all`, `favorites`, `user` or a source name.
    pub source: String,
    /// Per-source weights for the `all` pool. Overrides the source's own weight.
    pub weights: BTreeMap<String, u32>,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            source: "all".to_string(),
            weights: BTreeMap::new(),
        }
    }
}

/// Cache retention settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    /// Cache root. Empty selects the platform cache directory.
    pub directory: String,
    /// Maximum age of cached images in days. 0 keeps them forever.
    pub max_age_days: u32,
    /// Maximum age of thumbnails in days. 0 keeps them forever.
    pub thumbnail_max_age_days: u32,
    /// Files at or below this size are treated as truncated downloads.
    pub min_valid_bytes: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: String::new(),
            max_age_days: 30,
            thumbnail_max_age_days: 7,
            min_valid_bytes: 10 * 1024,
        }
    }
}

/// Background prefetch settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct PrefetchConfig {
    /// Whether to grow the cache in the background after each cycle.
    pub enabled: bool,
    /// Below this many cached images a source is fetched for every cycle.
    pub min_pool_size: usize,
    /// Otherwise (or when quota-constrained) fetch once every this many cycles.
    pub maintenance_every: u32,
    /// Maximum downloads per source per prefetch run.
    pub batch_size: usize,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_pool_size: 5,
            maintenance_every: 12,
            batch_size: 3,
        }
    }
}

/// Rectangle in virtual-desktop pixel coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    #[must_use]
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self { Self { x, y, width, height } }

    /// Right edge (exclusive).
    #[must_use]
    pub fn right(&self) -> i64 { i64::from(self.x) + i64::from(self.width) }

    /// Bottom edge (exclusive).
    #[must_use]
    pub fn bottom(&self) -> i64 { i64::from(self.y) + i64::from(self.height) }
}

/// One monitor and its optional overrides.
///
/// Unset fields fall back to the global settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct DisplayConfig {
    /// Device identifier, used in logs and status messages.
    pub id: String,
    /// Placement of the monitor in the virtual desktop.
    pub bounds: Bounds,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<RenderMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub globe: Option<GlobeConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flat_map: Option<FlatMapConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moon: Option<MoonConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_image: Option<StaticImageConfig>,
}

/// Root configuration structure for Terrapaper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct TerrapaperConfig {
    /// What to draw.
    pub mode: RenderMode,

    /// How output is spread across monitors.
    pub display_mode: DisplayMode,

    /// Placement style for `sameOnAll`.
    pub fit: FitStyle,

    /// Seconds between automatic updates. 0 disables the timer.
    pub update_interval: u64,

    /// Render width when no displays are configured.
    pub width: u32,

    /// Render height when no displays are configured.
    pub height: u32,

    pub globe: GlobeConfig,
    pub flat_map: FlatMapConfig,
    pub moon: MoonConfig,
    pub static_image: StaticImageConfig,

    /// Remote image catalogs.
    pub sources: Vec<SourceConfig>,

    pub rotation: RotationConfig,
    pub cache: CacheConfig,
    pub prefetch: PrefetchConfig,

    /// Monitors, used by `span` and `independent` display modes.
    pub displays: Vec<DisplayConfig>,

    /// Path to a `.env` file holding provider API keys.
    ///
    /// Relative paths are resolved against the config file's directory.
    pub api_keys: String,
}

impl Default for TerrapaperConfig {
    fn default() -> Self {
        Self {
            mode: RenderMode::default(),
            display_mode: DisplayMode::default(),
            fit: FitStyle::default(),
            update_interval: 600,
            width: 1920,
            height: 1080,
            globe: GlobeConfig::default(),
            flat_map: FlatMapConfig::default(),
            moon: MoonConfig::default(),
            static_image: StaticImageConfig::default(),
            sources: Vec::new(),
            rotation: RotationConfig::default(),
            cache: CacheConfig::default(),
            prefetch: PrefetchConfig::default(),
            displays: Vec::new(),
            api_keys: String::new(),
        }
    }
}

impl TerrapaperConfig {
    /// Size of the primary render target.
    ///
    /// The first configured display wins over `width`/`height`.
    #[must_use]
    pub fn primary_size(&self) -> (u32, u32) {
        self.displays
            .first()
            .filter(|d| d.bounds.width > 0 && d.bounds.height > 0)
            .map_or((self.width.max(1), self.height.max(1)), |d| {
                (d.bounds.width, d.bounds.height)
            })
    }

    /// Looks up a configured source by name.
    #[must_use]
    pub fn source(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|s| s.name == name)
    }

    /// Weight of `source` in the "all" rotation pool.
    #[must_use]
    pub fn rotation_weight(&self, source: &str) -> u32 {
        self.rotation
            .weights
            .get(source)
            .copied()
            .or_else(|| self.source(source).map(|s| s.weight))
            .unwrap_or(1)
    }
}

/// Errors that can occur when loading the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No configuration file was found in any of the expected locations.
    #[error(
        "No configuration file found. Expected at ~/.config/terrapaper/config.jsonc or ~/.terrapaper.jsonc"
    )]
    NotFound,
    /// The configuration file exists but could not be read.
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),
    /// The configuration file contains invalid JSON.
    #[error("Failed to parse configuration file: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// Configuration file names to search for (in priority order).
const CONFIG_FILE_NAMES: &[&str] = &["config.jsonc", "config.json"];

/// Legacy configuration file names in home directory.
const LEGACY_CONFIG_FILE_NAMES: &[&str] = &[".terrapaper.jsonc", ".terrapaper.json"];

/// Returns the possible configuration file paths in priority order.
///
/// 1. `$XDG_CONFIG_HOME/terrapaper/config.jsonc` or `config.json` (if set)
/// 2. `~/.config/terrapaper/config.jsonc` or `config.json`
/// 3. The platform config directory (e.g. `~/Library/Application Support/terrapaper/`)
/// 4. `~/.terrapaper.jsonc` or `~/.terrapaper.json`
#[must_use]
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    let mut push_dir = |dir: PathBuf| {
        for filename in CONFIG_FILE_NAMES {
            let path = dir.join(filename);
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
    };

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        push_dir(PathBuf::from(xdg_config).join(APP_ID));
    }

    if let Some(home) = dirs::home_dir() {
        push_dir(home.join(".config").join(APP_ID));
    }

    if let Some(config_dir) = dirs::config_dir() {
        push_dir(config_dir.join(APP_ID));
    }

    if let Some(home) = dirs::home_dir() {
        for filename in LEGACY_CONFIG_FILE_NAMES {
            paths.push(home.join(filename));
        }
    }

    paths
}

/// Loads the configuration from the first available config file.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if no configuration file exists in any of the expected locations.
/// Returns `ConfigError::IoError` or `ConfigError::ParseError` if the file found is unusable.
pub fn load_config() -> Result<(TerrapaperConfig, PathBuf), ConfigError> {
    for path in config_paths() {
        if path.exists() {
            return load_config_from_path(&path);
        }
    }

    Err(ConfigError::NotFound)
}

/// Loads the configuration from a specific file.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if the file does not exist, otherwise
/// I/O and parse errors.
pub fn load_config_from_path(path: &Path) -> Result<(TerrapaperConfig, PathBuf), ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound);
    }

    let file = fs::File::open(path)?;
    let reader = json_comments::StripComments::new(file);
    let config: TerrapaperConfig = serde_json::from_reader(reader)?;
    Ok((config, path.to_path_buf()))
}
