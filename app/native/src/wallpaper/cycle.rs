//! One render cycle.
//!
//! A cycle takes a settings snapshot, picks the rotation override, resolves
//! images for still-image displays, renders, encodes and installs a single
//! file. Independent multi-display setups are composited into one canvas
//! first and installed spanned.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;

use super::compositor::{Canvas, CompositeLayout, DisplayRegion, display_settings};
use super::favorites::Favorites;
use super::install::{InstallError, OutputWriter, WallpaperInstaller};
use super::prefetch::Prefetcher;
use super::render::{RenderError, Renderer};
use super::resolver::{ImageResolver, ResolveRequest, ResolvedImage};
use super::rotation::{RotationCursor, next_override};
use super::state::{ImageProvenance, SharedCycleState};
use super::status::CycleOutcome;
use crate::config::{DisplayMode, FitStyle, RenderMode, TerrapaperConfig};

/// Errors that end a cycle without installing anything.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Install(#[from] InstallError),
    #[error("No displays with a usable size")]
    NoDisplays,
    #[error("Cycle cancelled")]
    Cancelled,
    #[error("Render cycle panicked: {0}")]
    Panicked(String),
}

/// Result of a cycle that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub source: String,
    pub description: String,
    pub outcome: CycleOutcome,
    /// Installed file, if any.
    pub path: Option<PathBuf>,
}

impl CycleReport {
    fn skipped(source: &str, description: impl Into<String>) -> Self {
        Self {
            source: source.to_string(),
            description: description.into(),
            outcome: CycleOutcome::Skipped,
            path: None,
        }
    }
}

/// Work the scheduler runs once per due tick.
pub trait CycleRunner: Send {
    /// Runs one cycle against `config`.
    ///
    /// `stop` is checked between steps; once set, nothing more is installed.
    ///
    /// # Errors
    ///
    /// Returns an error if the cycle could not install a wallpaper.
    fn run_cycle(&mut self, config: &TerrapaperConfig, stop: &AtomicBool) -> Result<CycleReport, CycleError>;

    /// Called after every attempt, successful or not.
    fn after_cycle(&mut self, _config: &Arc<TerrapaperConfig>) {}
}

/// The production cycle.
pub struct RenderCycle {
    resolver: ImageResolver,
    favorites: Arc<Favorites>,
    installer: Arc<dyn WallpaperInstaller>,
    output: OutputWriter,
    state: SharedCycleState,
    rotation: RotationCursor,
    prefetcher: Option<Prefetcher>,
    renderer: Option<Renderer>,
}

impl RenderCycle {
    #[must_use]
    pub fn new(
        resolver: ImageResolver,
        favorites: Arc<Favorites>,
        installer: Arc<dyn WallpaperInstaller>,
        state: SharedCycleState,
    ) -> Self {
        let output = OutputWriter::new(resolver.store().output_dir());
        Self {
            resolver,
            favorites,
            installer,
            output,
            state,
            rotation: RotationCursor::new(),
            prefetcher: None,
            renderer: None,
        }
    }

    /// Runs a prefetch after every cycle.
    #[must_use]
    pub fn with_prefetcher(mut self, prefetcher: Prefetcher) -> Self {
        self.prefetcher = Some(prefetcher);
        self
    }

    /// Mode of the renderer kept between cycles.
    #[must_use]
    pub fn renderer_mode(&self) -> Option<RenderMode> { self.renderer.as_ref().map(Renderer::mode) }

    #[must_use]
    pub const fn state(&self) -> &SharedCycleState { &self.state }

    #[must_use]
    pub const fn rotation(&self) -> &RotationCursor { &self.rotation }

    /// Picks the rotation override once per cycle, only when an image is drawn.
    fn rotation_override(&self, config: &TerrapaperConfig) -> Option<PathBuf> {
        let draws_image = config.mode == RenderMode::StaticImage
            || (config.display_mode == DisplayMode::Independent
                && config.displays.iter().any(|d| d.mode == Some(RenderMode::StaticImage)));
        if !draws_image {
            return None;
        }
        next_override(&self.rotation, self.resolver.store(), &self.favorites, config)
    }

    fn resolve(&self, settings: &TerrapaperConfig, rotation: Option<&PathBuf>) -> Option<ResolvedImage> {
        let image = &settings.static_image;
        self.resolver.resolve(&ResolveRequest {
            source: &image.source,
            selection: image.selection(),
            selector: &image.selector,
            rotation_override: rotation.map(PathBuf::as_path),
        })
    }

    /// Keeps the renderer across cycles, replacing it only on a mode change.
    fn renderer_for(&mut self, config: &TerrapaperConfig) -> &mut Renderer {
        let renderer = match self.renderer.take() {
            Some(mut renderer) if renderer.mode() == config.mode => {
                renderer.configure(config);
                renderer
            }
            previous => {
                if let Some(previous) = previous {
                    tracing::debug!(
                        from = previous.mode().display_name(),
                        to = config.mode.display_name(),
                        "render mode changed"
                    );
                }
                Renderer::for_config(config)
            }
        };
        self.renderer.insert(renderer)
    }

    /// Renders once at `(width, height)` and installs with `fit`.
    fn run_single(
        &mut self,
        config: &TerrapaperConfig,
        size: (u32, u32),
        fit: FitStyle,
        rotation: Option<&PathBuf>,
        stop: &AtomicBool,
    ) -> Result<CycleReport, CycleError> {
        let image = if config.mode == RenderMode::StaticImage {
            match self.resolve(config, rotation) {
                Some(image) => Some(image),
                None => {
                    return Ok(CycleReport::skipped(&config.static_image.source, "No image available"));
                }
            }
        } else {
            None
        };

        let renderer = self.renderer_for(config);
        renderer.set_image(image.as_ref().map(|i| i.path.as_path()));
        let buffer = renderer.render(size.0, size.1, SystemTime::now())?;

        if stop.load(Ordering::SeqCst) {
            return Err(CycleError::Cancelled);
        }

        let path = self.output.write(&buffer.to_rgb_image())?;
        self.installer.install(&path, fit)?;

        let provenance = image.as_ref().map(ImageProvenance::from);
        self.state.record_install(config.mode, fit, provenance.clone());
        Ok(updated_report(config.mode, provenance.as_ref(), path))
    }

    /// Renders every display separately and installs the composite spanned.
    fn run_composite(
        &self,
        config: &TerrapaperConfig,
        rotation: Option<&PathBuf>,
        stop: &AtomicBool,
    ) -> Result<CycleReport, CycleError> {
        let regions: Vec<DisplayRegion> = config.displays.iter().map(DisplayRegion::from_config).collect();
        let layout = CompositeLayout::from_regions(&regions).ok_or(CycleError::NoDisplays)?;
        let mut canvas = Canvas::new(layout.width, layout.height);

        let mut rendered = 0;
        let mut first_image: Option<ImageProvenance> = None;

        for display in &config.displays {
            if stop.load(Ordering::SeqCst) {
                return Err(CycleError::Cancelled);
            }
            if display.bounds.width == 0 || display.bounds.height == 0 {
                continue;
            }

            let settings = display_settings(config, display);
            let image = if settings.mode == RenderMode::StaticImage {
                let Some(image) = self.resolve(&settings, rotation) else {
                    let display_id = display.id.as_str();
                    tracing::info!(display = display_id, "no image available for display, leaving it blank");
                    continue;
                };
                Some(image)
            } else {
                None
            };

            let mut renderer = Renderer::for_config(&settings);
            renderer.set_image(image.as_ref().map(|i| i.path.as_path()));
            let buffer = renderer.render(display.bounds.width, display.bounds.height, SystemTime::now())?;

            let (left, top) = layout.offset_of(&display.bounds);
            canvas.blit_bottom_up(&buffer, left, top);
            rendered += 1;

            if first_image.is_none() {
                first_image = image.as_ref().map(ImageProvenance::from);
            }
        }

        if rendered == 0 {
            return Ok(CycleReport::skipped(&config.static_image.source, "No display could be rendered"));
        }
        if stop.load(Ordering::SeqCst) {
            return Err(CycleError::Cancelled);
        }

        let path = self.output.write(&canvas.to_rgb_image())?;
        self.installer.install(&path, FitStyle::Span)?;

        self.state.record_install(config.mode, FitStyle::Span, first_image.clone());
        tracing::debug!(displays = rendered, width = layout.width, height = layout.height, "composite installed");
        Ok(updated_report(config.mode, first_image.as_ref(), path))
    }
}

impl CycleRunner for RenderCycle {
    fn run_cycle(&mut self, config: &TerrapaperConfig, stop: &AtomicBool) -> Result<CycleReport, CycleError> {
        let rotation = self.rotation_override(config);

        match config.display_mode {
            DisplayMode::Independent if !config.displays.is_empty() => {
                self.run_composite(config, rotation.as_ref(), stop)
            }
            DisplayMode::Span => {
                let regions: Vec<DisplayRegion> = config.displays.iter().map(DisplayRegion::from_config).collect();
                let size = CompositeLayout::from_regions(&regions)
                    .map_or_else(|| config.primary_size(), |layout| (layout.width, layout.height));
                self.run_single(config, size, FitStyle::Span, rotation.as_ref(), stop)
            }
            _ => self.run_single(config, config.primary_size(), config.fit, rotation.as_ref(), stop),
        }
    }

    fn after_cycle(&mut self, config: &Arc<TerrapaperConfig>) {
        if let Some(prefetcher) = &self.prefetcher {
            let _ = prefetcher.spawn(Arc::clone(config));
        }
    }
}

impl std::fmt::Debug for RenderCycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderCycle")
            .field("renderer", &self.renderer_mode())
            .field("rotation", &self.rotation.position())
            .finish_non_exhaustive()
    }
}

fn updated_report(mode: RenderMode, image: Option<&ImageProvenance>, path: PathBuf) -> CycleReport {
    let (source, description) = match image {
        Some(image) if !image.title.is_empty() => (image.source.clone(), format!("Showing {}", image.title)),
        Some(image) => (image.source.clone(), format!("Showing {}", image.id)),
        None => (mode.display_name().to_string(), "Wallpaper updated".to_string()),
    };
    CycleReport { source, description, outcome: CycleOutcome::Updated, path: Some(path) }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::config::{Bounds, DisplayConfig};
    use crate::constants::USER_SOURCE;
    use crate::wallpaper::download::Downloader;
    use crate::wallpaper::download::tests::StaticFetcher;
    use crate::wallpaper::install::tests::RecordingInstaller;
    use crate::wallpaper::provider::ProviderRegistry;
    use crate::wallpaper::resolver::tests::cache_png;
    use crate::wallpaper::store::CacheStore;

    struct Fixture {
        _temp: TempDir,
        store: CacheStore,
        installer: Arc<RecordingInstaller>,
        cycle: RenderCycle,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let store = CacheStore::new(temp.path().join("cache"), 0);
        let resolver = ImageResolver::new(
            store.clone(),
            Downloader::new(Arc::new(StaticFetcher::default()), 0),
            ProviderRegistry::default(),
        );
        let favorites = Arc::new(Favorites::load_from_dir(temp.path()));
        let installer = Arc::new(RecordingInstaller::default());
        let cycle = RenderCycle::new(resolver, favorites, Arc::clone(&installer) as Arc<dyn WallpaperInstaller>, SharedCycleState::default());
        Fixture { _temp: temp, store, installer, cycle }
    }

    fn small(mode: RenderMode) -> TerrapaperConfig {
        TerrapaperConfig { mode, width: 32, height: 18, ..Default::default() }
    }

    fn run(fixture: &mut Fixture, config: &TerrapaperConfig) -> Result<CycleReport, CycleError> {
        fixture.cycle.run_cycle(config, &AtomicBool::new(false))
    }

    // ========================================================================
    // Single display
    // ========================================================================

    #[test]
    fn test_procedural_cycle_installs_with_fit_style() {
        let mut fixture = fixture();
        let config = TerrapaperConfig { fit: FitStyle::Center, ..small(RenderMode::Globe) };

        let report = run(&mut fixture, &config).unwrap();
        assert_eq!(report.outcome, CycleOutcome::Updated);
        assert_eq!(report.source, "globe");

        let installs = fixture.installer.installs.lock();
        assert_eq!(installs.len(), 1);
        assert_eq!(installs[0].1, FitStyle::Center);
        assert_eq!(image::image_dimensions(&installs[0].0).unwrap(), (32, 18));
        assert!(installs[0].0.starts_with(fixture.store.output_dir()));
    }

    #[test]
    fn test_span_mode_renders_union_size() {
        let mut fixture = fixture();
        let mut config = small(RenderMode::Moon);
        config.display_mode = DisplayMode::Span;
        config.displays = vec![
            DisplayConfig { id: "a".to_string(), bounds: Bounds::new(0, 0, 16, 8), ..Default::default() },
            DisplayConfig { id: "b".to_string(), bounds: Bounds::new(16, 2, 8, 8), ..Default::default() },
        ];

        run(&mut fixture, &config).unwrap();
        let installs = fixture.installer.installs.lock();
        assert_eq!(installs[0].1, FitStyle::Span);
        assert_eq!(image::image_dimensions(&installs[0].0).unwrap(), (24, 10));
    }

    #[test]
    fn test_missing_image_skips_without_install() {
        let mut fixture = fixture();
        let report = run(&mut fixture, &small(RenderMode::StaticImage)).unwrap();

        assert_eq!(report.outcome, CycleOutcome::Skipped);
        assert!(fixture.installer.installs.lock().is_empty());
        assert!(fixture.cycle.state().snapshot().last_update.is_none());
    }

    #[test]
    fn test_static_image_records_provenance() {
        let mut fixture = fixture();
        cache_png(&fixture.store, USER_SOURCE, "holiday", 64, 36);

        let report = run(&mut fixture, &small(RenderMode::StaticImage)).unwrap();
        assert_eq!(report.source, USER_SOURCE);

        let favorite = fixture.cycle.state().current_favorite().unwrap();
        assert_eq!(favorite.image_id, "holiday");
    }

    #[test]
    fn test_stop_prevents_install() {
        let mut fixture = fixture();
        let result = fixture.cycle.run_cycle(&small(RenderMode::Globe), &AtomicBool::new(true));

        assert!(matches!(result, Err(CycleError::Cancelled)));
        assert!(fixture.installer.installs.lock().is_empty());
    }

    #[test]
    fn test_renderer_is_kept_until_mode_changes() {
        let mut fixture = fixture();
        run(&mut fixture, &small(RenderMode::Globe)).unwrap();
        assert_eq!(fixture.cycle.renderer_mode(), Some(RenderMode::Globe));

        run(&mut fixture, &small(RenderMode::Moon)).unwrap();
        assert_eq!(fixture.cycle.renderer_mode(), Some(RenderMode::Moon));
    }

    #[test]
    fn test_rotation_advances_once_per_cycle() {
        let mut fixture = fixture();
        cache_png(&fixture.store, USER_SOURCE, "a", 64, 36);
        let b = cache_png(&fixture.store, USER_SOURCE, "b", 64, 36);
        let later = fs::metadata(&b).unwrap().modified().unwrap() + std::time::Duration::from_secs(5);
        fs::File::options().write(true).open(&b).unwrap().set_modified(later).unwrap();

        let mut config = small(RenderMode::StaticImage);
        config.rotation.enabled = true;
        config.rotation.source = USER_SOURCE.to_string();

        let ids: Vec<String> = (0..3)
            .map(|_| {
                run(&mut fixture, &config).unwrap();
                fixture.cycle.state().current_favorite().unwrap().image_id
            })
            .collect();
        assert_eq!(ids, vec!["a", "b", "a"]);
        assert_eq!(fixture.cycle.rotation().position(), 3);
    }

    #[test]
    fn test_procedural_mode_does_not_rotate() {
        let mut fixture = fixture();
        cache_png(&fixture.store, USER_SOURCE, "a", 64, 36);
        let mut config = small(RenderMode::Globe);
        config.rotation.enabled = true;

        run(&mut fixture, &config).unwrap();
        assert_eq!(fixture.cycle.rotation().position(), 0);
    }

    // ========================================================================
    // Independent displays
    // ========================================================================

    #[test]
    fn test_independent_displays_are_composited_and_spanned() {
        let mut fixture = fixture();
        let mut config = small(RenderMode::Globe);
        config.display_mode = DisplayMode::Independent;
        config.displays = vec![
            DisplayConfig { id: "main".to_string(), bounds: Bounds::new(0, 0, 20, 10), ..Default::default() },
            DisplayConfig {
                id: "side".to_string(),
                bounds: Bounds::new(20, 4, 10, 10),
                mode: Some(RenderMode::Moon),
                ..Default::default()
            },
        ];

        let report = run(&mut fixture, &config).unwrap();
        assert_eq!(report.outcome, CycleOutcome::Updated);

        let installs = fixture.installer.installs.lock();
        assert_eq!(installs[0].1, FitStyle::Span);
        assert_eq!(image::image_dimensions(&installs[0].0).unwrap(), (30, 14));
    }

    #[test]
    fn test_independent_without_images_is_skipped() {
        let mut fixture = fixture();
        let mut config = small(RenderMode::StaticImage);
        config.display_mode = DisplayMode::Independent;
        config.displays =
            vec![DisplayConfig { id: "main".to_string(), bounds: Bounds::new(0, 0, 20, 10), ..Default::default() }];

        let report = run(&mut fixture, &config).unwrap();
        assert_eq!(report.outcome, CycleOutcome::Skipped);
        assert!(fixture.installer.installs.lock().is_empty());
    }
}
