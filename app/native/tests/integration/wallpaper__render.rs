//! Integration tests for rendering and multi-display compositing.
//!
//! Covers:
//! - Procedural renders are identical within one minute
//! - Independent displays are composited into one spanned image
//! - Displays without an image are left black
//! - Span mode renders once at the size of the whole desktop

use std::fs;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use image::{Rgb, RgbImage};
use terrapaper_lib::config::{Bounds, DisplayConfig, DisplayMode, FitStyle, RenderMode};
use terrapaper_lib::constants::USER_SOURCE;
use terrapaper_lib::wallpaper::compositor::Canvas;
use terrapaper_lib::wallpaper::render::{PixelBuffer, Renderer};
use terrapaper_lib::wallpaper::{CycleOutcome, CycleRunner};

use crate::common::*;

/// 2024-03-20 12:00:00 UTC, on a minute boundary.
fn noon() -> SystemTime { UNIX_EPOCH + Duration::from_secs(1_710_936_000) }

fn display(id: &str, bounds: Bounds, mode: RenderMode) -> DisplayConfig {
    DisplayConfig {
        id: id.to_string(),
        bounds,
        mode: Some(mode),
        ..Default::default()
    }
}

fn import_solid(ws: &Workspace, id: &str, rgb: [u8; 3]) {
    let path = ws.store.entry_path(USER_SOURCE, id, "png");
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbImage::from_pixel(30, 30, Rgb(rgb)).save(&path).unwrap();
}

fn brightness(px: &Rgb<u8>) -> u32 { px.0.iter().map(|&c| u32::from(c)).sum::<u32>() / 3 }

// ============================================================================
// Renderers
// ============================================================================

#[test]
fn test_procedural_renders_are_stable_within_a_minute() {
    let ws = Workspace::new();
    for mode in [RenderMode::Globe, RenderMode::FlatMap, RenderMode::Moon] {
        let mut config = ws.config();
        config.mode = mode;
        let mut renderer = Renderer::for_config(&config);

        let first = renderer.render(64, 32, noon()).unwrap();
        let again = renderer.render(64, 32, noon() + Duration::from_secs(45)).unwrap();
        let fresh = Renderer::for_config(&config).render(64, 32, noon()).unwrap();

        assert_eq!(first, again, "{mode:?} changed within the minute");
        assert_eq!(first, fresh, "{mode:?} depends on renderer state");
    }
}

#[test]
fn test_render_rejects_empty_size() {
    let mut renderer = Renderer::for_config(&Workspace::new().config());
    assert!(renderer.render(0, 32, noon()).is_err());
}

#[test]
fn test_static_renderer_without_image_fails() {
    let ws = Workspace::new();
    let mut config = ws.config();
    config.mode = RenderMode::StaticImage;

    let mut renderer = Renderer::for_config(&config);
    renderer.set_image(None);

    assert!(renderer.render(64, 32, noon()).is_err());
}

// ============================================================================
// Canvas
// ============================================================================

#[test]
fn test_blit_clips_to_canvas() {
    let mut canvas = Canvas::new(4, 4);
    let white = PixelBuffer::from_fn(3, 3, |_, _| [255.0, 255.0, 255.0]);

    canvas.blit_bottom_up(&white, -1, 2);

    assert_eq!(canvas.pixel(0, 2), [255, 255, 255, 255]);
    assert_eq!(canvas.pixel(1, 3), [255, 255, 255, 255]);
    assert_eq!(canvas.pixel(2, 2), [0, 0, 0, 255]);
    assert_eq!(canvas.pixel(0, 1), [0, 0, 0, 255]);
}

// ============================================================================
// Display modes
// ============================================================================

#[test]
fn test_independent_displays_are_composited() {
    let ws = Workspace::new();
    import_solid(&ws, "white", [255, 255, 255]);

    let mut config = ws.config();
    config.display_mode = DisplayMode::Independent;
    config.displays = vec![
        display("left", Bounds::new(0, 0, 40, 20), RenderMode::Moon),
        display("right", Bounds::new(40, 10, 30, 30), RenderMode::StaticImage),
    ];

    let installer = Arc::new(RecordingInstaller::default());
    let mut cycle = ws.cycle(Arc::clone(&installer));
    let report = cycle.run_cycle(&config, &AtomicBool::new(false)).unwrap();

    assert_eq!(report.outcome, CycleOutcome::Updated);
    let (path, fit) = installer.last().unwrap();
    assert_eq!(fit, FitStyle::Span);

    let output = image::open(&path).unwrap().to_rgb8();
    assert_eq!(output.dimensions(), (70, 40));
    // Inside the right display
    assert!(brightness(output.get_pixel(55, 25)) > 200);
    // Outside both displays
    assert!(brightness(output.get_pixel(55, 2)) < 40);
    assert!(brightness(output.get_pixel(10, 35)) < 40);

    let state = cycle.state().snapshot();
    assert_eq!(state.current_image_style, Some(FitStyle::Span));
    assert_eq!(state.current_image.unwrap().id, "white");
}

#[test]
fn test_display_without_image_is_left_black() {
    let ws = Workspace::new();
    let mut config = ws.config();
    config.display_mode = DisplayMode::Independent;
    config.displays = vec![
        display("left", Bounds::new(0, 0, 32, 32), RenderMode::StaticImage),
        display("right", Bounds::new(32, 0, 32, 32), RenderMode::Globe),
    ];

    let installer = Arc::new(RecordingInstaller::default());
    let report = ws.cycle(Arc::clone(&installer)).run_cycle(&config, &AtomicBool::new(false)).unwrap();

    assert_eq!(report.outcome, CycleOutcome::Updated);
    let output = image::open(installer.last().unwrap().0).unwrap().to_rgb8();
    assert_eq!(output.dimensions(), (64, 32));
    assert!(brightness(output.get_pixel(16, 16)) < 40);
}

#[test]
fn test_no_renderable_display_skips_install() {
    let ws = Workspace::new();
    let mut config = ws.config();
    config.display_mode = DisplayMode::Independent;
    config.displays = vec![display("only", Bounds::new(0, 0, 32, 32), RenderMode::StaticImage)];

    let installer = Arc::new(RecordingInstaller::default());
    let report = ws.cycle(Arc::clone(&installer)).run_cycle(&config, &AtomicBool::new(false)).unwrap();

    assert_eq!(report.outcome, CycleOutcome::Skipped);
    assert_eq!(installer.count(), 0);
}

#[test]
fn test_span_mode_renders_desktop_size() {
    let ws = Workspace::new();
    let mut config = ws.config();
    config.mode = RenderMode::FlatMap;
    config.display_mode = DisplayMode::Span;
    config.displays = vec![
        display("a", Bounds::new(-20, 0, 20, 10), RenderMode::Globe),
        display("b", Bounds::new(0, 0, 30, 16), RenderMode::Globe),
    ];

    let installer = Arc::new(RecordingInstaller::default());
    ws.cycle(Arc::clone(&installer)).run_cycle(&config, &AtomicBool::new(false)).unwrap();

    let (path, fit) = installer.last().unwrap();
    assert_eq!(fit, FitStyle::Span);
    assert_eq!(image::image_dimensions(&path).unwrap(), (50, 16));
}

#[test]
fn test_same_on_all_uses_configured_fit() {
    let ws = Workspace::new();
    let mut config = ws.config();
    config.mode = RenderMode::Moon;
    config.fit = FitStyle::Center;

    let installer = Arc::new(RecordingInstaller::default());
    ws.cycle(Arc::clone(&installer)).run_cycle(&config, &AtomicBool::new(false)).unwrap();

    let (path, fit) = installer.last().unwrap();
    assert_eq!(fit, FitStyle::Center);
    assert_eq!(image::image_dimensions(&path).unwrap(), (64, 32));
}
