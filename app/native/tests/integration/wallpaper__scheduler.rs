//! Integration tests for the scheduler and the update gate.
//!
//! Covers:
//! - First launch renders right away, later launches wait
//! - A settings change or a user request opens the gate
//! - Every attempt publishes exactly one status event

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use terrapaper_lib::config::{RenderMode, SettingsHandle};
use terrapaper_lib::wallpaper::gate::marker_path;
use terrapaper_lib::wallpaper::{CycleOutcome, Scheduler, StatusEvent, UpdateGate};

use crate::common::*;

const WAIT: Duration = Duration::from_secs(20);
const SHORT: Duration = Duration::from_millis(600);

fn start(ws: &Workspace, gate: UpdateGate) -> (Scheduler, SettingsHandle, Arc<RecordingInstaller>, Receiver<StatusEvent>) {
    let installer = Arc::new(RecordingInstaller::default());
    let settings = SettingsHandle::new(ws.config());
    let (sink, events) = ChannelSink::new();
    let scheduler = Scheduler::start(ws.cycle(Arc::clone(&installer)), settings.clone(), gate, sink);
    (scheduler, settings, installer, events)
}

#[test]
fn test_first_launch_opens_gate_and_writes_marker() {
    let ws = Workspace::new();
    let state_dir = ws.config_dir();

    let first = UpdateGate::on_launch(&state_dir);
    assert!(first.is_open());
    assert!(marker_path(&state_dir).exists());

    let second = UpdateGate::on_launch(&state_dir);
    assert!(!second.is_open());
}

#[test]
fn test_open_gate_renders_immediately() {
    let ws = Workspace::new();
    let (scheduler, _settings, installer, events) = start(&ws, UpdateGate::open());

    assert!(scheduler.wait_for_cycles(1, WAIT));
    scheduler.stop();

    assert_eq!(installer.count(), 1);
    let event = events.recv_timeout(WAIT).unwrap();
    assert_eq!(event.outcome, CycleOutcome::Updated);
}

#[test]
fn test_gated_scheduler_waits_for_settings_change() {
    let ws = Workspace::new();
    let (scheduler, settings, installer, _events) = start(&ws, UpdateGate::gated());

    assert!(!scheduler.wait_for_cycles(1, SHORT));
    assert!(scheduler.is_gated());
    assert_eq!(installer.count(), 0);

    settings.update(|config| config.mode = RenderMode::Moon);

    assert!(scheduler.wait_for_cycles(1, WAIT));
    assert!(!scheduler.is_gated());
    scheduler.stop();
    assert_eq!(installer.count(), 1);
}

#[test]
fn test_gated_scheduler_ignores_plain_trigger() {
    let ws = Workspace::new();
    let (scheduler, _settings, installer, _events) = start(&ws, UpdateGate::gated());

    scheduler.trigger_update();
    assert!(!scheduler.wait_for_cycles(1, SHORT));

    scheduler.trigger_user_update();
    assert!(scheduler.wait_for_cycles(1, WAIT));
    scheduler.stop();

    assert!(!scheduler.is_gated());
    assert_eq!(installer.count(), 1);
}

#[test]
fn test_each_attempt_publishes_one_event() {
    let ws = Workspace::new();
    let (scheduler, _settings, _installer, events) = start(&ws, UpdateGate::open());
    assert!(scheduler.wait_for_cycles(1, WAIT));

    scheduler.trigger_update();
    assert!(scheduler.wait_for_cycles(2, WAIT));
    scheduler.stop();

    let received: Vec<_> = events.try_iter().collect();
    assert_eq!(received.len() as u64, scheduler.completed_cycles());
    assert!(received.iter().all(|e| e.outcome == CycleOutcome::Updated));
}

#[test]
fn test_image_mode_without_images_is_skipped() {
    let ws = Workspace::new();
    let (scheduler, settings, installer, events) = start(&ws, UpdateGate::gated());

    settings.update(|config| config.mode = RenderMode::StaticImage);
    assert!(scheduler.wait_for_cycles(1, WAIT));
    scheduler.stop();

    assert_eq!(installer.count(), 0);
    assert_eq!(events.recv_timeout(WAIT).unwrap().outcome, CycleOutcome::Skipped);
}
