//! Cycle status events.
//!
//! Every cycle attempt ends with one short `(source, description)` event.
//! Formatting for a tray or tooltip is left to whoever consumes the sink.

use std::sync::mpsc::Sender;
use std::time::SystemTime;

use parking_lot::Mutex;
use serde::Serialize;

/// How a cycle attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CycleOutcome {
    Updated,
    /// Nothing to install, the previous wallpaper stays.
    Skipped,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusEvent {
    pub source: String,
    pub description: String,
    pub outcome: CycleOutcome,
    #[serde(skip)]
    pub timestamp: SystemTime,
}

impl StatusEvent {
    #[must_use]
    pub fn new(source: impl Into<String>, description: impl Into<String>, outcome: CycleOutcome) -> Self {
        Self {
            source: source.into(),
            description: description.into(),
            outcome,
            timestamp: SystemTime::now(),
        }
    }
}

/// Receives status events from the scheduler.
pub trait StatusSink: Send + Sync {
    fn publish(&self, event: StatusEvent);
}

/// Writes events to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogStatusSink;

impl StatusSink for LogStatusSink {
    fn publish(&self, event: StatusEvent) {
        match event.outcome {
            CycleOutcome::Updated => {
                tracing::info!(source = %event.source, "{}", event.description);
            }
            CycleOutcome::Skipped => {
                tracing::info!(source = %event.source, skipped = true, "{}", event.description);
            }
            CycleOutcome::Failed => {
                tracing::warn!(source = %event.source, "{}", event.description);
            }
        }
    }
}

/// Forwards events over a channel.
#[derive(Debug)]
pub struct ChannelStatusSink {
    sender: Mutex<Sender<StatusEvent>>,
}

impl ChannelStatusSink {
    #[must_use]
    pub const fn new(sender: Sender<StatusEvent>) -> Self { Self { sender: Mutex::new(sender) } }
}

impl StatusSink for ChannelStatusSink {
    fn publish(&self, event: StatusEvent) {
        // A dropped receiver just means nobody is listening anymore
        let _ = self.sender.lock().send(event);
    }
}
