//! Render scheduler.
//!
//! One named worker thread owns the renderer and runs the tick loop. Each
//! tick checks for a stop request, the update gate, the timer and pending
//! triggers, then runs at most one cycle synchronously. Triggers are
//! edge-triggered flags, so several triggers before the next tick coalesce
//! into one cycle.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::cycle::{CycleError, CycleRunner};
use super::gate::UpdateGate;
use super::status::{CycleOutcome, StatusEvent, StatusSink};
use crate::config::{SettingsHandle, SettingsSubscription, TerrapaperConfig};
use crate::platform::thread::spawn_named_thread;

/// Longest the loop sleeps between checks.
pub const TICK: Duration = Duration::from_millis(200);

struct Shared {
    stop: AtomicBool,
    trigger: AtomicBool,
    gate: UpdateGate,
    cycles: AtomicU64,
    loops: AtomicU64,
    lock: Mutex<()>,
    wake: Condvar,
}

impl Shared {
    fn notify(&self) {
        let _guard = self.lock.lock();
        self.wake.notify_all();
    }

    /// Waits up to `timeout`, returning early for a stop or a pending trigger.
    fn sleep(&self, timeout: Duration) {
        let mut guard = self.lock.lock();
        if self.stop.load(Ordering::SeqCst) || self.trigger.load(Ordering::SeqCst) {
            return;
        }
        self.wake.wait_for(&mut guard, timeout);
    }

    /// Waits up to `timeout` while gated. A pending trigger cannot run yet,
    /// so only a stop skips the wait.
    fn park(&self, timeout: Duration) {
        let mut guard = self.lock.lock();
        if self.stop.load(Ordering::SeqCst) {
            return;
        }
        self.wake.wait_for(&mut guard, timeout);
    }
}

/// Handle to the running scheduler. Dropping it stops the worker.
pub struct Scheduler {
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    /// Starts the worker thread.
    ///
    /// With an open gate the first cycle runs right away; a gated scheduler
    /// waits for a settings change or [`Self::trigger_user_update`].
    pub fn start<R>(runner: R, settings: SettingsHandle, gate: UpdateGate, sink: Arc<dyn StatusSink>) -> Self
    where R: CycleRunner + 'static {
        let open = gate.is_open();
        let shared = Arc::new(Shared {
            stop: AtomicBool::new(false),
            trigger: AtomicBool::new(open),
            gate,
            cycles: AtomicU64::new(0),
            loops: AtomicU64::new(0),
            lock: Mutex::new(()),
            wake: Condvar::new(),
        });

        // Subscribed before the thread starts so no change is missed
        let worker = Worker {
            shared: Arc::clone(&shared),
            runner,
            subscription: settings.subscribe(),
            settings,
            sink,
        };
        let handle = spawn_named_thread("scheduler", move || worker.run());

        tracing::info!(gated = !open, "scheduler started");
        Self { shared, handle: Mutex::new(handle) }
    }

    /// Requests a cycle as soon as possible. Does not open the gate.
    pub fn trigger_update(&self) {
        self.shared.trigger.store(true, Ordering::SeqCst);
        self.shared.notify();
    }

    /// Requests a cycle on behalf of the user, opening the gate first.
    pub fn trigger_user_update(&self) {
        if self.shared.gate.release() {
            tracing::info!("update gate opened by user request");
        }
        self.trigger_update();
    }

    /// Stops the worker and waits for it. In-flight cycles do not install.
    pub fn stop(&self) {
        self.shared.stop.store(true, Ordering::SeqCst);
        self.shared.notify();

        if let Some(handle) = self.handle.lock().take()
            && handle.join().is_err()
        {
            tracing::error!("scheduler thread panicked");
        }
    }

    /// Blocks until the worker exits.
    pub fn join(&self) {
        if let Some(handle) = self.handle.lock().take()
            && handle.join().is_err()
        {
            tracing::error!("scheduler thread panicked");
        }
    }

    #[must_use]
    pub fn is_gated(&self) -> bool { !self.shared.gate.is_open() }

    /// Cycle attempts so far, including failed ones.
    #[must_use]
    pub fn completed_cycles(&self) -> u64 { self.shared.cycles.load(Ordering::SeqCst) }

    /// Waits until at least `count` cycles have been attempted.
    ///
    /// Returns `false` on timeout.
    pub fn wait_for_cycles(&self, count: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.shared.lock.lock();
        while self.completed_cycles() < count {
            if self.shared.wake.wait_until(&mut guard, deadline).timed_out() {
                return self.completed_cycles() >= count;
            }
        }
        true
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) { self.stop(); }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("gated", &self.is_gated())
            .field("cycles", &self.completed_cycles())
            .finish_non_exhaustive()
    }
}

struct Worker<R> {
    shared: Arc<Shared>,
    runner: R,
    settings: SettingsHandle,
    subscription: SettingsSubscription,
    sink: Arc<dyn StatusSink>,
}

impl<R: CycleRunner> Worker<R> {
    fn run(mut self) {
        let mut last_run: Option<Instant> = None;

        loop {
            if self.shared.stop.load(Ordering::SeqCst) {
                break;
            }
            self.shared.loops.fetch_add(1, Ordering::Relaxed);

            if self.subscription.take_changed() {
                if self.shared.gate.release() {
                    tracing::info!("update gate opened by settings change");
                }
                self.shared.trigger.store(true, Ordering::SeqCst);
            }

            if !self.shared.gate.is_open() {
                self.shared.park(TICK);
                continue;
            }

            let config = self.settings.snapshot();
            let interval = Duration::from_secs(config.update_interval);
            let timer_due = config.update_interval > 0 && last_run.is_none_or(|at| at.elapsed() >= interval);
            let triggered = self.shared.trigger.swap(false, Ordering::SeqCst);

            if !timer_due && !triggered {
                self.shared.sleep(TICK);
                continue;
            }

            last_run = Some(Instant::now());
            self.run_cycle(&config);
        }

        tracing::debug!("scheduler stopped");
    }

    fn run_cycle(&mut self, config: &Arc<TerrapaperConfig>) {
        let stop = &self.shared.stop;
        let runner = &mut self.runner;
        let result = panic::catch_unwind(AssertUnwindSafe(|| runner.run_cycle(config, stop)))
            .unwrap_or_else(|payload| Err(CycleError::Panicked(panic_message(payload.as_ref()))));

        let event = match result {
            Ok(report) => {
                tracing::debug!(source = %report.source, outcome = ?report.outcome, "cycle finished");
                StatusEvent::new(report.source, report.description, report.outcome)
            }
            Err(CycleError::Cancelled) => {
                StatusEvent::new(config.mode.display_name(), "Update cancelled", CycleOutcome::Skipped)
            }
            Err(err) => {
                tracing::error!(error = %err, mode = config.mode.display_name(), "render cycle failed");
                StatusEvent::new(config.mode.display_name(), err.to_string(), CycleOutcome::Failed)
            }
        };
        self.sink.publish(event);

        if !self.shared.stop.load(Ordering::SeqCst) {
            self.runner.after_cycle(config);
        }

        self.shared.cycles.fetch_add(1, Ordering::SeqCst);
        self.shared.notify();
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
