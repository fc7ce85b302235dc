//! Periodic, single-flight poll scheduler
//!
//! Each Running period is one tokio task ticking on `interval_at`. A cycle
//! always runs to completion before the next tick is awaited, and the
//! detector sits behind an async mutex so that a cycle left over from a
//! previous Running period finishes before a new one starts.
//!
//! `start`, `stop` and `configure` are synchronous and may be called from
//! any thread; they signal the task through `watch` channels.

use crate::detector::{ChangeDetector, CycleOutcome, CycleReport};
use parking_lot::{Mutex, RwLock};
use poll_core::{normalize_interval, Clock, Watermark};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunState {
    #[default]
    Stopped,
    Running,
}

/// Handle to the task of the current Running period
struct ActiveTask {
    stop_tx: watch::Sender<bool>,
    _task: JoinHandle<()>,
}

pub struct PollingScheduler {
    runtime: Handle,
    detector: Arc<AsyncMutex<ChangeDetector>>,
    watermark: Arc<RwLock<Watermark>>,
    clock: Arc<dyn Clock>,
    state: Arc<RwLock<RunState>>,
    interval_tx: watch::Sender<Duration>,
    active: Mutex<Option<ActiveTask>>,
}

impl PollingScheduler {
    /// Create a stopped scheduler spawning its task on `runtime`
    pub fn new(detector: ChangeDetector, runtime: Handle) -> Self {
        let watermark = detector.watermark_handle();
        let clock = detector.clock();
        let (interval_tx, _) = watch::channel(normalize_interval(0));

        Self {
            runtime,
            detector: Arc::new(AsyncMutex::new(detector)),
            watermark,
            clock,
            state: Arc::new(RwLock::new(RunState::Stopped)),
            interval_tx,
            active: Mutex::new(None),
        }
    }

    /// Set the cycle period in seconds (non-positive means the default)
    ///
    /// A running timer keeps its current wait; the new period applies from
    /// the next tick on.
    pub fn configure(&self, interval_secs: i64) {
        let period = normalize_interval(interval_secs);
        let previous = self.interval_tx.send_replace(period);
        if previous != period {
            debug!("Polling interval set to {:?}", period);
        }
    }

    pub fn interval(&self) -> Duration {
        *self.interval_tx.borrow()
    }

    pub fn state(&self) -> RunState {
        *self.state.read()
    }

    pub fn is_running(&self) -> bool {
        self.state() == RunState::Running
    }

    /// Stopped -> Running; no-op if already running
    pub fn start(&self) {
        let mut active = self.active.lock();
        {
            let mut state = self.state.write();
            if *state == RunState::Running {
                return;
            }
            *state = RunState::Running;
        }

        {
            let mut watermark = self.watermark.write();
            if watermark.initialize(self.clock.now()) {
                info!("Watermark initialized to {}", *watermark);
            }
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let task = self.runtime.spawn(run_loop(
            self.detector.clone(),
            self.state.clone(),
            self.interval_tx.subscribe(),
            stop_rx,
        ));

        *active = Some(ActiveTask {
            stop_tx,
            _task: task,
        });
    }

    /// Running -> Stopped; no-op if already stopped
    ///
    /// Pending ticks are cancelled; a cycle in progress runs to completion.
    pub fn stop(&self) {
        let mut active = self.active.lock();
        {
            let mut state = self.state.write();
            if *state == RunState::Stopped {
                return;
            }
            *state = RunState::Stopped;
        }

        if let Some(task) = active.take() {
            let _ = task.stop_tx.send(true);
        }
        info!("Polling stopped");
    }

    /// Run one cycle now, serialized with scheduled cycles
    pub async fn run_once(&self) -> CycleReport {
        let mut detector = self.detector.lock().await;
        let state = self.state();
        let report = detector.run_cycle(state).await;
        log_report(&report);
        report
    }

    /// Wait until no cycle is in flight
    pub async fn wait_idle(&self) {
        drop(self.detector.lock().await);
    }

    /// Number of distinct items surfaced so far
    pub async fn seen_count(&self) -> usize {
        self.detector.lock().await.seen().len()
    }
}

impl Drop for PollingScheduler {
    fn drop(&mut self) {
        if let Some(task) = self.active.get_mut().take() {
            let _ = task.stop_tx.send(true);
        }
    }
}

fn ticker(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn run_loop(
    detector: Arc<AsyncMutex<ChangeDetector>>,
    state: Arc<RwLock<RunState>>,
    mut interval_rx: watch::Receiver<Duration>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut period = *interval_rx.borrow_and_update();
    let mut timer = ticker(period);

    info!("Starting polling (interval: {:?})", period);

    loop {
        tokio::select! {
            biased;
            _ = stop_rx.changed() => break,
            _ = timer.tick() => {}
        }
        if *stop_rx.borrow() {
            break;
        }

        // Stop flag and state are checked under the detector lock
        let mut guard = detector.lock().await;
        if *stop_rx.borrow() {
            break;
        }
        let current = *state.read();
        let report = guard.run_cycle(current).await;
        drop(guard);
        log_report(&report);

        if interval_rx.has_changed().unwrap_or(false) {
            let next = *interval_rx.borrow_and_update();
            if next != period {
                period = next;
                timer = ticker(period);
                info!("Polling interval changed to {:?}", period);
            }
        }
    }

    debug!("Polling task exited");
}

fn log_report(report: &CycleReport) {
    match &report.outcome {
        CycleOutcome::Skipped(reason) => debug!("Cycle skipped ({:?})", reason),
        CycleOutcome::Completed { fetched, fresh, delivery } => {
            if *fresh > 0 {
                info!(
                    "Cycle delivered {} new of {} fetched items to {} listeners ({} failed); watermark {}",
                    fresh, fetched, delivery.delivered, delivery.failed, report.watermark
                );
            } else {
                debug!("Cycle found nothing new ({} fetched); watermark {}", fetched, report.watermark);
            }
        }
        CycleOutcome::Failed(e) => {
            warn!("Cycle failed: {}; watermark advanced to {}", e, report.watermark)
        }
    }
}
