// =============================================================================
// Polling Scheduler - fetch → analyze → publish, then sleep
// =============================================================================
//
// A single background Tokio task drives the pipeline:
//
//   Idle → Fetching → Analyzing → Publishing → Sleeping → Fetching …
//
// A failed cycle (fetch error or a panic anywhere in the cycle) publishes a
// degraded snapshot: the previous snapshot carried forward with the error
// appended to its rolling error list. Only `stop` ends the loop. The stop
// signal is checked at the top of every iteration and raced against the
// sleep, so shutdown never waits out a full interval.
//
// Usage:
//
//   let scheduler = Scheduler::new(state.clone(), Arc::new(client));
//   scheduler.start(Duration::from_secs(60));
//   …
//   scheduler.stop(Duration::from_secs(5)).await;
//
// =============================================================================

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

use crate::analyzer::analyze;
use crate::app_state::SharedState;
use crate::nse::{DataSource, FetchError};
use crate::snapshot::AnalyzerSnapshot;
use crate::types::SchedulerPhase;

/// Why a cycle produced no fresh snapshot.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("analysis cycle panicked: {0}")]
    Panicked(String),

    #[error("analysis cycle was cancelled")]
    Cancelled,
}

impl From<JoinError> for CycleError {
    fn from(err: JoinError) -> Self {
        if !err.is_panic() {
            return Self::Cancelled;
        }
        let payload = err.into_panic();
        let msg = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        Self::Panicked(msg)
    }
}

// =============================================================================
// Phase tracking
// =============================================================================

/// Cheaply clonable view of the scheduler's current phase.
#[derive(Clone, Default)]
pub struct PhaseHandle(Arc<AtomicU8>);

impl PhaseHandle {
    pub fn get(&self) -> SchedulerPhase {
        SchedulerPhase::from_u8(self.0.load(Ordering::SeqCst))
    }

    fn set(&self, phase: SchedulerPhase) {
        self.0.store(phase.as_u8(), Ordering::SeqCst);
    }
}

// =============================================================================
// Cycle
// =============================================================================

/// Fetch one payload and analyze it.
pub async fn run_cycle(
    source: &dyn DataSource,
    phase: &PhaseHandle,
) -> Result<AnalyzerSnapshot, CycleError> {
    phase.set(SchedulerPhase::Fetching);
    let payload = source.fetch().await?;

    phase.set(SchedulerPhase::Analyzing);
    Ok(analyze(&payload))
}

/// Run one cycle on its own task so a panic surfaces as a `CycleError`,
/// then publish either the fresh or the degraded snapshot.
pub async fn poll_once(
    state: &SharedState,
    source: Arc<dyn DataSource>,
    phase: &PhaseHandle,
) -> Result<(), CycleError> {
    let cycle_phase = phase.clone();
    let outcome = tokio::spawn(async move { run_cycle(source.as_ref(), &cycle_phase).await })
        .await
        .unwrap_or_else(|join_err| Err(CycleError::from(join_err)));

    let (snapshot, result) = match outcome {
        Ok(snapshot) => {
            if snapshot.has_data() {
                info!(
                    bias = %snapshot.market_bias,
                    strikes = snapshot.strikes.len(),
                    resistance = ?snapshot.top_resistance,
                    support = ?snapshot.top_support,
                    "option chain analyzed"
                );
            } else {
                warn!(errors = ?snapshot.errors, "option chain returned no strikes");
            }
            (snapshot, Ok(()))
        }
        Err(e) => {
            match &e {
                CycleError::Fetch(fetch) => warn!(
                    stage = %fetch.stage(),
                    error = %e,
                    "fetch failed - carrying previous snapshot forward"
                ),
                _ => warn!(error = %e, "analysis cycle failed - carrying previous snapshot forward"),
            }
            (state.get().degrade(&e), Err(e))
        }
    };

    phase.set(SchedulerPhase::Publishing);
    state.update(snapshot);
    result
}

async fn run_loop(
    state: Arc<SharedState>,
    source: Arc<dyn DataSource>,
    phase: PhaseHandle,
    mut stop_rx: watch::Receiver<bool>,
    interval: Duration,
) {
    info!(interval_secs = interval.as_secs_f64(), "scheduler started");

    loop {
        if *stop_rx.borrow() {
            break;
        }

        // Failures are already published as degraded snapshots.
        let _ = poll_once(&state, source.clone(), &phase).await;

        phase.set(SchedulerPhase::Sleeping);
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = stop_rx.changed() => {
                if changed.is_err() {
                    debug!("stop channel closed");
                    break;
                }
            }
        }
    }

    phase.set(SchedulerPhase::Stopped);
    info!("scheduler loop exited");
}

// =============================================================================
// Scheduler
// =============================================================================

/// Owns the background polling task.
pub struct Scheduler {
    state: Arc<SharedState>,
    source: Arc<dyn DataSource>,
    phase: PhaseHandle,
    stop_tx: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(state: Arc<SharedState>, source: Arc<dyn DataSource>) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            state,
            source,
            phase: PhaseHandle::default(),
            stop_tx,
            handle: Mutex::new(None),
        }
    }

    pub fn phase(&self) -> SchedulerPhase {
        self.phase.get()
    }

    pub fn phase_handle(&self) -> PhaseHandle {
        self.phase.clone()
    }

    /// Spawn the polling loop. No-op if it is already running or the
    /// scheduler has been stopped. Must be called from within a Tokio
    /// runtime.
    pub fn start(&self, interval: Duration) {
        let mut handle = self.handle.lock();

        if *self.stop_tx.borrow() {
            warn!("scheduler already stopped - start ignored");
            return;
        }
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            debug!("scheduler already running - start ignored");
            return;
        }

        let task = tokio::spawn(run_loop(
            self.state.clone(),
            self.source.clone(),
            self.phase.clone(),
            self.stop_tx.subscribe(),
            interval,
        ));
        *handle = Some(task);
    }

    /// Signal the loop to exit and wait up to `timeout` for it. Returns after
    /// the timeout even if the task is still busy; the task is left to finish
    /// on its own.
    pub async fn stop(&self, timeout: Duration) {
        self.stop_tx.send_replace(true);

        let Some(task) = self.handle.lock().take() else {
            self.phase.set(SchedulerPhase::Stopped);
            return;
        };

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(())) => info!("scheduler stopped"),
            Ok(Err(e)) => error!(error = %e, "scheduler task ended abnormally"),
            Err(_) => warn!(
                timeout_ms = timeout.as_millis() as u64,
                "scheduler did not stop in time - detaching"
            ),
        }
    }
}
