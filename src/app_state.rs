// =============================================================================
// Shared Application State - latest published snapshot
// =============================================================================
//
// One writer (the scheduler) and any number of readers (the read API). The
// snapshot is held behind an `Arc` so that publishing is a pointer swap and a
// read is a pointer clone; the lock is never held across I/O or analysis.
//
// Thread safety:
//   - parking_lot::RwLock guards the current snapshot.
//   - Atomic counter for lock-free version tracking.
// =============================================================================

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::snapshot::AnalyzerSnapshot;

/// Latest analyzer snapshot, shared between the scheduler and readers via
/// `Arc<SharedState>`.
pub struct SharedState {
    snapshot: RwLock<Arc<AnalyzerSnapshot>>,

    /// Incremented on every publish. Starts at 0 for the empty initial value.
    state_version: AtomicU64,

    /// Instant the state was created. Used for uptime reporting.
    pub start_time: std::time::Instant,
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(AnalyzerSnapshot::default())),
            state_version: AtomicU64::new(0),
            start_time: std::time::Instant::now(),
        }
    }

    /// Replace the current snapshot wholesale.
    pub fn update(&self, snapshot: AnalyzerSnapshot) {
        let next = Arc::new(snapshot);
        *self.snapshot.write() = next;
        self.state_version.fetch_add(1, Ordering::SeqCst);
    }

    /// Handle to the current snapshot. Later updates never alter it.
    pub fn get(&self) -> Arc<AnalyzerSnapshot> {
        self.snapshot.read().clone()
    }

    /// Number of snapshots published so far.
    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}
