//! Cancellation and soft-deadline primitives.
//!
//! Cancellation is checked at stage boundaries only; a cancelled run leaves
//! the staging store in a consistent pre- or post-stage state because every
//! stage writes under one transaction.  Deadlines are soft: a stage that
//! notices expiry commits the progress it has and reports `partial`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

// ── CancelToken ───────────────────────────────────────────────────────────────

/// Shared cancellation flag.  Clone freely; all clones observe the same
/// state.  `cancel()` may be called from any thread.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ── StageDeadline ─────────────────────────────────────────────────────────────

/// Soft per-stage deadline, started when the stage begins.
#[derive(Clone, Debug)]
pub struct StageDeadline {
    started: Instant,
    budget:  Duration,
}

impl StageDeadline {
    pub fn start(budget: Duration) -> Self {
        Self { started: Instant::now(), budget }
    }

    /// `true` once the budget is spent.  Cheap enough to call inside
    /// worklist loops.
    #[inline]
    pub fn expired(&self) -> bool {
        self.started.elapsed() >= self.budget
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}
