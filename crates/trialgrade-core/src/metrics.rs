//! Global atomic counters for scoring runs.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. after a report is written).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

/// Lightweight atomic counters. Safe to bump from rayon workers.
pub struct Metrics {
    trials_scored: AtomicU64,
    arg_errors: AtomicU64,
    tasks_aggregated: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            trials_scored: AtomicU64::new(0),
            arg_errors: AtomicU64::new(0),
            tasks_aggregated: AtomicU64::new(0),
        }
    }

    pub fn inc_trials_scored(&self) {
        self.trials_scored.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "trials_scored", "counter incremented");
    }

    /// Add the argument errors found in one trial.
    pub fn add_arg_errors(&self, n: u64) {
        if n == 0 {
            return;
        }
        self.arg_errors.fetch_add(n, Ordering::Relaxed);
        tracing::trace!(metric = "arg_errors", by = n, "counter incremented");
    }

    pub fn inc_tasks_aggregated(&self) {
        self.tasks_aggregated.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "tasks_aggregated", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            trials_scored = self.trials_scored(),
            arg_errors = self.arg_errors(),
            tasks_aggregated = self.tasks_aggregated(),
        );
    }

    pub fn trials_scored(&self) -> u64 {
        self.trials_scored.load(Ordering::Relaxed)
    }

    pub fn arg_errors(&self) -> u64 {
        self.arg_errors.load(Ordering::Relaxed)
    }

    pub fn tasks_aggregated(&self) -> u64 {
        self.tasks_aggregated.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.trials_scored.store(0, Ordering::Relaxed);
        self.arg_errors.store(0, Ordering::Relaxed);
        self.tasks_aggregated.store(0, Ordering::Relaxed);
    }
}
