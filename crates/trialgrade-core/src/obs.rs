//! Structured observability hooks for scoring runs.
//!
//! This module provides:
//! - Report-scoped tracing spans via `ReportSpan` RAII guard
//! - Emission functions for ingestion, scoring and report events
//!
//! Verbosity follows `RUST_LOG`; see [`crate::telemetry::init_tracing`].

use tracing::{debug, info, warn};

/// RAII guard that enters a report-scoped tracing span.
///
/// # Example
///
/// ```ignore
/// let _span = ReportSpan::enter("runs/2026-10");
/// // every event below carries input = "runs/2026-10"
/// ```
pub struct ReportSpan {
    _span: tracing::span::EnteredSpan,
}

impl ReportSpan {
    /// Create and enter a span tagged with the input location.
    pub fn enter(input: &str) -> Self {
        let span = tracing::info_span!("trialgrade.report", input = %input);
        Self {
            _span: span.entered(),
        }
    }
}

/// Emit event: a simulation file was not ingested.
pub fn emit_file_skipped(path: &str, reason: &str) {
    warn!(event = "ingest.file_skipped", path = %path, reason = %reason);
}

/// Emit event: a trial references a task with no ground truth.
pub fn emit_ground_truth_missing(domain: &str, task_id: &str) {
    warn!(event = "ingest.ground_truth_missing", domain = %domain, task_id = %task_id);
}

/// Emit event: one trial scored.
pub fn emit_trial_scored(run_id: &str, passed: bool, failure: &str) {
    debug!(event = "trial.scored", run_id = %run_id, passed = passed, failure = %failure);
}

/// Emit event: a tool call's arguments could not be recovered.
pub fn emit_args_recovery_failed(run_id: &str, tool: &str, reason: &str) {
    warn!(
        event = "args.recovery_failed",
        run_id = %run_id,
        tool = %tool,
        reason = %reason,
    );
}

/// Emit event: an early termination recorded a non-zero reward.
pub fn emit_reward_inconsistent(run_id: &str, termination: &str, reward: f64) {
    warn!(
        event = "trial.reward_inconsistent",
        run_id = %run_id,
        termination = %termination,
        reward = reward,
    );
}

/// Emit event: report assembled.
pub fn emit_report_generated(models: usize, trials: usize, tasks: usize) {
    info!(
        event = "report.generated",
        models = models,
        trials = trials,
        tasks = tasks,
    );
}
