//! Observability tests for scoring runs.
//!
//! These tests verify that structured tracing events are emitted for
//! ingestion skips, argument-recovery failures, trial scoring and report
//! assembly.

use serde_json::json;
use tracing_test::traced_test;
use trialgrade_core::metrics::Metrics;
use trialgrade_core::obs::{
    emit_args_recovery_failed, emit_file_skipped, emit_report_generated, emit_trial_scored,
    ReportSpan,
};
use trialgrade_core::{
    score_trial, GroundTruth, Message, NormalizeOptions, TerminationReason, ToolCallRequest,
    TrialKey, TrialRecord,
};

#[traced_test]
#[test]
fn file_skipped_is_a_warning_with_path() {
    emit_file_skipped("runs/broken.json", "invalid JSON");
    assert!(logs_contain("ingest.file_skipped"));
    assert!(logs_contain("runs/broken.json"));
}

#[traced_test]
#[test]
fn args_recovery_failure_names_tool() {
    emit_args_recovery_failed("m_retail_T1_trial0", "cancel_order", "arguments empty");
    assert!(logs_contain("args.recovery_failed"));
    assert!(logs_contain("cancel_order"));
}

#[traced_test]
#[test]
fn report_generated_logs_counts() {
    emit_report_generated(2, 40, 10);
    assert!(logs_contain("report.generated"));
}

#[traced_test]
#[test]
fn report_span_tags_events() {
    let span = ReportSpan::enter("fixtures/run-a");
    emit_trial_scored("m_retail_T1_trial0", false, "Unknown");
    drop(span);
    assert!(logs_contain("trialgrade.report"));
}

#[traced_test]
#[test]
fn scoring_a_broken_call_emits_recovery_and_inconsistency_events() {
    let trial = TrialRecord::new(TrialKey::new("m", "retail", "1", 0))
        .with_reward(1.0)
        .with_termination(TerminationReason::MaxSteps)
        .with_message(Message::assistant_calls(vec![ToolCallRequest::new(
            "c1",
            "find_user",
            json!("{broken"),
        )]));

    let scored = score_trial(&trial, &GroundTruth::new("1"), NormalizeOptions::default());
    assert!(!scored.verdict.passed);
    assert!(logs_contain("args.recovery_failed"));
    assert!(logs_contain("find_user"));
    assert!(logs_contain("trial.reward_inconsistent"));
}

#[traced_test]
#[test]
fn metrics_flush_emits_counters() {
    let m = Metrics::new();
    m.inc_trials_scored();
    m.add_arg_errors(2);
    m.flush();
    assert!(logs_contain("trials_scored=1"));
    assert!(logs_contain("arg_errors=2"));
}
