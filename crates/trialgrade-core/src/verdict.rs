//! Trial verdict engine.
//!
//! Produces a [`Verdict`] from a [`TrialRecord`], its task's [`GroundTruth`]
//! and the [`NormalizedView`] of its transcript. Reward decides pass/fail;
//! every other field exists to explain a failure.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{resolve_breakdown, GroundTruth, RewardAxis, TerminationReason, TrialRecord};
use crate::normalize::NormalizedView;

/// Absolute tolerance around 1.0 for a passing reward.
pub const PASS_TOLERANCE: f64 = 1e-6;

const NONE_LABEL: &str = "(none)";

// ---------------------------------------------------------------------------
// Failure taxonomy
// ---------------------------------------------------------------------------

/// Root-cause bucket for a failed trial. Variant order is the precedence
/// order used by [`classify_failure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureTag {
    SchemaMismatch,
    MissingRequiredActions,
    EnvAssertionFailed,
    TooManyErrors,
    MaxSteps,
    Unknown,
}

impl FailureTag {
    pub const ALL: [FailureTag; 6] = [
        FailureTag::SchemaMismatch,
        FailureTag::MissingRequiredActions,
        FailureTag::EnvAssertionFailed,
        FailureTag::TooManyErrors,
        FailureTag::MaxSteps,
        FailureTag::Unknown,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FailureTag::SchemaMismatch => "Tool misuse / Schema mismatch",
            FailureTag::MissingRequiredActions => "Tool misuse / Missing required actions",
            FailureTag::EnvAssertionFailed => "Reasoning/Planning / Env assertion failed",
            FailureTag::TooManyErrors => "Infra/API / Too many errors",
            FailureTag::MaxSteps => "Loop/timeout / Max steps",
            FailureTag::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for FailureTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Inputs to the failure classifier.
#[derive(Debug, Clone, Copy)]
pub struct FailureSignals<'a> {
    pub args_error_count: usize,
    pub missing_tools: &'a BTreeSet<String>,
    pub failed_env_assertions: &'a [String],
    pub termination: &'a TerminationReason,
}

/// First matching rule wins: argument errors, missing actions, failed
/// assertions, error accumulation, step budget, unknown.
pub fn classify_failure(signals: FailureSignals<'_>) -> FailureTag {
    if signals.args_error_count > 0 {
        FailureTag::SchemaMismatch
    } else if !signals.missing_tools.is_empty() {
        FailureTag::MissingRequiredActions
    } else if !signals.failed_env_assertions.is_empty() {
        FailureTag::EnvAssertionFailed
    } else if signals.termination.indicates_error_accumulation() {
        FailureTag::TooManyErrors
    } else if signals.termination.indicates_step_budget() {
        FailureTag::MaxSteps
    } else {
        FailureTag::Unknown
    }
}

// ---------------------------------------------------------------------------
// Verdict
// ---------------------------------------------------------------------------

/// The explained outcome of one trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub passed: bool,
    /// Recorded reward, absent → 0.0.
    pub reward: f64,
    /// Reward used for the pass rule (0.0 for early terminations).
    pub effective_reward: f64,
    /// An early termination recorded a non-zero reward.
    pub reward_inconsistent: bool,
    pub termination: TerminationReason,
    pub early_termination: bool,
    pub required_tools: BTreeSet<String>,
    pub called_tools: BTreeSet<String>,
    pub missing_tools: BTreeSet<String>,
    pub failed_env_assertions: Vec<String>,
    pub action_mismatches: Vec<String>,
    pub args_error_count: usize,
    pub reward_axes: BTreeMap<RewardAxis, Option<f64>>,
    /// `None` when passed.
    pub failure_tag: Option<FailureTag>,
    pub summary: String,
    pub detail: String,
}

impl Verdict {
    /// Failure tag label, `"-"` for passing trials.
    pub fn failure_label(&self) -> &'static str {
        self.failure_tag.map(FailureTag::label).unwrap_or("-")
    }
}

/// Whether a reward counts as a success.
pub fn is_passing_reward(reward: f64) -> bool {
    (reward - 1.0).abs() <= PASS_TOLERANCE
}

/// Evaluate one trial.
pub fn evaluate(trial: &TrialRecord, truth: &GroundTruth, view: &NormalizedView) -> Verdict {
    let reward = trial.reward_or_zero();
    let early_termination = trial.termination.is_early_termination();
    let effective_reward = if early_termination { 0.0 } else { reward };
    let reward_inconsistent = early_termination && reward != 0.0;
    let passed = is_passing_reward(effective_reward);

    let required_tools = truth.required_tools();
    let called_tools = view.called_tools();
    let missing_tools: BTreeSet<String> =
        required_tools.difference(&called_tools).cloned().collect();

    let failed_env_assertions: Vec<String> = trial
        .reward_info
        .env_assertions
        .iter()
        .filter(|check| check.met == Some(false))
        .map(|check| {
            format!(
                "{} — unmet",
                format_call(&check.assertion.func_name, &check.assertion.arguments)
            )
        })
        .collect();

    let action_mismatches: Vec<String> = trial
        .reward_info
        .action_checks
        .iter()
        .filter(|check| check.action_match == Some(false))
        .map(|check| {
            format!(
                "{} — mismatch",
                format_call(&check.action.name, &check.action.arguments)
            )
        })
        .collect();

    let args_error_count = view.args_health.error_count;

    let failure_tag = (!passed).then(|| {
        classify_failure(FailureSignals {
            args_error_count,
            missing_tools: &missing_tools,
            failed_env_assertions: &failed_env_assertions,
            termination: &trial.termination,
        })
    });

    let mut verdict = Verdict {
        passed,
        reward,
        effective_reward,
        reward_inconsistent,
        termination: trial.termination.clone(),
        early_termination,
        required_tools,
        called_tools,
        missing_tools,
        failed_env_assertions,
        action_mismatches,
        args_error_count,
        reward_axes: resolve_breakdown(&trial.reward_info.breakdown),
        failure_tag,
        summary: String::new(),
        detail: String::new(),
    };
    let (summary, detail) = explain(&verdict, &view.args_health.digest);
    verdict.summary = summary;
    verdict.detail = detail;
    verdict
}

/// `name({"k":"v"})`; absent arguments render as `{}`.
pub fn format_call(name: &str, arguments: &Value) -> String {
    let name = if name.is_empty() { "unknown" } else { name };
    let args = match arguments {
        Value::Null => "{}".to_string(),
        other => other.to_string(),
    };
    format!("{name}({args})")
}

fn join_or_none<'a>(items: impl IntoIterator<Item = &'a String>, sep: &str) -> String {
    let joined = items
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(sep);
    if joined.is_empty() {
        NONE_LABEL.to_string()
    } else {
        joined
    }
}

fn explain(v: &Verdict, args_digest: &str) -> (String, String) {
    if v.passed {
        return (
            "PASS: reward=1.0".to_string(),
            "PASS: all required actions and environment assertions satisfied".to_string(),
        );
    }

    let required = join_or_none(&v.required_tools, ", ");
    let called = join_or_none(&v.called_tools, ", ");
    let missing = join_or_none(&v.missing_tools, ", ");

    let mut summary = format!(
        "FAIL: termination={} / required={} / called={}",
        v.termination, required, called
    );
    let mut extras = Vec::new();
    if !v.missing_tools.is_empty() {
        extras.push(format!("missing={missing}"));
    }
    if !v.failed_env_assertions.is_empty() {
        extras.push(format!(
            "{} broken assertion(s)",
            v.failed_env_assertions.len()
        ));
    }
    if v.args_error_count > 0 {
        extras.push(format!("{} tool-args error(s)", v.args_error_count));
    }
    if !extras.is_empty() {
        summary.push_str(" / ");
        summary.push_str(&extras.join(" / "));
    }

    let mut detail = vec![
        format!("- termination: {}", v.termination),
        format!("- required tools: {required}"),
        format!("- called tools: {called}"),
        format!("- missing tools: {missing}"),
        format!(
            "- action check mismatches: {}",
            join_or_none(&v.action_mismatches, "; ")
        ),
        format!(
            "- failed env assertions: {}",
            join_or_none(&v.failed_env_assertions, "; ")
        ),
    ];
    if v.args_error_count > 0 {
        detail.push(format!("- tool-args parse errors: {args_digest}"));
    }
    if v.reward_inconsistent {
        detail.push(format!(
            "- recorded reward {} ignored: early termination scores 0",
            v.reward
        ));
    }
    (summary, detail.join("\n"))
}
