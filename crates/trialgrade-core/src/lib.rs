//! trialgrade core library
//!
//! Scores repeated-trial agent benchmark runs: recovers tool-call arguments,
//! normalizes transcripts, explains each trial's verdict, and rolls results
//! up into Pass^k estimators per task, domain and model.

pub mod config;
pub mod domain;
pub mod ingest;
pub mod metrics;
pub mod normalize;
pub mod obs;
pub mod passk;
pub mod pipeline;
pub mod recovery;
pub mod reporting;
pub mod rollup;
pub mod telemetry;
pub mod verdict;

pub use config::{ModelLabel, ScoringConfig};

pub use domain::{
    Action, ActionCheck, EnvAssertion, EnvAssertionCheck, GradeError, GroundTruth,
    GroundTruthIndex, Message, Result, RewardAxis, RewardInfo, Role, TerminationReason,
    ToolCallRequest, TrialKey, TrialRecord,
};

pub use ingest::{load_simulation_dir, IngestedRun};

pub use normalize::{
    normalize, ArgsHealthSummary, NormalizeOptions, NormalizedView, TurnKind, TurnRow,
};

pub use passk::{pass_at_k, render_pass_value, PassAtK, TaskAggregate, PASS_K_VALUES};

pub use pipeline::{aggregate_tasks, build_report, score_trial, score_trials, ScoreReport, ScoredTrial};

pub use recovery::{recover_arguments, recover_tool_arguments, ArgHealth, RecoveredArguments};

pub use reporting::{
    read_report_json, render_summary_md, write_report_json, write_summary_md, ReportArtifact,
    TrialRow,
};

pub use telemetry::init_tracing;

pub use rollup::{rank_models, ArgsHealthRow, DomainScore, FailureMix, ModelStanding};

pub use verdict::{evaluate, FailureTag, Verdict};

/// Crate version, shared by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
