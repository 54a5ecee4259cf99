//! Domain models for trialgrade.
//!
//! Canonical definitions for the core entities:
//! - `TrialRecord`: one attempt of one task by one model
//! - `GroundTruth`: required actions and environment assertions per task
//! - `RewardAxis`: the closed set of reward sub-checks

pub mod error;
pub mod ground_truth;
pub mod reward;
pub mod trial;

// Re-export main types and errors
pub use error::{GradeError, Result};
pub use ground_truth::{Action, EnvAssertion, GroundTruth, GroundTruthIndex};
pub use reward::{axis_value, resolve_breakdown, RewardAxis};
pub use trial::{
    ActionCheck, EnvAssertionCheck, Message, RewardInfo, Role, TerminationReason,
    ToolCallRequest, TrialKey, TrialRecord,
};
