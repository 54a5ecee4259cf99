//! Trials, transcript messages and termination reasons.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::ground_truth::{Action, EnvAssertion};
use super::reward::RewardAxis;

/// Identity of one attempt of one task by one model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrialKey {
    /// Display label of the model.
    pub model: String,
    pub domain: String,
    pub task_id: String,
    pub trial: u32,
}

impl TrialKey {
    pub fn new(
        model: impl Into<String>,
        domain: impl Into<String>,
        task_id: impl Into<String>,
        trial: u32,
    ) -> Self {
        Self {
            model: model.into(),
            domain: domain.into(),
            task_id: task_id.into(),
            trial,
        }
    }

    /// Stable run identifier, e.g. `qwen3-32b-FC_retail_T7_trial0`.
    pub fn run_id(&self) -> String {
        format!(
            "{}_{}_T{}_trial{}",
            self.model, self.domain, self.task_id, self.trial
        )
    }
}

/// Speaker of a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
    System,
    #[serde(other)]
    Other,
}

/// A tool invocation requested by the assistant. `raw_arguments` is whatever
/// the provider emitted: an object, a string (possibly malformed), or null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub raw_arguments: serde_json::Value,
}

impl ToolCallRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, raw: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            raw_arguments: raw,
        }
    }
}

/// One transcript entry. Tool messages carry their result in `content`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRequest>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: Some(text.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(text.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn assistant_calls(calls: Vec<ToolCallRequest>) -> Self {
        Self {
            role: Role::Assistant,
            content: None,
            tool_calls: calls,
        }
    }

    pub fn tool(result: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(result.into()),
            tool_calls: Vec::new(),
        }
    }

    /// Content with surrounding whitespace removed, if any remains.
    pub fn text(&self) -> Option<&str> {
        self.content
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Why a simulation ended.
///
/// Only [`AgentStop`](Self::AgentStop) and [`UserStop`](Self::UserStop) are
/// normal evaluations. Every other named reason is an early termination;
/// [`Unknown`](Self::Unknown) means the reason was not recorded and is neither.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TerminationReason {
    AgentStop,
    UserStop,
    MaxSteps,
    TooManyErrors,
    AgentError,
    UserError,
    Unknown,
    Other(String),
}

impl TerminationReason {
    /// Parse an upstream value such as `"agent_stop"`,
    /// `"TerminationReason.MAX_STEPS"` or `"max_turns"`.
    pub fn parse(raw: &str) -> Self {
        let bare = raw.rsplit('.').next().unwrap_or(raw).trim().to_lowercase();
        match bare.as_str() {
            "" | "n/a" | "unknown" => Self::Unknown,
            "agent_stop" => Self::AgentStop,
            "user_stop" => Self::UserStop,
            "agent_error" => Self::AgentError,
            "user_error" => Self::UserError,
            s if s.contains("too_many_errors") => Self::TooManyErrors,
            s if s.contains("max_steps") || s.contains("max_turns") => Self::MaxSteps,
            _ => Self::Other(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::AgentStop => "agent_stop",
            Self::UserStop => "user_stop",
            Self::MaxSteps => "max_steps",
            Self::TooManyErrors => "too_many_errors",
            Self::AgentError => "agent_error",
            Self::UserError => "user_error",
            Self::Unknown => "n/a",
            Self::Other(s) => s,
        }
    }

    pub fn is_normal_stop(&self) -> bool {
        matches!(self, Self::AgentStop | Self::UserStop)
    }

    pub fn is_early_termination(&self) -> bool {
        !self.is_normal_stop() && *self != Self::Unknown
    }

    pub fn indicates_error_accumulation(&self) -> bool {
        matches!(self, Self::TooManyErrors)
    }

    pub fn indicates_step_budget(&self) -> bool {
        matches!(self, Self::MaxSteps)
    }
}

impl From<String> for TerminationReason {
    fn from(raw: String) -> Self {
        Self::parse(&raw)
    }
}

impl From<TerminationReason> for String {
    fn from(reason: TerminationReason) -> Self {
        reason.as_str().to_string()
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one environment assertion as reported by the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvAssertionCheck {
    pub assertion: EnvAssertion,
    /// `None` when the simulator did not report the flag.
    pub met: Option<bool>,
}

/// Outcome of one required-action comparison as reported by the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionCheck {
    pub action: Action,
    pub action_match: Option<bool>,
}

/// Reward sub-scores and per-check results for a trial.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardInfo {
    /// Raw axis key → value; keys are resolved through `RewardAxis::resolve`.
    #[serde(default)]
    pub breakdown: BTreeMap<String, Option<f64>>,
    #[serde(default)]
    pub reward_basis: Vec<String>,
    #[serde(default)]
    pub env_assertions: Vec<EnvAssertionCheck>,
    #[serde(default)]
    pub action_checks: Vec<ActionCheck>,
}

impl RewardInfo {
    /// Reward basis with dotted namespaces stripped (`RewardType.DB` → `DB`).
    /// Known axes take their canonical spelling; blank entries are dropped.
    pub fn normalized_basis(&self) -> Vec<String> {
        self.reward_basis
            .iter()
            .filter_map(|key| match RewardAxis::resolve(key) {
                Some(axis) => Some(axis.as_str().to_string()),
                None => {
                    let bare = key.rsplit('.').next().unwrap_or(key).trim();
                    (!bare.is_empty()).then(|| bare.to_string())
                }
            })
            .collect()
    }
}

/// One recorded attempt. Never mutated by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub key: TrialKey,
    /// Raw agent model identifier before label mapping.
    #[serde(default)]
    pub agent_llm: String,
    /// Final reward; absent is scored as 0.0.
    pub reward: Option<f64>,
    #[serde(default)]
    pub reward_info: RewardInfo,
    pub termination: TerminationReason,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl TrialRecord {
    pub fn new(key: TrialKey) -> Self {
        Self {
            key,
            agent_llm: String::new(),
            reward: None,
            reward_info: RewardInfo::default(),
            termination: TerminationReason::AgentStop,
            messages: Vec::new(),
        }
    }

    pub fn with_reward(mut self, reward: f64) -> Self {
        self.reward = Some(reward);
        self
    }

    pub fn with_termination(mut self, termination: TerminationReason) -> Self {
        self.termination = termination;
        self
    }

    pub fn with_message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn with_reward_info(mut self, info: RewardInfo) -> Self {
        self.reward_info = info;
        self
    }

    /// The recorded reward with absence treated as 0.0.
    pub fn reward_or_zero(&self) -> f64 {
        self.reward.unwrap_or(0.0)
    }
}
