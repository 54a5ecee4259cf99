//! Transcript normalization.
//!
//! Walks a trial's messages once and extracts everything the verdict engine
//! and reports need: first user utterance, tool calls with recovered
//! arguments and health, tool results, final assistant text, a per-turn
//! ledger, and an argument-health summary.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::domain::{Role, TrialRecord};
use crate::recovery::{recover_tool_arguments, ArgHealth, DEFAULT_EXCERPT_CHARS};

/// Separator between tool results in [`NormalizedView::tool_results_text`].
pub const TOOL_RESULT_SEPARATOR: &str = "\n\n---\n\n";

/// Default number of entries in the argument-health digest.
pub const DEFAULT_DIGEST_CAP: usize = 6;

/// Knobs for normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    pub digest_cap: usize,
    pub excerpt_chars: usize,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            digest_cap: DEFAULT_DIGEST_CAP,
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
        }
    }
}

/// A tool call with its recovered arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Map<String, Value>,
    pub health: ArgHealth,
}

/// One argument-recovery error, for reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgIssue {
    pub tool: String,
    pub error: String,
    pub raw: Option<String>,
}

/// Per-trial argument-health summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgsHealthSummary {
    /// Calls whose ledger entry is recovered-as-empty or parse-failed.
    pub error_count: usize,
    /// `"tool: reason; tool: reason (+N more)"`, empty when clean.
    pub digest: String,
    pub issues: Vec<ArgIssue>,
}

impl ArgsHealthSummary {
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    fn from_calls(calls: &[NormalizedToolCall], cap: usize) -> Self {
        let issues: Vec<ArgIssue> = calls
            .iter()
            .filter(|c| c.health.is_error())
            .map(|c| ArgIssue {
                tool: c.name.clone(),
                error: c.health.error_reason().unwrap_or("error").to_string(),
                raw: match &c.health {
                    ArgHealth::ParseFailed { excerpt, .. } => Some(excerpt.clone()),
                    _ => None,
                },
            })
            .collect();

        let mut digest = issues
            .iter()
            .take(cap)
            .map(|i| {
                let tool = if i.tool.is_empty() {
                    "unknown_tool"
                } else {
                    &i.tool
                };
                format!("{tool}: {}", i.error)
            })
            .collect::<Vec<_>>()
            .join("; ");
        if issues.len() > cap {
            digest.push_str(&format!(" (+{} more)", issues.len() - cap));
        }

        Self {
            error_count: issues.len(),
            digest,
            issues,
        }
    }
}

/// What a transcript turn carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnKind {
    Text,
    ToolCall,
    ToolResult,
}

/// One transcript message, flattened for turn-by-turn diagnosis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRow {
    /// Position in the transcript, counting every message.
    pub index: usize,
    pub speaker: Role,
    pub kind: TurnKind,
    /// Named calls only.
    pub tool_names: Vec<String>,
    /// Recovered arguments of every call on this turn, one JSON object each.
    pub tool_args: Vec<String>,
    /// Message content for non-tool speakers.
    pub text: String,
    /// Message content for tool results.
    pub tool_result: String,
}

impl TurnRow {
    fn new(index: usize, role: Role, content: &str, calls: &[NormalizedToolCall]) -> Self {
        let kind = match role {
            Role::Tool => TurnKind::ToolResult,
            Role::Assistant if !calls.is_empty() => TurnKind::ToolCall,
            _ => TurnKind::Text,
        };
        let (text, tool_result) = if role == Role::Tool {
            (String::new(), content.to_string())
        } else {
            (content.to_string(), String::new())
        };
        Self {
            index,
            speaker: role,
            kind,
            tool_names: calls
                .iter()
                .filter(|c| !c.name.is_empty())
                .map(|c| c.name.clone())
                .collect(),
            tool_args: calls
                .iter()
                .map(|c| Value::Object(c.arguments.clone()).to_string())
                .collect(),
            text,
            tool_result,
        }
    }
}

/// Everything extracted from one transcript.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedView {
    pub first_user_text: String,
    pub tool_calls: Vec<NormalizedToolCall>,
    pub tool_results: Vec<String>,
    pub final_assistant_text: Option<String>,
    pub tool_call_count: usize,
    /// Assistant messages carrying both text and tool calls.
    pub mixed_assistant_messages: usize,
    pub args_health: ArgsHealthSummary,
    pub turns: Vec<TurnRow>,
}

impl NormalizedView {
    /// Distinct, non-empty tool names, sorted.
    pub fn called_tools(&self) -> BTreeSet<String> {
        self.tool_calls
            .iter()
            .filter(|c| !c.name.is_empty())
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn tool_results_text(&self) -> String {
        self.tool_results.join(TOOL_RESULT_SEPARATOR)
    }
}

/// Normalize a trial's transcript. Pure: depends only on `trial.messages`.
pub fn normalize(trial: &TrialRecord, options: NormalizeOptions) -> NormalizedView {
    let mut view = NormalizedView::default();
    let mut seen_user = false;

    for (index, message) in trial.messages.iter().enumerate() {
        let calls: Vec<NormalizedToolCall> = message
            .tool_calls
            .iter()
            .map(|tc| {
                let recovered =
                    recover_tool_arguments(&tc.raw_arguments, &tc.name, options.excerpt_chars);
                NormalizedToolCall {
                    id: tc.id.clone(),
                    name: tc.name.clone(),
                    arguments: recovered.arguments,
                    health: recovered.health,
                }
            })
            .collect();

        match message.role {
            Role::User if !seen_user => {
                if let Some(text) = message.text() {
                    view.first_user_text = text.to_string();
                    seen_user = true;
                }
            }
            Role::Assistant => match (message.text(), calls.is_empty()) {
                (Some(text), calls_empty) => {
                    if !calls_empty {
                        view.mixed_assistant_messages += 1;
                    }
                    view.final_assistant_text = Some(text.to_string());
                }
                (None, false) => {
                    view.final_assistant_text = Some(render_calls(&calls));
                }
                (None, true) => {}
            },
            Role::Tool => {
                if let Some(text) = message.content.as_deref().filter(|s| !s.is_empty()) {
                    view.tool_results.push(text.to_string());
                }
            }
            _ => {}
        }

        view.turns.push(TurnRow::new(
            index,
            message.role,
            message.content.as_deref().unwrap_or(""),
            &calls,
        ));
        view.tool_call_count += calls.len();
        view.tool_calls.extend(calls);
    }

    view.args_health = ArgsHealthSummary::from_calls(&view.tool_calls, options.digest_cap);
    view
}

fn render_calls(calls: &[NormalizedToolCall]) -> String {
    let rendered: Vec<Value> = calls
        .iter()
        .map(|c| json!({"id": c.id, "name": c.name, "arguments": c.arguments}))
        .collect();
    Value::Array(rendered).to_string()
}
