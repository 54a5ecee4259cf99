//! Per-task ground truth: required actions and environment assertions.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// A tool action, either required by ground truth or reported by an action check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Action {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl Action {
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// An assertion over the final environment state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvAssertion {
    pub func_name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl EnvAssertion {
    pub fn new(func_name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            func_name: func_name.into(),
            arguments,
        }
    }
}

/// What a task requires for success.
///
/// An empty requirement set is valid: it yields an empty `required` set in
/// verdicts rather than an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GroundTruth {
    pub task_id: String,
    pub actions: Vec<Action>,
    pub env_assertions: Vec<EnvAssertion>,
    /// Raw scenario instructions for the simulated user, kept for reports.
    #[serde(default)]
    pub request: Option<serde_json::Value>,
}

impl GroundTruth {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            ..Self::default()
        }
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_env_assertion(mut self, assertion: EnvAssertion) -> Self {
        self.env_assertions.push(assertion);
        self
    }

    /// Distinct names of required actions, duplicates collapsed.
    pub fn required_tools(&self) -> BTreeSet<String> {
        self.actions
            .iter()
            .filter(|a| !a.name.is_empty())
            .map(|a| a.name.clone())
            .collect()
    }

    /// Scenario instructions as text. Strings are kept verbatim, structured
    /// instructions are rendered as JSON.
    pub fn request_text(&self) -> Option<String> {
        match self.request.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) if s.trim().is_empty() => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// `required tools: a, b; env assertions: f`, or `(none)`.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        let required = self.required_tools();
        if !required.is_empty() {
            let names: Vec<&str> = required.iter().map(String::as_str).collect();
            parts.push(format!("required tools: {}", names.join(", ")));
        }
        let assertions: BTreeSet<&str> = self
            .env_assertions
            .iter()
            .map(|a| a.func_name.as_str())
            .filter(|name| !name.is_empty())
            .collect();
        if !assertions.is_empty() {
            let names: Vec<&str> = assertions.into_iter().collect();
            parts.push(format!("env assertions: {}", names.join(", ")));
        }
        if parts.is_empty() {
            "(none)".to_string()
        } else {
            parts.join("; ")
        }
    }
}

/// Ground truth keyed by `(domain, task_id)`, shared read-only across trials.
#[derive(Debug, Clone, Default)]
pub struct GroundTruthIndex {
    entries: HashMap<(String, String), Arc<GroundTruth>>,
}

impl GroundTruthIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the ground truth for a task.
    pub fn insert(&mut self, domain: &str, truth: GroundTruth) {
        self.entries
            .insert((domain.to_string(), truth.task_id.clone()), Arc::new(truth));
    }

    pub fn get(&self, domain: &str, task_id: &str) -> Option<Arc<GroundTruth>> {
        self.entries
            .get(&(domain.to_string(), task_id.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
