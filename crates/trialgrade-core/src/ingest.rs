//! Loading simulation result files into trials and ground truth.
//!
//! Each `*.json` file holds one (model, domain) run: run metadata under
//! `info`, task definitions under `tasks` and recorded trials under
//! `simulations`. Parsing is lenient: unusable files are skipped and
//! counted, missing fields fall back to defaults. The one hard error is a
//! task definition without an id.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::config::ScoringConfig;
use crate::domain::{
    Action, ActionCheck, EnvAssertion, EnvAssertionCheck, GradeError, GroundTruth,
    GroundTruthIndex, Message, Result, RewardInfo, Role, TerminationReason, ToolCallRequest,
    TrialKey, TrialRecord,
};
use crate::obs;

// ---------------------------------------------------------------------------
// Upstream file format
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SimulationFile {
    info: RunInfo,
    tasks: Option<Vec<TaskEntry>>,
    simulations: Option<Vec<SimulationEntry>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RunInfo {
    agent_info: Option<AgentInfo>,
    environment_info: Option<EnvironmentInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AgentInfo {
    llm: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EnvironmentInfo {
    domain_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TaskEntry {
    id: Value,
    evaluation_criteria: Option<Criteria>,
    user_scenario: Option<UserScenario>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Criteria {
    actions: Option<Vec<RawAction>>,
    env_assertions: Option<Vec<RawEnvAssertion>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UserScenario {
    instructions: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawAction {
    name: Option<String>,
    arguments: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEnvAssertion {
    func_name: Option<String>,
    arguments: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SimulationEntry {
    task_id: Value,
    trial: Value,
    info_trial_num: Value,
    reward: Option<f64>,
    termination_reason: Option<String>,
    reward_info: Option<RawRewardInfo>,
    messages: Option<Vec<RawMessage>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRewardInfo {
    reward: Option<f64>,
    reward_breakdown: Option<serde_json::Map<String, Value>>,
    reward_basis: Option<Vec<Value>>,
    env_assertions: Option<Vec<RawEnvAssertionCheck>>,
    action_checks: Option<Vec<RawActionCheck>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEnvAssertionCheck {
    env_assertion: Option<RawEnvAssertion>,
    met: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawActionCheck {
    action: Option<RawAction>,
    action_match: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawMessage {
    role: Option<Role>,
    content: Value,
    tool_calls: Option<Vec<RawToolCall>>,
    raw_data: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawToolCall {
    id: Option<String>,
    name: Option<String>,
    arguments: Value,
}

// ---------------------------------------------------------------------------
// Ingestion result
// ---------------------------------------------------------------------------

/// Everything loaded from one input directory.
#[derive(Debug, Default)]
pub struct IngestedRun {
    pub trials: Vec<TrialRecord>,
    pub ground_truth: GroundTruthIndex,
    pub files_read: usize,
    pub skipped_files: usize,
    /// Model labels in the order they were first encountered.
    pub models_seen: Vec<String>,
    /// Domains in the order they were first encountered.
    pub domains_seen: Vec<String>,
}

impl IngestedRun {
    fn note_model(&mut self, label: &str) {
        if !self.models_seen.iter().any(|m| m == label) {
            self.models_seen.push(label.to_string());
        }
    }

    fn note_domain(&mut self, domain: &str) {
        if !self.domains_seen.iter().any(|d| d == domain) {
            self.domains_seen.push(domain.to_string());
        }
    }
}

/// Load every `*.json` file in `dir`, in file-name order.
pub fn load_simulation_dir(dir: &Path, config: &ScoringConfig) -> Result<IngestedRun> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();

    let mut run = IngestedRun::default();
    for path in &paths {
        let source_name = path.display().to_string();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                obs::emit_file_skipped(&source_name, &e.to_string());
                run.skipped_files += 1;
                continue;
            }
        };
        if ingest_simulation_str(&text, &source_name, config, &mut run)? {
            run.files_read += 1;
        }
    }
    Ok(run)
}

/// Ingest one file's contents into `run`. Returns `Ok(false)` when the file
/// was skipped (skips are counted in `run.skipped_files`).
pub fn ingest_simulation_str(
    text: &str,
    source_name: &str,
    config: &ScoringConfig,
    run: &mut IngestedRun,
) -> Result<bool> {
    let file: SimulationFile = match serde_json::from_str(text) {
        Ok(file) => file,
        Err(e) => {
            obs::emit_file_skipped(source_name, &format!("invalid JSON: {e}"));
            run.skipped_files += 1;
            return Ok(false);
        }
    };

    let llm = trimmed(file.info.agent_info.and_then(|a| a.llm));
    let domain = trimmed(file.info.environment_info.and_then(|e| e.domain_name));
    let (Some(llm), Some(domain)) = (llm, domain) else {
        obs::emit_file_skipped(source_name, "missing agent llm or domain");
        run.skipped_files += 1;
        return Ok(false);
    };
    let Some(label) = config.label_for(&llm).map(str::to_string) else {
        tracing::debug!(path = %source_name, llm = %llm, "model not configured, skipping");
        return Ok(false);
    };

    for (index, task) in file.tasks.unwrap_or_default().into_iter().enumerate() {
        let truth = ground_truth_from_task(task).ok_or_else(|| GradeError::InvalidGroundTruth {
            source_name: source_name.to_string(),
            reason: format!("task entry {index} has no id"),
        })?;
        run.ground_truth.insert(&domain, truth);
    }

    run.note_model(&label);
    run.note_domain(&domain);
    for sim in file.simulations.unwrap_or_default() {
        run.trials.push(trial_from_simulation(sim, &label, &llm, &domain));
    }
    Ok(true)
}

fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn ground_truth_from_task(task: TaskEntry) -> Option<GroundTruth> {
    let mut truth = GroundTruth::new(id_string(&task.id)?);
    let criteria = task.evaluation_criteria.unwrap_or_default();
    truth.actions = criteria
        .actions
        .unwrap_or_default()
        .into_iter()
        .map(|a| Action::new(a.name.unwrap_or_default(), a.arguments))
        .collect();
    truth.env_assertions = criteria
        .env_assertions
        .unwrap_or_default()
        .into_iter()
        .map(|a| EnvAssertion::new(a.func_name.unwrap_or_default(), a.arguments))
        .collect();
    truth.request = task.user_scenario.and_then(|s| s.instructions);
    Some(truth)
}

fn trial_index(sim: &SimulationEntry) -> u32 {
    [&sim.trial, &sim.info_trial_num]
        .into_iter()
        .find_map(|v| match v {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0)
}

fn trial_from_simulation(
    sim: SimulationEntry,
    label: &str,
    llm: &str,
    domain: &str,
) -> TrialRecord {
    let task_id = id_string(&sim.task_id).unwrap_or_else(|| "N/A".to_string());
    let trial = trial_index(&sim);
    let info = sim.reward_info.unwrap_or_default();

    let mut record = TrialRecord::new(TrialKey::new(label, domain, task_id, trial));
    record.agent_llm = llm.to_string();
    record.reward = sim.reward.or(info.reward);
    record.termination = TerminationReason::parse(sim.termination_reason.as_deref().unwrap_or(""));
    record.reward_info = reward_info(info);
    record.messages = sim
        .messages
        .unwrap_or_default()
        .into_iter()
        .map(message_from_raw)
        .collect();
    record
}

fn reward_info(info: RawRewardInfo) -> RewardInfo {
    RewardInfo {
        breakdown: info
            .reward_breakdown
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k, v.as_f64()))
            .collect(),
        reward_basis: info
            .reward_basis
            .unwrap_or_default()
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        env_assertions: info
            .env_assertions
            .unwrap_or_default()
            .into_iter()
            .filter_map(|check| {
                let a = check.env_assertion?;
                Some(EnvAssertionCheck {
                    assertion: EnvAssertion::new(
                        a.func_name.unwrap_or_else(|| "unknown_assertion".to_string()),
                        a.arguments,
                    ),
                    met: check.met,
                })
            })
            .collect(),
        action_checks: info
            .action_checks
            .unwrap_or_default()
            .into_iter()
            .filter_map(|check| {
                let a = check.action?;
                Some(ActionCheck {
                    action: Action::new(
                        a.name.unwrap_or_else(|| "unknown_action".to_string()),
                        a.arguments,
                    ),
                    action_match: check.action_match,
                })
            })
            .collect(),
    }
}

fn message_from_raw(raw: RawMessage) -> Message {
    let content = match raw.content {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    };
    let provider_calls = provider_tool_calls(&raw.raw_data);

    let tool_calls = raw
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(position, call)| {
            let id = call.id.unwrap_or_default();
            let provider = provider_calls
                .iter()
                .find(|p| {
                    !id.is_empty() && p.get("id").and_then(Value::as_str) == Some(id.as_str())
                })
                .or_else(|| provider_calls.get(position));
            let function = provider.and_then(|p| p.get("function"));

            let name = call
                .name
                .filter(|n| !n.is_empty())
                .or_else(|| {
                    function
                        .and_then(|f| f.get("name"))
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
                .unwrap_or_default();
            let raw_arguments = match function {
                Some(f) => f.get("arguments").cloned().unwrap_or(Value::Null),
                None => call.arguments,
            };
            ToolCallRequest::new(id, name, raw_arguments)
        })
        .collect();

    Message {
        role: raw.role.unwrap_or(Role::Other),
        content,
        tool_calls,
    }
}

/// `raw_data.message.tool_calls` as the provider originally returned them.
fn provider_tool_calls(raw_data: &Value) -> Vec<Value> {
    raw_data
        .get("message")
        .and_then(|m| m.get("tool_calls"))
        .and_then(Value::as_array)
        .map(|calls| calls.iter().filter(|c| c.is_object()).cloned().collect())
        .unwrap_or_default()
}
