//! Persisted report artifacts: `report.json` with an integrity digest, and a
//! Markdown summary.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::ScoringConfig;
use crate::domain::{GradeError, Result, RewardAxis};
use crate::normalize::TurnRow;
use crate::passk::TaskAggregate;
use crate::pipeline::{ScoreReport, ScoredTrial};
use crate::rollup::{ArgsHealthRow, DomainScore, FailureMix, ModelStanding};
use crate::verdict::FailureTag;

pub const REPORT_SCHEMA_VERSION: &str = "1.1";
pub const REPORT_FILE: &str = "report.json";
pub const DIGEST_FILE: &str = "report.digest";
pub const SUMMARY_FILE: &str = "summary.md";

const UNDEFINED_CELL: &str = "n/a";

/// One trial as it appears in the report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrialRow {
    pub run_id: String,
    pub model: String,
    pub domain: String,
    pub task_id: String,
    pub trial: u32,
    pub passed: bool,
    pub reward: f64,
    pub effective_reward: f64,
    pub reward_inconsistent: bool,
    pub termination: String,
    pub failure_tag: Option<FailureTag>,
    pub summary: String,
    pub detail: String,
    pub required_tools: Vec<String>,
    pub called_tools: Vec<String>,
    pub missing_tools: Vec<String>,
    pub failed_env_assertions: Vec<String>,
    pub action_mismatches: Vec<String>,
    pub reward_axes: BTreeMap<RewardAxis, Option<f64>>,
    pub tool_call_count: usize,
    pub args_error_count: usize,
    pub args_digest: String,
    pub first_user_text: String,
    pub final_assistant_text: Option<String>,
    pub request: String,
    pub user_scenario: Option<String>,
    pub ground_truth_summary: String,
    pub ground_truth_actions: Vec<String>,
    pub reward_basis: Vec<String>,
    pub turns: Vec<TurnRow>,
}

impl From<&ScoredTrial> for TrialRow {
    fn from(t: &ScoredTrial) -> Self {
        let v = &t.verdict;
        Self {
            run_id: t.key.run_id(),
            model: t.key.model.clone(),
            domain: t.key.domain.clone(),
            task_id: t.key.task_id.clone(),
            trial: t.key.trial,
            passed: v.passed,
            reward: v.reward,
            effective_reward: v.effective_reward,
            reward_inconsistent: v.reward_inconsistent,
            termination: v.termination.to_string(),
            failure_tag: v.failure_tag,
            summary: v.summary.clone(),
            detail: v.detail.clone(),
            required_tools: v.required_tools.iter().cloned().collect(),
            called_tools: v.called_tools.iter().cloned().collect(),
            missing_tools: v.missing_tools.iter().cloned().collect(),
            failed_env_assertions: v.failed_env_assertions.clone(),
            action_mismatches: v.action_mismatches.clone(),
            reward_axes: v.reward_axes.clone(),
            tool_call_count: t.view.tool_call_count,
            args_error_count: v.args_error_count,
            args_digest: t.view.args_health.digest.clone(),
            first_user_text: t.view.first_user_text.clone(),
            final_assistant_text: t.view.final_assistant_text.clone(),
            request: t.request.clone(),
            user_scenario: t.user_scenario.clone(),
            ground_truth_summary: t.ground_truth_summary.clone(),
            ground_truth_actions: t.ground_truth_actions.clone(),
            reward_basis: t.reward_basis.clone(),
            turns: t.view.turns.clone(),
        }
    }
}

/// Canonical report artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportArtifact {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub config: ScoringConfig,
    pub files_read: usize,
    pub skipped_files: usize,
    pub models: Vec<String>,
    pub domains: Vec<String>,
    pub standings: Vec<ModelStanding>,
    pub domain_scores: Vec<DomainScore>,
    pub tasks: Vec<TaskAggregate>,
    pub trials: Vec<TrialRow>,
    pub failure_mix: Vec<FailureMix>,
    pub args_health: Vec<ArgsHealthRow>,
}

impl ReportArtifact {
    pub fn new(
        report: &ScoreReport,
        config: &ScoringConfig,
        files_read: usize,
        skipped_files: usize,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            generated_at,
            config: config.clone(),
            files_read,
            skipped_files,
            models: report.models.clone(),
            domains: report.domains.clone(),
            standings: report.standings.clone(),
            domain_scores: report.domain_scores.clone(),
            tasks: report.tasks.clone(),
            trials: report.trials.iter().map(TrialRow::from).collect(),
            failure_mix: report.failure_mix.clone(),
            args_health: report.args_health.clone(),
        }
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Persist `<dir>/report.json` and `<dir>/report.digest`.
pub fn write_report_json(dir: &Path, artifact: &ReportArtifact) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let path = dir.join(REPORT_FILE);
    let json = serde_json::to_vec_pretty(artifact)?;
    std::fs::write(&path, &json)?;
    std::fs::write(dir.join(DIGEST_FILE), sha256_hex(&json).as_bytes())?;

    Ok(path)
}

/// Read `<dir>/report.json`, verifying it against `<dir>/report.digest`.
pub fn read_report_json(dir: &Path) -> Result<ReportArtifact> {
    let json = std::fs::read(dir.join(REPORT_FILE))?;
    let digest = std::fs::read_to_string(dir.join(DIGEST_FILE))?;
    let actual = sha256_hex(&json);
    if digest.trim() != actual {
        return Err(GradeError::DigestMismatch {
            expected: digest.trim().to_string(),
            actual,
        });
    }
    let artifact: ReportArtifact = serde_json::from_slice(&json)?;
    Ok(artifact)
}

// ---------------------------------------------------------------------------
// Markdown
// ---------------------------------------------------------------------------

/// Table-cell text: pipes escaped, line breaks flattened.
fn text_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

fn cell(value: Option<f64>) -> String {
    value
        .map(|v| format!("{v:.3}"))
        .unwrap_or_else(|| UNDEFINED_CELL.to_string())
}

/// Render the Markdown summary: ranking, per-domain Pass@1, failure mix and
/// argument health.
pub fn render_summary_md(artifact: &ReportArtifact) -> String {
    let mut out = String::new();
    out.push_str("# Trial Scoring Summary\n\n");
    out.push_str(&format!(
        "- generated: {}\n- files: {} read, {} skipped\n- trials: {}\n\n",
        artifact.generated_at.to_rfc3339(),
        artifact.files_read,
        artifact.skipped_files,
        artifact.trials.len()
    ));

    out.push_str("## Ranking\n\n");
    out.push_str("| Rank | Model | Pass@1 | Pass@2 | Pass@4 |\n");
    out.push_str("|---:|---|---:|---:|---:|\n");
    for s in &artifact.standings {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            s.rank,
            text_cell(&s.model),
            cell(s.overall.p1),
            cell(s.overall.p2),
            cell(s.overall.p4)
        ));
    }
    out.push('\n');

    out.push_str("## Pass@1 by domain\n\n");
    out.push_str("| Model |");
    for d in &artifact.domains {
        out.push_str(&format!(" {} |", text_cell(d)));
    }
    out.push_str("\n|---|");
    out.push_str(&"---:|".repeat(artifact.domains.len()));
    out.push('\n');
    for s in &artifact.standings {
        out.push_str(&format!("| {} |", text_cell(&s.model)));
        for d in &artifact.domains {
            let value = artifact
                .domain_scores
                .iter()
                .find(|ds| ds.model == s.model && &ds.domain == d)
                .and_then(|ds| ds.pass_at.p1);
            out.push_str(&format!(" {} |", cell(value)));
        }
        out.push('\n');
    }
    out.push('\n');

    if !artifact.failure_mix.is_empty() {
        out.push_str("## Failure mix\n\n");
        out.push_str("| Model | Failed |");
        for tag in FailureTag::ALL {
            out.push_str(&format!(" {tag} |"));
        }
        out.push_str("\n|---|---:|");
        out.push_str(&"---:|".repeat(FailureTag::ALL.len()));
        out.push('\n');
        for mix in &artifact.failure_mix {
            out.push_str(&format!("| {} | {} |", text_cell(&mix.model), mix.failed));
            for tag in FailureTag::ALL {
                out.push_str(&format!(" {} |", mix.counts.get(&tag).copied().unwrap_or(0)));
            }
            out.push('\n');
        }
        out.push('\n');
    }

    if !artifact.args_health.is_empty() {
        out.push_str("## Tool argument health\n\n");
        out.push_str("| Model | Runs | Error runs | Error rate | Avg errors/run |\n");
        out.push_str("|---|---:|---:|---:|---:|\n");
        for row in &artifact.args_health {
            out.push_str(&format!(
                "| {} | {} | {} | {:.1}% | {:.2} |\n",
                text_cell(&row.model),
                row.runs,
                row.error_runs,
                row.error_rate * 100.0,
                row.avg_errors_per_run
            ));
        }
    }
    out
}

/// Write `<dir>/summary.md`.
pub fn write_summary_md(dir: &Path, artifact: &ReportArtifact) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(SUMMARY_FILE);
    std::fs::write(&path, render_summary_md(artifact))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passk::PassAtK;
    use serde_json::json;

    fn artifact() -> ReportArtifact {
        ReportArtifact {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            generated_at: DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
                .expect("parse RFC3339")
                .with_timezone(&Utc),
            config: ScoringConfig::default(),
            files_read: 2,
            skipped_files: 1,
            models: vec!["m1".to_string(), "m2".to_string()],
            domains: vec!["retail".to_string(), "airline".to_string()],
            standings: vec![
                ModelStanding {
                    model: "m1".to_string(),
                    overall: PassAtK {
                        p1: Some(0.5),
                        p2: Some(1.0 / 6.0),
                        p4: None,
                    },
                    rank: 1,
                },
                ModelStanding {
                    model: "m2".to_string(),
                    overall: PassAtK::default(),
                    rank: 2,
                },
            ],
            domain_scores: vec![DomainScore {
                model: "m1".to_string(),
                domain: "retail".to_string(),
                tasks: 1,
                pass_at: PassAtK {
                    p1: Some(0.5),
                    p2: Some(1.0 / 6.0),
                    p4: Some(0.0),
                },
            }],
            tasks: vec![TaskAggregate::new("m1", "retail", "1", 4, 2)],
            trials: vec![],
            failure_mix: vec![],
            args_health: vec![],
        }
    }

    #[test]
    fn report_schema_has_expected_keys() {
        let raw = serde_json::to_value(artifact()).expect("serialize artifact");
        let obj = raw.as_object().expect("artifact object");
        for key in [
            "schema_version",
            "generated_at",
            "config",
            "standings",
            "domain_scores",
            "tasks",
            "trials",
            "failure_mix",
            "args_health",
        ] {
            assert!(obj.contains_key(key), "missing {key}");
        }
        assert_eq!(raw["standings"][0]["overall"]["p4"], json!(null));
        assert_eq!(raw["tasks"][0]["pass_at"]["p4"], json!(0.0));
    }

    #[test]
    fn summary_renders_undefined_as_na_not_zero() {
        let md = render_summary_md(&artifact());
        assert!(md.contains("| 1 | m1 | 0.500 | 0.167 | n/a |"));
        assert!(md.contains("| 2 | m2 | n/a | n/a | n/a |"));
        assert!(md.contains("| Model | retail | airline |"));
        assert!(md.contains("| m1 | 0.500 | n/a |"));
        assert!(!md.contains("## Failure mix"));
    }

    #[test]
    fn summary_escapes_pipes_in_labels() {
        let mut a = artifact();
        a.standings[0].model = "GPT | tools".to_string();
        a.domain_scores[0].model = "GPT | tools".to_string();
        a.domains[1] = "air|line".to_string();
        a.args_health = vec![ArgsHealthRow {
            model: "GPT | tools".to_string(),
            runs: 2,
            error_runs: 1,
            error_rate: 0.5,
            avg_errors_per_run: 0.5,
        }];

        let md = render_summary_md(&a);
        assert!(md.contains("| 1 | GPT \\| tools | 0.500 | 0.167 | n/a |"));
        assert!(md.contains("| Model | retail | air\\|line |"));
        assert!(md.contains("| GPT \\| tools | 0.500 | n/a |"));
        assert!(md.contains("| GPT \\| tools | 2 | 1 | 50.0% | 0.50 |"));
        assert!(!md.contains("GPT | tools"));
    }

    #[test]
    fn text_cells_flatten_line_breaks() {
        assert_eq!(text_cell("a|b\nc"), "a\\|b c");
    }
}
