//! End-to-end scoring: normalize and judge every trial in parallel, then
//! aggregate per task, per domain and per model.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::domain::{GroundTruth, GroundTruthIndex, TrialKey, TrialRecord};
use crate::ingest::IngestedRun;
use crate::metrics::METRICS;
use crate::normalize::{normalize, NormalizeOptions, NormalizedView};
use crate::obs;
use crate::passk::TaskAggregate;
use crate::rollup::{
    args_health, domain_scores, failure_mix, overall_score, rank_models, ArgsHealthRow,
    DomainScore, FailureMix, ModelStanding,
};
use crate::verdict::{evaluate, format_call, Verdict};

/// One trial with its verdict, normalized transcript and the task context it
/// was judged against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredTrial {
    pub key: TrialKey,
    pub verdict: Verdict,
    pub view: NormalizedView,
    /// Scenario instructions, or the first user utterance when none were recorded.
    pub request: String,
    pub user_scenario: Option<String>,
    pub ground_truth_summary: String,
    /// Required actions rendered as `name(argsJSON)`.
    pub ground_truth_actions: Vec<String>,
    pub reward_basis: Vec<String>,
}

/// Normalize and judge a single trial.
pub fn score_trial(
    trial: &TrialRecord,
    truth: &GroundTruth,
    options: NormalizeOptions,
) -> ScoredTrial {
    let view = normalize(trial, options);
    let verdict = evaluate(trial, truth, &view);

    let run_id = trial.key.run_id();
    for issue in &view.args_health.issues {
        obs::emit_args_recovery_failed(&run_id, &issue.tool, &issue.error);
    }
    if verdict.reward_inconsistent {
        obs::emit_reward_inconsistent(&run_id, verdict.termination.as_str(), verdict.reward);
    }
    obs::emit_trial_scored(&run_id, verdict.passed, verdict.failure_label());
    METRICS.inc_trials_scored();
    METRICS.add_arg_errors(view.args_health.error_count as u64);

    let user_scenario = truth.request_text();
    let request = user_scenario
        .clone()
        .unwrap_or_else(|| view.first_user_text.clone());
    ScoredTrial {
        key: trial.key.clone(),
        verdict,
        view,
        request,
        user_scenario,
        ground_truth_summary: truth.summary(),
        ground_truth_actions: truth
            .actions
            .iter()
            .map(|a| format_call(&a.name, &a.arguments))
            .collect(),
        reward_basis: trial.reward_info.normalized_basis(),
    }
}

/// Score every trial, in input order. Trials whose task has no ground truth
/// are judged against an empty one.
pub fn score_trials(
    trials: &[TrialRecord],
    index: &GroundTruthIndex,
    options: NormalizeOptions,
) -> Vec<ScoredTrial> {
    let mut warned = HashSet::new();
    let jobs: Vec<(&TrialRecord, Arc<GroundTruth>)> = trials
        .iter()
        .map(|trial| {
            let key = &trial.key;
            let truth = index.get(&key.domain, &key.task_id).unwrap_or_else(|| {
                if warned.insert((key.domain.clone(), key.task_id.clone())) {
                    obs::emit_ground_truth_missing(&key.domain, &key.task_id);
                }
                Arc::new(GroundTruth::new(key.task_id.clone()))
            });
            (trial, truth)
        })
        .collect();

    jobs.par_iter()
        .map(|(trial, truth)| score_trial(trial, truth, options))
        .collect()
}

/// Group scored trials by (model, domain, task) in first-seen order.
pub fn aggregate_tasks(scored: &[ScoredTrial]) -> Vec<TaskAggregate> {
    let mut order: Vec<(&str, &str, &str)> = Vec::new();
    let mut groups: HashMap<(&str, &str, &str), Vec<&Verdict>> = HashMap::new();
    for t in scored {
        let group = (
            t.key.model.as_str(),
            t.key.domain.as_str(),
            t.key.task_id.as_str(),
        );
        groups
            .entry(group)
            .or_insert_with(|| {
                order.push(group);
                Vec::new()
            })
            .push(&t.verdict);
    }

    order
        .into_iter()
        .map(|group @ (model, domain, task_id)| {
            METRICS.inc_tasks_aggregated();
            let verdicts = groups.remove(&group).unwrap_or_default();
            TaskAggregate::from_verdicts(model, domain, task_id, verdicts)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Report assembly
// ---------------------------------------------------------------------------

/// All scoring outputs for one input set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    /// Model labels in ranking input order.
    pub models: Vec<String>,
    /// Domains in display order.
    pub domains: Vec<String>,
    pub trials: Vec<ScoredTrial>,
    pub tasks: Vec<TaskAggregate>,
    pub domain_scores: Vec<DomainScore>,
    pub standings: Vec<ModelStanding>,
    pub failure_mix: Vec<FailureMix>,
    pub args_health: Vec<ArgsHealthRow>,
}

/// `preferred` entries that occur in `seen`, then the rest of `seen`.
fn ordered(preferred: &[String], seen: &[String]) -> Vec<String> {
    let mut out: Vec<String> = preferred
        .iter()
        .filter(|p| seen.contains(p))
        .cloned()
        .collect();
    for s in seen {
        if !out.contains(s) {
            out.push(s.clone());
        }
    }
    out
}

/// Score an ingested run and roll results up.
pub fn build_report(run: &IngestedRun, config: &ScoringConfig) -> ScoreReport {
    let models = ordered(&config.labels(), &run.models_seen);
    let domains = ordered(&config.domains, &run.domains_seen);

    let mut trials = score_trials(&run.trials, &run.ground_truth, config.normalize_options());
    let position = |list: &[String], item: &str| list.iter().position(|x| x == item);
    trials.sort_by_key(|t| {
        (
            position(&models, &t.key.model),
            position(&domains, &t.key.domain),
        )
    });

    let tasks = aggregate_tasks(&trials);
    let domain_scores = domain_scores(&tasks, &models, &domains);
    let standings = rank_models(
        models
            .iter()
            .map(|m| (m.clone(), overall_score(m, &domain_scores)))
            .collect(),
    );

    obs::emit_report_generated(models.len(), trials.len(), tasks.len());
    ScoreReport {
        failure_mix: failure_mix(&trials),
        args_health: args_health(&trials),
        models,
        domains,
        trials,
        tasks,
        domain_scores,
        standings,
    }
}
