//! Domain and overall roll-up, model ranking, and the supplementary
//! failure-mix and argument-health tables.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::passk::{PassAtK, TaskAggregate};
use crate::pipeline::ScoredTrial;
use crate::verdict::FailureTag;

// ---------------------------------------------------------------------------
// Averages
// ---------------------------------------------------------------------------

/// Mean of the defined values; `None` when nothing is defined.
pub fn mean_defined(values: impl IntoIterator<Item = Option<f64>>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

fn mean_pass_at<'a>(items: impl Iterator<Item = &'a PassAtK> + Clone) -> PassAtK {
    PassAtK {
        p1: mean_defined(items.clone().map(|p| p.p1)),
        p2: mean_defined(items.clone().map(|p| p.p2)),
        p4: mean_defined(items.map(|p| p.p4)),
    }
}

/// Macro-averaged scores of one model in one domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainScore {
    pub model: String,
    pub domain: String,
    /// Tasks contributing to the domain (defined or not).
    pub tasks: usize,
    pub pass_at: PassAtK,
}

/// Per (model, domain) averages over tasks, in `models` × `domains` order.
/// Pairs without any task are omitted.
pub fn domain_scores(
    aggregates: &[TaskAggregate],
    models: &[String],
    domains: &[String],
) -> Vec<DomainScore> {
    let mut out = Vec::new();
    for model in models {
        for domain in domains {
            let tasks: Vec<&TaskAggregate> = aggregates
                .iter()
                .filter(|a| &a.model == model && &a.domain == domain)
                .collect();
            if tasks.is_empty() {
                continue;
            }
            out.push(DomainScore {
                model: model.clone(),
                domain: domain.clone(),
                tasks: tasks.len(),
                pass_at: mean_pass_at(tasks.iter().map(|a| &a.pass_at)),
            });
        }
    }
    out
}

/// Equal-weight mean of a model's domain scores.
pub fn overall_score(model: &str, scores: &[DomainScore]) -> PassAtK {
    mean_pass_at(
        scores
            .iter()
            .filter(|s| s.model == model)
            .map(|s| &s.pass_at),
    )
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

/// A model's overall scores and rank (1 = best; tied models share a rank).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStanding {
    pub model: String,
    pub overall: PassAtK,
    pub rank: usize,
}

/// Undefined sorts below every defined value.
fn cmp_value(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

/// Lexicographic comparison on (P@1, P@2, P@4).
pub fn compare_keys(a: &PassAtK, b: &PassAtK) -> Ordering {
    a.values()
        .into_iter()
        .zip(b.values())
        .map(|(x, y)| cmp_value(x, y))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Order models best-first. Ties keep input order.
pub fn rank_models(overall: Vec<(String, PassAtK)>) -> Vec<ModelStanding> {
    let ranks: Vec<usize> = overall
        .iter()
        .map(|(_, key)| {
            1 + overall
                .iter()
                .filter(|(_, other)| compare_keys(other, key).is_gt())
                .count()
        })
        .collect();

    let mut standings: Vec<ModelStanding> = overall
        .into_iter()
        .zip(ranks)
        .map(|((model, overall), rank)| ModelStanding {
            model,
            overall,
            rank,
        })
        .collect();
    standings.sort_by(|a, b| compare_keys(&b.overall, &a.overall));
    standings
}

// ---------------------------------------------------------------------------
// Supplementary tables
// ---------------------------------------------------------------------------

/// Failed-trial counts per failure tag for one model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureMix {
    pub model: String,
    pub failed: usize,
    /// Every tag is present, zero counts included.
    pub counts: BTreeMap<FailureTag, usize>,
}

fn models_in_order(trials: &[ScoredTrial]) -> Vec<&str> {
    let mut seen: Vec<&str> = Vec::new();
    for t in trials {
        if !seen.contains(&t.key.model.as_str()) {
            seen.push(&t.key.model);
        }
    }
    seen
}

/// Failure taxonomy counts per model, in first-seen model order.
pub fn failure_mix(trials: &[ScoredTrial]) -> Vec<FailureMix> {
    models_in_order(trials)
        .into_iter()
        .map(|model| {
            let mut counts: BTreeMap<FailureTag, usize> =
                FailureTag::ALL.into_iter().map(|t| (t, 0)).collect();
            let mut failed = 0;
            for tag in trials
                .iter()
                .filter(|t| t.key.model == model)
                .filter_map(|t| t.verdict.failure_tag)
            {
                failed += 1;
                *counts.entry(tag).or_default() += 1;
            }
            FailureMix {
                model: model.to_string(),
                failed,
                counts,
            }
        })
        .collect()
}

/// Argument-recovery health for one model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgsHealthRow {
    pub model: String,
    pub runs: usize,
    /// Runs with at least one argument error.
    pub error_runs: usize,
    pub error_rate: f64,
    pub avg_errors_per_run: f64,
}

/// Argument health per model, in first-seen model order.
pub fn args_health(trials: &[ScoredTrial]) -> Vec<ArgsHealthRow> {
    models_in_order(trials)
        .into_iter()
        .map(|model| {
            let (runs, error_runs, errors) = trials
                .iter()
                .filter(|t| t.key.model == model)
                .fold((0usize, 0usize, 0usize), |(r, er, e), t| {
                    let n = t.verdict.args_error_count;
                    (r + 1, er + usize::from(n > 0), e + n)
                });
            let denom = runs.max(1) as f64;
            ArgsHealthRow {
                model: model.to_string(),
                runs,
                error_runs,
                error_rate: error_runs as f64 / denom,
                avg_errors_per_run: errors as f64 / denom,
            }
        })
        .collect()
}
