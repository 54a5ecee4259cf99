//! End-to-end scoring over simulation files on disk: ingestion, verdicts,
//! failure taxonomy, Pass^k and roll-up.

use std::path::Path;

use serde_json::{json, Value};
use trialgrade_core::{
    build_report, load_simulation_dir, FailureTag, GradeError, ModelLabel, ScoreReport,
    ScoringConfig,
};

fn call(id: &str, name: &str, raw: &str) -> Value {
    json!({
        "role": "assistant",
        "content": null,
        "tool_calls": [{"id": id, "name": name, "arguments": {}}],
        "raw_data": {"message": {"tool_calls": [
            {"id": id, "function": {"name": name, "arguments": raw}}
        ]}}
    })
}

fn sim(task: &str, trial: u32, reward: f64, termination: &str, messages: Vec<Value>) -> Value {
    json!({
        "task_id": task,
        "trial": trial,
        "reward": reward,
        "termination_reason": termination,
        "messages": messages
    })
}

fn write_run(dir: &Path, name: &str, llm: &str, domain: &str, tasks: Value, sims: Vec<Value>) {
    let body = json!({
        "info": {
            "agent_info": {"llm": llm},
            "environment_info": {"domain_name": domain}
        },
        "tasks": tasks,
        "simulations": sims
    });
    std::fs::write(dir.join(name), body.to_string()).expect("write fixture");
}

fn retail_tasks() -> Value {
    json!([
        {
            "id": "1",
            "evaluation_criteria": {
                "actions": [
                    {"name": "get_order", "arguments": {"order_id": "#W1"}},
                    {"name": "cancel_order", "arguments": {"order_id": "#W1"}}
                ]
            }
        },
        {
            "id": "2",
            "evaluation_criteria": {
                "actions": [],
                "env_assertions": [{"func_name": "assert_no_refund", "arguments": {}}]
            }
        }
    ])
}

fn config() -> ScoringConfig {
    ScoringConfig {
        models: vec![
            ModelLabel::new("gpt-x", "GPT X"),
            ModelLabel::new("claude-y", "Claude Y"),
        ],
        ..ScoringConfig::default()
    }
}

fn fixture_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    let both = || {
        vec![
            json!({"role": "user", "content": "cancel #W1"}),
            call("c1", "get_order", "{\"order_id\": \"#W1\"}"),
            json!({"role": "tool", "content": "{\"status\": \"pending\"}"}),
            call("c2", "cancel_order", "{'order_id': '#W1'}"),
            json!({"role": "assistant", "content": "Cancelled."}),
        ]
    };

    write_run(
        dir.path(),
        "a_gpt_retail.json",
        "gpt-x",
        "retail",
        retail_tasks(),
        vec![
            sim("1", 0, 1.0, "agent_stop", both()),
            sim(
                "1",
                1,
                0.0,
                "agent_stop",
                vec![call("c1", "get_order", "{oops")],
            ),
            sim(
                "1",
                2,
                0.0,
                "user_stop",
                vec![call("c1", "get_order", "{\"order_id\": \"#W1\"}")],
            ),
            sim("1", 3, 1.0, "TerminationReason.MAX_STEPS", both()),
            json!({
                "task_id": "2",
                "trial": 0,
                "reward_info": {
                    "reward": 0.0,
                    "env_assertions": [{
                        "env_assertion": {"func_name": "assert_no_refund", "arguments": {"id": 3}},
                        "met": false
                    }]
                },
                "termination_reason": "agent_stop",
                "messages": []
            }),
        ],
    );
    write_run(
        dir.path(),
        "b_gpt_airline.json",
        "gpt-x",
        "airline",
        json!([{"id": 5}]),
        vec![sim("5", 0, 1.0, "agent_stop", vec![])],
    );
    write_run(
        dir.path(),
        "c_claude_retail.json",
        "claude-y",
        "retail",
        retail_tasks(),
        vec![
            sim("1", 0, 1.0, "agent_stop", both()),
            sim("1", 1, 1.0, "agent_stop", both()),
        ],
    );
    write_run(
        dir.path(),
        "d_other_retail.json",
        "not-configured",
        "retail",
        retail_tasks(),
        vec![sim("1", 0, 1.0, "agent_stop", vec![])],
    );
    std::fs::write(dir.path().join("e_broken.json"), "{ not json").expect("write");
    std::fs::write(dir.path().join("notes.txt"), "ignored").expect("write");
    dir
}

fn report() -> (ScoreReport, usize, usize) {
    let dir = fixture_dir();
    let run = load_simulation_dir(dir.path(), &config()).expect("ingest");
    (build_report(&run, &config()), run.files_read, run.skipped_files)
}

fn close(a: Option<f64>, b: f64) -> bool {
    a.is_some_and(|a| (a - b).abs() < 1e-9)
}

#[test]
fn ingestion_counts_files() {
    let (report, files_read, skipped) = report();
    assert_eq!(files_read, 3);
    assert_eq!(skipped, 1);
    assert_eq!(report.trials.len(), 8);
    assert_eq!(report.models, vec!["GPT X", "Claude Y"]);
    assert_eq!(report.domains, vec!["retail", "airline"]);
}

#[test]
fn verdicts_carry_failure_taxonomy() {
    let (report, _, _) = report();
    let gpt: Vec<_> = report
        .trials
        .iter()
        .filter(|t| t.key.model == "GPT X" && t.key.domain == "retail")
        .collect();

    let tags: Vec<Option<FailureTag>> = gpt.iter().map(|t| t.verdict.failure_tag).collect();
    assert_eq!(
        tags,
        vec![
            None,
            Some(FailureTag::SchemaMismatch),
            Some(FailureTag::MissingRequiredActions),
            Some(FailureTag::MaxSteps),
            Some(FailureTag::EnvAssertionFailed),
        ]
    );

    let passed = gpt[0];
    assert_eq!(passed.view.first_user_text, "cancel #W1");
    assert_eq!(passed.view.final_assistant_text.as_deref(), Some("Cancelled."));
    assert_eq!(passed.view.tool_call_count, 2);
    assert_eq!(passed.view.tool_calls[1].arguments["order_id"], json!("#W1"));

    let broken = gpt[1];
    assert_eq!(broken.verdict.args_error_count, 1);
    assert!(broken.view.args_health.digest.starts_with("get_order: invalid JSON"));

    let early = gpt[3];
    assert!(early.verdict.early_termination);
    assert!(early.verdict.reward_inconsistent);
    assert!(!early.verdict.passed);

    let env = gpt[4];
    assert_eq!(
        env.verdict.failed_env_assertions,
        vec!["assert_no_refund({\"id\":3}) — unmet"]
    );
}

#[test]
fn pass_at_k_per_task_and_domain() {
    let (report, _, _) = report();
    let task = |model: &str, domain: &str, id: &str| {
        report
            .tasks
            .iter()
            .find(|t| t.model == model && t.domain == domain && t.task_id == id)
            .expect("task aggregate")
    };

    let t1 = task("GPT X", "retail", "1");
    assert_eq!((t1.n, t1.c), (4, 1));
    assert!(close(t1.pass_at.p1, 0.25));
    assert_eq!(t1.pass_at.p2, Some(0.0));
    assert_eq!(t1.pass_at.p4, Some(0.0));

    let t2 = task("GPT X", "retail", "2");
    assert_eq!((t2.n, t2.c), (1, 0));
    assert_eq!(t2.pass_at.p1, Some(0.0));
    assert_eq!(t2.pass_at.p2, None);

    let retail = report
        .domain_scores
        .iter()
        .find(|d| d.model == "GPT X" && d.domain == "retail")
        .expect("retail score");
    assert!(close(retail.pass_at.p1, 0.125));
    assert_eq!(retail.pass_at.p2, Some(0.0));
}

#[test]
fn standings_rank_models() {
    let (report, _, _) = report();
    let names: Vec<(&str, usize)> = report
        .standings
        .iter()
        .map(|s| (s.model.as_str(), s.rank))
        .collect();
    assert_eq!(names, vec![("Claude Y", 1), ("GPT X", 2)]);

    let gpt = &report.standings[1].overall;
    assert!(close(gpt.p1, 0.5625));
    assert_eq!(gpt.p2, Some(0.0));

    let claude = &report.standings[0].overall;
    assert_eq!(claude.p1, Some(1.0));
    assert_eq!(claude.p2, Some(1.0));
    assert_eq!(claude.p4, None);
}

#[test]
fn supplementary_tables() {
    let (report, _, _) = report();
    let mix = &report.failure_mix[0];
    assert_eq!(mix.model, "GPT X");
    assert_eq!(mix.failed, 4);
    assert_eq!(mix.counts[&FailureTag::SchemaMismatch], 1);
    assert_eq!(mix.counts[&FailureTag::Unknown], 0);

    let health = &report.args_health[0];
    assert_eq!(health.runs, 6);
    assert_eq!(health.error_runs, 1);
    assert!((health.avg_errors_per_run - 1.0 / 6.0).abs() < 1e-9);
}

#[test]
fn model_filter_restricts_scoring() {
    let dir = fixture_dir();
    let config = config().with_model_filter("claude-y");
    let run = load_simulation_dir(dir.path(), &config).expect("ingest");
    let report = build_report(&run, &config);
    assert_eq!(report.models, vec!["Claude Y"]);
    assert!(report.trials.iter().all(|t| t.key.model == "Claude Y"));
}

#[test]
fn task_without_id_fails_ingestion() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_run(
        dir.path(),
        "bad.json",
        "gpt-x",
        "retail",
        json!([{"evaluation_criteria": {}}]),
        vec![],
    );
    let err = load_simulation_dir(dir.path(), &config()).expect_err("missing id");
    assert!(matches!(err, GradeError::InvalidGroundTruth { .. }));
}

#[test]
fn missing_directory_is_io_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = load_simulation_dir(&dir.path().join("absent"), &config()).expect_err("absent");
    assert!(matches!(err, GradeError::Io(_)));
}

#[test]
fn absent_termination_reason_keeps_reward_verdict() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_run(
        dir.path(),
        "run.json",
        "gpt-x",
        "airline",
        json!([{"id": 9}]),
        vec![json!({"task_id": "9", "trial": 0, "reward": 1.0, "messages": []})],
    );
    let run = load_simulation_dir(dir.path(), &config()).expect("ingest");
    let report = build_report(&run, &config());
    let verdict = &report.trials[0].verdict;
    assert!(verdict.passed);
    assert!(!verdict.early_termination);
    assert!(!verdict.reward_inconsistent);
    assert_eq!(report.tasks[0].c, 1);
}
