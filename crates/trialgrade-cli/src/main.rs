//! trialgrade - repeated-trial agent benchmark scorer
//!
//! ## Commands
//!
//! - `report`: ingest simulation files, score every trial, write artifacts
//! - `recover-args`: show how a raw tool-call payload is recovered
//! - `verify`: check a written report against its digest

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::{info, Level};

use trialgrade_core::metrics::METRICS;
use trialgrade_core::obs::ReportSpan;
use trialgrade_core::recovery::DEFAULT_EXCERPT_CHARS;
use trialgrade_core::{
    build_report, load_simulation_dir, read_report_json, recover_tool_arguments,
    render_pass_value, write_report_json, write_summary_md, ReportArtifact, ScoringConfig,
};

#[derive(Parser)]
#[command(name = "trialgrade")]
#[command(version = trialgrade_core::VERSION)]
#[command(about = "Score repeated-trial agent benchmark runs", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score every simulation file in a directory and write report artifacts
    Report {
        /// Directory containing simulation result files (*.json)
        #[arg(long, env = "TRIALGRADE_INPUT_DIR")]
        input_dir: PathBuf,

        /// Scoring config (TOML); defaults apply when omitted
        #[arg(long, env = "TRIALGRADE_CONFIG")]
        config: Option<PathBuf>,

        /// Output directory for report.json, report.digest and summary.md
        #[arg(short, long, env = "TRIALGRADE_OUTPUT", default_value = "trialgrade-report")]
        output: PathBuf,

        /// Score a single agent LLM only
        #[arg(long)]
        model_filter: Option<String>,

        /// Also write a Markdown summary
        #[arg(long)]
        summary: bool,
    },

    /// Recover a raw tool-call argument payload and print the result as JSON
    RecoverArgs {
        /// Raw argument text as emitted by the model
        raw: String,

        /// Tool name used to label parse failures
        #[arg(long, default_value = "")]
        tool: String,
    },

    /// Verify a written report against its digest
    Verify {
        /// Directory containing report.json and report.digest
        #[arg(default_value = "trialgrade-report")]
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    trialgrade_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Report {
            input_dir,
            config,
            output,
            model_filter,
            summary,
        } => cmd_report(
            &input_dir,
            config.as_deref(),
            &output,
            model_filter.as_deref(),
            summary,
        ),
        Commands::RecoverArgs { raw, tool } => cmd_recover_args(&raw, &tool),
        Commands::Verify { dir } => cmd_verify(&dir),
    }
}

fn load_config(path: Option<&Path>, model_filter: Option<&str>) -> Result<ScoringConfig> {
    let config = match path {
        Some(path) => ScoringConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ScoringConfig::default(),
    };
    Ok(match model_filter {
        Some(llm) => config.with_model_filter(llm),
        None => config,
    })
}

fn cmd_report(
    input_dir: &Path,
    config_path: Option<&Path>,
    output: &Path,
    model_filter: Option<&str>,
    summary: bool,
) -> Result<()> {
    let config = load_config(config_path, model_filter)?;
    let _span = ReportSpan::enter(&input_dir.display().to_string());

    let run = load_simulation_dir(input_dir, &config)
        .with_context(|| format!("Failed to ingest {}", input_dir.display()))?;
    info!(
        files = run.files_read,
        skipped = run.skipped_files,
        trials = run.trials.len(),
        "ingested simulation files"
    );
    if run.trials.is_empty() {
        anyhow::bail!(
            "No trials found in {} (skipped {} file(s))",
            input_dir.display(),
            run.skipped_files
        );
    }

    let report = build_report(&run, &config);
    let artifact = ReportArtifact::new(
        &report,
        &config,
        run.files_read,
        run.skipped_files,
        chrono::Utc::now(),
    );

    let path = write_report_json(output, &artifact)
        .with_context(|| format!("Failed to write report to {}", output.display()))?;
    println!("Report:  {}", path.display());
    if summary {
        let md = write_summary_md(output, &artifact).context("Failed to write summary")?;
        println!("Summary: {}", md.display());
    }

    println!();
    println!(
        "{:<6} {:<32} {:>20} {:>20} {:>20}",
        "Rank", "Model", "Pass@1", "Pass@2", "Pass@4"
    );
    for s in &artifact.standings {
        println!(
            "{:<6} {:<32} {:>20} {:>20} {:>20}",
            s.rank,
            s.model,
            render_pass_value(s.overall.p1),
            render_pass_value(s.overall.p2),
            render_pass_value(s.overall.p4)
        );
    }

    METRICS.flush();
    Ok(())
}

fn cmd_recover_args(raw: &str, tool: &str) -> Result<()> {
    // Recover the payload exactly as a model would have sent it: a string.
    let recovered =
        recover_tool_arguments(&Value::String(raw.to_string()), tool, DEFAULT_EXCERPT_CHARS);
    let out = json!({
        "arguments": recovered.arguments,
        "health": recovered.health,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn cmd_verify(dir: &Path) -> Result<()> {
    let artifact = read_report_json(dir)
        .with_context(|| format!("Report in {} failed verification", dir.display()))?;
    println!(
        "Verified report {} ({} models, {} trials, generated {})",
        dir.display(),
        artifact.models.len(),
        artifact.trials.len(),
        artifact.generated_at.to_rfc3339()
    );
    Ok(())
}
