//! Automaton Auditor CLI
//!
//! The `auditor` command grades a repository and its report against a rubric.
//!
//! ## Commands
//!
//! - `run`: investigate, deliberate, synthesize, and persist a report
//! - `render`: re-render a persisted JSON report as markdown
//! - `rubric`: validate a rubric file and list its dimensions

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn, Level};

use auditor_core::reporting::read_artifact;
use auditor_core::{
    render_report_md, AuditConfig, AuditContext, AuditGraph, EvaluatorKind, ReportArtifact,
    ReportStore, Rubric, Subject,
};

#[derive(Parser)]
#[command(name = "auditor")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Automaton Auditor: rubric-driven repository audits", long_about = None)]
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
    /// Audit a repository (and optional report) against a rubric
    Run {
        /// Repository URL or local checkout path
        ///
        /// Paths cited by the report are only verified against a local
        /// checkout; with a URL the citation check reports `unknown`.
        #[arg(long, env = "AUDITOR_REPO")]
        repo: String,

        /// Accompanying report (PDF, markdown or text)
        #[arg(long, env = "AUDITOR_REPORT")]
        report: Option<PathBuf>,

        /// Rubric JSON file
        #[arg(long, default_value = "rubric/rubric.json")]
        rubric: PathBuf,

        /// Output directory (overrides AUDITOR_OUTPUT_DIR)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Judge backend: heuristic or llm (overrides AUDITOR_EVALUATOR)
        #[arg(long)]
        evaluator: Option<EvaluatorKind>,

        /// Print the rendered report to stdout
        #[arg(long)]
        print: bool,
    },

    /// Render a persisted JSON report as markdown
    Render {
        /// Path to an audit_report*.json file
        path: PathBuf,
    },

    /// Validate a rubric and list its dimensions
    Rubric {
        /// Path to the rubric JSON file
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    auditor_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Run {
            repo,
            report,
            rubric,
            out,
            evaluator,
            print,
        } => cmd_run(repo, report, &rubric, out, evaluator, print).await,
        Commands::Render { path } => cmd_render(&path),
        Commands::Rubric { path } => cmd_rubric(&path),
    }
}

async fn cmd_run(
    repo: String,
    report: Option<PathBuf>,
    rubric_path: &Path,
    out: Option<PathBuf>,
    evaluator: Option<EvaluatorKind>,
    print: bool,
) -> Result<()> {
    let mut config = AuditConfig::from_env().context("Failed to read configuration")?;
    if let Some(dir) = out {
        config.output_dir = dir;
    }
    if let Some(kind) = evaluator {
        config.evaluator = kind;
    }

    let rubric = Rubric::load(rubric_path)
        .with_context(|| format!("Failed to load rubric {:?}", rubric_path))?;
    if rubric.is_empty() {
        warn!("rubric has no dimensions; the report will be empty");
    }

    let mut subject = Subject::new(repo);
    if let Some(path) = report {
        subject = subject.with_report(path);
    }

    info!(evaluator = %config.evaluator, dimensions = rubric.dimensions.len(), "starting audit");
    let graph = AuditGraph::standard(&config).context("Failed to assemble audit graph")?;
    let outcome = graph
        .run(AuditContext::new(subject, rubric))
        .await
        .context("Audit run failed")?;

    let artifact = ReportArtifact::new(outcome.run_id, outcome.report)?;
    let saved = ReportStore::new(&config.output_dir).save(&artifact)?;

    let report = &artifact.report;
    println!("Run:           {}", artifact.run_id);
    println!("Overall score: {:.2}/5.0", report.overall_score);
    for c in &report.criteria {
        let marker = if c.dissent_summary.is_some() { " (dissent)" } else { "" };
        println!("  {:<40} {}/5{}", c.dimension_name, c.final_score, marker);
    }
    if !report.diagnostics.missing_evidence.is_empty() {
        println!(
            "Missing evidence: {}",
            report.diagnostics.missing_evidence.join(", ")
        );
    }
    println!("Report:        {}", saved.markdown.display());
    println!("JSON:          {}", saved.json.display());

    if print {
        println!();
        print!("{}", render_report_md(report));
    }
    Ok(())
}

fn cmd_render(path: &Path) -> Result<()> {
    let artifact = read_artifact(path)?;
    print!("{}", render_report_md(&artifact.report));
    Ok(())
}

fn cmd_rubric(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("rubric not found: {:?}", path);
    }
    let rubric = Rubric::load(path).with_context(|| format!("Failed to load rubric {:?}", path))?;
    println!("{} dimension(s)", rubric.dimensions.len());
    for d in &rubric.dimensions {
        println!("  {:<32} {:<12} {}", d.id, d.target_artifact.to_string(), d.display_name());
    }
    Ok(())
}
