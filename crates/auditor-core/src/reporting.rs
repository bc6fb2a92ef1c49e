//! Report rendering and on-disk persistence.
//!
//! Rendering is a pure function of the [`Report`]; persistence writes a
//! timestamped markdown/JSON pair plus unsuffixed "latest" copies.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;
use uuid::Uuid;

use crate::domain::Report;

pub const SCHEMA_VERSION: &str = "1.0";
const REPORT_STEM: &str = "audit_report";

/// Persisted envelope around a [`Report`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportArtifact {
    pub schema_version: String,
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    /// SHA-256 of the serialized criteria; equal inputs give equal digests.
    pub criteria_digest: String,
    pub report: Report,
}

impl ReportArtifact {
    pub fn new(run_id: Uuid, report: Report) -> Result<Self> {
        Ok(Self {
            schema_version: SCHEMA_VERSION.to_string(),
            run_id,
            generated_at: Utc::now(),
            criteria_digest: criteria_digest(&report)?,
            report,
        })
    }
}

/// Hex SHA-256 over the JSON encoding of `report.criteria`.
pub fn criteria_digest(report: &Report) -> Result<String> {
    let bytes = serde_json::to_vec(&report.criteria).context("serialize criteria")?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Render the report as markdown.
pub fn render_report_md(report: &Report) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Audit Report: {}\n\n", report.subject_id));
    out.push_str("## Executive Summary\n\n");
    out.push_str(&format!("{}\n\n", report.executive_summary));
    out.push_str(&format!(
        "**Overall Score**: {:.2}/5.0\n\n",
        report.overall_score
    ));

    out.push_str("## Criterion Breakdown\n\n");
    if report.criteria.is_empty() {
        out.push_str("No criteria were evaluated.\n\n");
    }
    for c in &report.criteria {
        out.push_str(&format!("### {}\n\n", c.dimension_name));
        out.push_str(&format!("**Final Score**: {}/5\n\n", c.final_score));
        if let Some(dissent) = &c.dissent_summary {
            out.push_str(&format!("> **Dissent**: {dissent}\n\n"));
        }
        if !c.applied_rules.is_empty() {
            let rules = c
                .applied_rules
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!("**Rules Applied**: {rules}\n\n"));
        }
        out.push_str(&format!("**Remediation**: {}\n\n", c.remediation));
        out.push_str("Opinions:\n");
        for op in &c.judge_opinions {
            out.push_str(&format!(
                "- **{}** ({}/5): {}\n",
                op.judge, op.score, op.argument
            ));
        }
        out.push('\n');
    }

    out.push_str("## Remediation Plan\n\n");
    if report.remediation_plan.is_empty() {
        out.push_str("No remediation required.\n");
    } else {
        out.push_str(&format!("{}\n", report.remediation_plan));
    }

    let d = &report.diagnostics;
    let has_diagnostics = !d.missing_evidence.is_empty()
        || !d.skipped_dimensions.is_empty()
        || d.degraded_records > 0
        || d.summary_fallback;
    if has_diagnostics {
        out.push_str("\n## Run Diagnostics\n\n");
        if !d.missing_evidence.is_empty() {
            out.push_str(&format!(
                "- dimensions without evidence: {}\n",
                d.missing_evidence.join(", ")
            ));
        }
        if !d.skipped_dimensions.is_empty() {
            out.push_str(&format!(
                "- dimensions skipped: {}\n",
                d.skipped_dimensions.join(", ")
            ));
        }
        if d.degraded_records > 0 {
            out.push_str(&format!("- degraded records: {}\n", d.degraded_records));
        }
        if d.summary_fallback {
            out.push_str("- executive summary: templated fallback\n");
        }
    }
    out
}

/// Paths written by [`ReportStore::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedReport {
    pub markdown: PathBuf,
    pub json: PathBuf,
    pub latest_markdown: PathBuf,
    pub latest_json: PathBuf,
}

/// Directory of persisted reports.
#[derive(Debug, Clone)]
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Label used in file names: `YYYYMMDD_HHMMSS` of `generated_at`.
    pub fn label(artifact: &ReportArtifact) -> String {
        artifact.generated_at.format("%Y%m%d_%H%M%S").to_string()
    }

    /// Write timestamped and latest markdown/JSON copies.
    pub fn save(&self, artifact: &ReportArtifact) -> Result<SavedReport> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create {:?}", self.dir))?;

        let label = Self::label(artifact);
        let markdown = render_report_md(&artifact.report);
        let json = serde_json::to_string_pretty(artifact).context("serialize report artifact")?;

        let saved = SavedReport {
            markdown: self.dir.join(format!("{REPORT_STEM}_{label}.md")),
            json: self.dir.join(format!("{REPORT_STEM}_{label}.json")),
            latest_markdown: self.dir.join(format!("{REPORT_STEM}.md")),
            latest_json: self.dir.join(format!("{REPORT_STEM}.json")),
        };
        for (path, body) in [
            (&saved.markdown, &markdown),
            (&saved.json, &json),
            (&saved.latest_markdown, &markdown),
            (&saved.latest_json, &json),
        ] {
            std::fs::write(path, body).with_context(|| format!("write {:?}", path))?;
        }

        info!(path = %saved.markdown.display(), run_id = %artifact.run_id, "report saved");
        Ok(saved)
    }

    /// The most recently saved artifact.
    pub fn load_latest(&self) -> Result<ReportArtifact> {
        read_artifact(&self.dir.join(format!("{REPORT_STEM}.json")))
    }

    /// A timestamped artifact by its `YYYYMMDD_HHMMSS` label.
    pub fn load(&self, label: &str) -> Result<ReportArtifact> {
        read_artifact(&self.dir.join(format!("{REPORT_STEM}_{label}.json")))
    }
}

/// Read a persisted artifact from any path.
pub fn read_artifact(path: &Path) -> Result<ReportArtifact> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("parse {:?}", path))
}
