//! Document investigator: reads the accompanying report and checks its claims.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::domain::{Evidence, Presence, RubricDimension, TargetArtifact};
use crate::execution::{CollaboratorError, CollaboratorResult};
use crate::orchestration::Subject;

use super::{dimension_keywords, InvestigationSession, Investigator};

/// Concepts a report with theoretical depth is expected to explain.
pub const DEPTH_CONCEPTS: &[(&str, &[&str])] = &[
    ("Dialectical Synthesis", &["dialectical synthesis", "dialectic"]),
    ("Fan-In / Fan-Out", &["fan-in", "fan-out", "fan in", "fan out"]),
    ("Metacognition", &["metacognition", "metacognitive"]),
    ("State Synchronization", &["state synchronization", "state synchronisation", "reducer"]),
];

/// Reads the report (markdown, text, or PDF via `pdftotext`).
#[derive(Debug, Clone, Copy, Default)]
pub struct DocInvestigator;

#[async_trait]
impl Investigator for DocInvestigator {
    fn name(&self) -> &str {
        "doc_analyst"
    }

    fn artifact(&self) -> TargetArtifact {
        TargetArtifact::PdfReport
    }

    #[instrument(skip(self), fields(report = ?subject.report))]
    async fn open(&self, subject: &Subject) -> CollaboratorResult<Box<dyn InvestigationSession>> {
        let repo_root = subject.local_repo().map(Path::to_path_buf);

        let Some(path) = subject.report.clone() else {
            return Ok(Box::new(DocSession {
                report: None,
                repo_root,
            }));
        };

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            debug!("report path does not exist");
            return Ok(Box::new(DocSession {
                report: None,
                repo_root,
            }));
        }

        let text = read_report(&path).await?;
        if text.trim().is_empty() {
            return Err(CollaboratorError::InvalidResponse(format!(
                "no text extracted from {}",
                path.display()
            )));
        }
        debug!(chars = text.len(), "report loaded");
        Ok(Box::new(DocSession {
            report: Some(LoadedReport { path, text }),
            repo_root,
        }))
    }
}

/// Extract the report text. PDFs go through `pdftotext`.
pub async fn read_report(path: &Path) -> CollaboratorResult<String> {
    let is_pdf = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        return Ok(tokio::fs::read_to_string(path).await?);
    }

    let output = Command::new("pdftotext")
        .arg("-layout")
        .arg(path)
        .arg("-")
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| CollaboratorError::Unavailable(format!("failed to run pdftotext: {e}")))?;
    if !output.status.success() {
        return Err(CollaboratorError::Unavailable(format!(
            "pdftotext failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

struct LoadedReport {
    path: PathBuf,
    text: String,
}

/// The report text plus the repository used to verify cited paths.
pub struct DocSession {
    report: Option<LoadedReport>,
    repo_root: Option<PathBuf>,
}

#[async_trait]
impl InvestigationSession for DocSession {
    async fn examine(&self, dimension: &RubricDimension) -> CollaboratorResult<Vec<Evidence>> {
        let Some(report) = &self.report else {
            return Ok(vec![Evidence::new(
                format!("Analyze report for {}", dimension.display_name()),
                Presence::Absent,
                "Missing",
                "No report found",
                1.0,
            )]);
        };
        let location = report.path.display().to_string();

        let evidence = match dimension.id.as_str() {
            "theoretical_depth" => theoretical_depth(&report.text, &location),
            "report_accuracy" => {
                // Each cited path is a blocking stat against the checkout.
                let text = report.text.clone();
                let repo_root = self.repo_root.clone();
                tokio::task::spawn_blocking(move || {
                    report_accuracy(&text, &location, repo_root.as_deref())
                })
                .await
                .map_err(|e| {
                    CollaboratorError::Unavailable(format!("citation check task failed: {e}"))
                })?
            }
            _ => keyword_scan(&report.text, &location, dimension),
        };
        Ok(vec![evidence])
    }
}

/// Coverage of [`DEPTH_CONCEPTS`]; a concept named only once counts as dropped.
pub fn theoretical_depth(text: &str, location: &str) -> Evidence {
    let lower = text.to_lowercase();
    let mut explained = Vec::new();
    let mut dropped = Vec::new();
    let mut missing = Vec::new();
    let mut excerpts = Vec::new();

    for (concept, terms) in DEPTH_CONCEPTS {
        let mentions: usize = terms.iter().map(|t| lower.matches(t).count()).sum();
        match mentions {
            0 => missing.push(*concept),
            1 => dropped.push(*concept),
            _ => explained.push(*concept),
        }
        if let Some(excerpt) = terms.iter().find_map(|t| excerpt_around(text, &lower, t, 160)) {
            excerpts.push(format!("[{concept}] {excerpt}"));
        }
    }

    let rationale = format!(
        "Explained: [{}]. Mentioned once: [{}]. Missing: [{}].",
        explained.join(", "),
        dropped.join(", "),
        missing.join(", ")
    );

    Evidence::new(
        "Theoretical Depth",
        Presence::from_bool(explained.len() >= 3),
        location,
        rationale,
        0.7,
    )
    .with_content(excerpts.join("\n"))
}

const PATH_PATTERN: &str =
    r"(?:[A-Za-z0-9_.-]+/)+[A-Za-z0-9_.-]+\.(?:py|rs|md|json|toml|ya?ml|txt|ts|js)\b";

fn path_pattern() -> Option<&'static Regex> {
    static PATHS: OnceLock<Option<Regex>> = OnceLock::new();
    PATHS
        .get_or_init(|| match Regex::new(PATH_PATTERN) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!(error = %e, "path pattern failed to compile; citation extraction disabled");
                None
            }
        })
        .as_ref()
}

/// Unique file paths cited in the text, in first-mention order.
pub fn extract_file_paths(text: &str) -> Vec<String> {
    let Some(pattern) = path_pattern() else {
        return Vec::new();
    };
    let mut seen = BTreeSet::new();
    pattern
        .find_iter(text)
        .map(|m| m.as_str().trim_start_matches("./").to_string())
        .filter(|p| !p.starts_with("http") && seen.insert(p.clone()))
        .collect()
}

/// Cited paths checked against the repository checkout.
pub fn report_accuracy(text: &str, location: &str, repo_root: Option<&Path>) -> Evidence {
    const GOAL: &str = "Citation Check";
    let paths = extract_file_paths(text);

    let Some(root) = repo_root else {
        return Evidence::new(
            GOAL,
            Presence::Unknown,
            location,
            format!(
                "Report cites {} path(s) but no local repository is available to verify them.",
                paths.len()
            ),
            0.3,
        )
        .with_content(paths.join("\n"));
    };

    let hallucinated: Vec<&String> = paths.iter().filter(|p| !root.join(p).exists()).collect();
    let verified = paths.len() - hallucinated.len();
    let rationale = format!(
        "Verified {verified} path(s). Hallucinated: [{}].",
        hallucinated
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    Evidence::new(
        GOAL,
        Presence::from_bool(!paths.is_empty() && hallucinated.is_empty()),
        location,
        rationale,
        0.8,
    )
    .with_content(paths.join("\n"))
}

/// Fallback check: does the report discuss the dimension at all.
pub fn keyword_scan(text: &str, location: &str, dimension: &RubricDimension) -> Evidence {
    let lower = text.to_lowercase();
    let keywords = dimension_keywords(dimension);
    let hits: Vec<&str> = keywords
        .iter()
        .filter(|k| lower.contains(k.as_str()))
        .map(String::as_str)
        .collect();
    let excerpt = hits
        .first()
        .and_then(|k| excerpt_around(text, &lower, k, 300))
        .unwrap_or_default();

    Evidence::new(
        format!("Report discusses {}", dimension.display_name()),
        if hits.is_empty() {
            Presence::Unknown
        } else {
            Presence::Present
        },
        location,
        format!("Keywords found: [{}] of [{}].", hits.join(", "), keywords.join(", ")),
        0.4,
    )
    .with_content(excerpt)
}

/// Up to `radius` characters either side of the first match of `needle`.
fn excerpt_around(text: &str, lower: &str, needle: &str, radius: usize) -> Option<String> {
    let byte_pos = lower.find(needle)?;
    // `lower` and `text` can differ in byte length; work in chars.
    let char_pos = lower[..byte_pos].chars().count();
    let start = char_pos.saturating_sub(radius);
    let len = needle.chars().count() + 2 * radius;
    let excerpt: String = text.chars().skip(start).take(len).collect();
    Some(excerpt.split_whitespace().collect::<Vec<_>>().join(" "))
}
