//! Synthesis output: per-criterion verdicts and the run-level report.

use serde::{Deserialize, Serialize};

use super::opinion::Opinion;

/// Arbitration rules, listed in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisRule {
    /// Penalise success claims contradicted by confident negative evidence.
    Evidence,
    /// Pull a repository verdict toward a confirmed-working pragmatic signal.
    Functionality,
    /// Cap the verdict when the adversarial judge reports a security risk.
    Security,
}

impl std::fmt::Display for SynthesisRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SynthesisRule::Evidence => "Rule of Evidence",
            SynthesisRule::Functionality => "Rule of Functionality",
            SynthesisRule::Security => "Rule of Security",
        };
        write!(f, "{s}")
    }
}

/// Intermediate aggregate after each rule, before rounding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreTrace {
    pub base_mean: f64,
    pub after_evidence: f64,
    pub after_functionality: f64,
    pub after_security: f64,
}

/// Final verdict on one rubric dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionResult {
    pub dimension_id: String,
    pub dimension_name: String,
    /// Integer verdict, 1–5.
    pub final_score: u8,
    /// Every opinion considered, in canonical judge order.
    pub judge_opinions: Vec<Opinion>,
    /// Present iff the raw score spread met the dissent threshold.
    pub dissent_summary: Option<String>,
    pub remediation: String,
    /// Rules that fired, in firing order.
    pub applied_rules: Vec<SynthesisRule>,
    pub score_trace: ScoreTrace,
}

/// Observability trail attached to a report.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunDiagnostics {
    /// Dimensions for which no investigator produced evidence.
    pub missing_evidence: Vec<String>,
    /// Dimensions with no opinions; they have no criterion result.
    pub skipped_dimensions: Vec<String>,
    /// Sentinel records substituted for failed collaborator calls.
    pub degraded_records: usize,
    /// The executive summary is the templated fallback.
    pub summary_fallback: bool,
}

/// Run-level aggregate produced by the synthesis engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Subject under audit, e.g. the repository reference.
    pub subject_id: String,
    pub executive_summary: String,
    /// Unweighted mean of `final_score`; `0.0` with no criteria.
    pub overall_score: f64,
    /// Results in rubric order.
    pub criteria: Vec<CriterionResult>,
    pub remediation_plan: String,
    #[serde(default)]
    pub diagnostics: RunDiagnostics,
}

impl Report {
    pub fn criterion(&self, dimension_id: &str) -> Option<&CriterionResult> {
        self.criteria.iter().find(|c| c.dimension_id == dimension_id)
    }
}
