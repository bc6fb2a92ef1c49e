//! The Chief Justice: deterministic arbitration over all opinions.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::domain::{
    AuditResult, CriterionResult, Evidence, EvidenceMap, Opinion, OpinionMap, Report,
    RubricDimension, RunDiagnostics, ValidationError,
};
use crate::obs;

use super::dissent::{dissent_summary, remediation};
use super::matcher::{AbsenceMatcher, EvidenceMatcher};
use super::policy::SynthesisPolicy;
use super::rules::{apply_rules, round_score};
use super::summary::{templated_summary, SummaryGenerator};

/// Rule engine producing one verdict per rubric dimension.
///
/// Pure with respect to its inputs: identical evidence and opinions always
/// yield identical criterion results.
#[derive(Debug, Clone)]
pub struct SynthesisEngine {
    policy: SynthesisPolicy,
    matcher: Arc<dyn EvidenceMatcher>,
}

impl Default for SynthesisEngine {
    fn default() -> Self {
        Self {
            policy: SynthesisPolicy::default(),
            matcher: Arc::new(AbsenceMatcher),
        }
    }
}

impl SynthesisEngine {
    pub fn new(policy: SynthesisPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Swap the success-claim/evidence matcher.
    pub fn with_matcher(mut self, matcher: Arc<dyn EvidenceMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn policy(&self) -> &SynthesisPolicy {
        &self.policy
    }

    /// Reject malformed records before they reach the rules.
    pub fn validate_input(&self, evidence: &EvidenceMap, opinions: &OpinionMap) -> AuditResult<()> {
        for (_, records) in evidence.iter() {
            for ev in records {
                ev.validate()?;
            }
        }

        let mut seen = HashSet::new();
        for (criterion_id, records) in opinions.iter() {
            for op in records {
                op.validate()?;
                if op.criterion_id != criterion_id {
                    return Err(ValidationError::MisfiledOpinion {
                        filed_under: criterion_id.to_string(),
                        criterion_id: op.criterion_id.clone(),
                    }
                    .into());
                }
                if !seen.insert((op.judge, criterion_id)) {
                    return Err(ValidationError::DuplicateOpinion {
                        judge: op.judge.to_string(),
                        criterion_id: criterion_id.to_string(),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Verdict for one dimension, or `None` when nobody rendered an opinion.
    pub fn judge_criterion(
        &self,
        dimension: &RubricDimension,
        opinions: &[Opinion],
        evidence: &[Evidence],
    ) -> Option<CriterionResult> {
        if opinions.is_empty() {
            return None;
        }

        let mut ordered = opinions.to_vec();
        ordered.sort_by_key(|op| op.judge);

        let outcome = apply_rules(
            &self.policy,
            self.matcher.as_ref(),
            dimension,
            &ordered,
            evidence,
        );
        let final_score = round_score(outcome.score);
        let name = dimension.display_name().to_string();

        Some(CriterionResult {
            dimension_id: dimension.id.clone(),
            dissent_summary: dissent_summary(&self.policy, &ordered, &outcome.fired),
            remediation: remediation(&self.policy, &name, &ordered),
            dimension_name: name,
            final_score,
            judge_opinions: ordered,
            applied_rules: outcome.fired,
            score_trace: outcome.trace,
        })
    }

    /// Score every dimension and assemble the report.
    ///
    /// The executive summary is the templated sentence; call
    /// [`SynthesisEngine::summarize`] to replace it with a generated one.
    #[instrument(skip_all, fields(subject = %subject_id, dimensions = dimensions.len()))]
    pub fn synthesize(
        &self,
        subject_id: &str,
        dimensions: &[RubricDimension],
        evidence: &EvidenceMap,
        opinions: &OpinionMap,
        mut diagnostics: RunDiagnostics,
    ) -> AuditResult<Report> {
        self.validate_input(evidence, opinions)?;

        let mut criteria = Vec::with_capacity(dimensions.len());
        for dimension in dimensions {
            let dim_opinions = opinions.get(&dimension.id);
            match self.judge_criterion(dimension, dim_opinions, evidence.get(&dimension.id)) {
                Some(result) => {
                    obs::emit_criterion_synthesized(
                        &result.dimension_id,
                        result.final_score,
                        &result.applied_rules,
                    );
                    criteria.push(result);
                }
                None => {
                    warn!(dimension = %dimension.id, "no opinions rendered; dimension skipped");
                    diagnostics.skipped_dimensions.push(dimension.id.clone());
                }
            }
        }

        for criterion_id in opinions.criteria() {
            if !dimensions.iter().any(|d| d.id == criterion_id) {
                debug!(criterion = %criterion_id, "opinions for unknown dimension ignored");
            }
        }

        let overall_score = if criteria.is_empty() {
            0.0
        } else {
            let total: u32 = criteria.iter().map(|c| u32::from(c.final_score)).sum();
            f64::from(total) / criteria.len() as f64
        };

        let remediation_plan = criteria
            .iter()
            .filter(|c| c.final_score < self.policy.plan_threshold)
            .map(|c| format!("- {}: {}", c.dimension_name, c.remediation))
            .collect::<Vec<_>>()
            .join("\n");

        diagnostics.summary_fallback = false;
        let mut report = Report {
            subject_id: subject_id.to_string(),
            executive_summary: String::new(),
            overall_score,
            criteria,
            remediation_plan,
            diagnostics,
        };
        report.executive_summary = templated_summary(&report);
        Ok(report)
    }

    /// Best-effort executive summary; any failure keeps the templated one.
    pub async fn summarize(&self, mut report: Report, generator: &dyn SummaryGenerator) -> Report {
        match generator.summarize(&report).await {
            Ok(text) if !text.trim().is_empty() => {
                report.executive_summary = text;
                report.diagnostics.summary_fallback = false;
            }
            Ok(_) => {
                warn!("summary generator returned empty text; using template");
                report.executive_summary = templated_summary(&report);
                report.diagnostics.summary_fallback = true;
            }
            Err(e) => {
                warn!(error = %e, "summary generation failed; using template");
                report.executive_summary = templated_summary(&report);
                report.diagnostics.summary_fallback = true;
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Judge, Presence, TargetArtifact};
    use crate::execution::{CollaboratorError, CollaboratorResult};

    fn dims() -> Vec<RubricDimension> {
        vec![
            RubricDimension::new("a", "Alpha", TargetArtifact::GithubRepo),
            RubricDimension::new("b", "Beta", TargetArtifact::PdfReport),
        ]
    }

    #[test]
    fn test_dimension_without_opinions_is_skipped() {
        let engine = SynthesisEngine::default();
        let opinions = OpinionMap::from_opinions(vec![Opinion::new(Judge::Defense, "a", 5, "ok")]);
        let report = engine
            .synthesize("s", &dims(), &EvidenceMap::new(), &opinions, RunDiagnostics::default())
            .unwrap();
        assert_eq!(report.criteria.len(), 1);
        assert_eq!(report.diagnostics.skipped_dimensions, vec!["b".to_string()]);
    }

    #[test]
    fn test_empty_rubric_yields_zero_overall() {
        let engine = SynthesisEngine::default();
        let report = engine
            .synthesize("s", &[], &EvidenceMap::new(), &OpinionMap::new(), RunDiagnostics::default())
            .unwrap();
        assert!(report.criteria.is_empty());
        assert_eq!(report.overall_score, 0.0);
        assert!(report.remediation_plan.is_empty());
        assert!(report.executive_summary.contains("0 dimension(s)"));
    }

    #[test]
    fn test_duplicate_opinion_is_rejected() {
        let engine = SynthesisEngine::default();
        let opinions = OpinionMap::from_opinions(vec![
            Opinion::new(Judge::Defense, "a", 5, "ok"),
            Opinion::new(Judge::Defense, "a", 4, "again"),
        ]);
        let err = engine
            .synthesize("s", &dims(), &EvidenceMap::new(), &opinions, RunDiagnostics::default())
            .unwrap_err();
        assert!(err.to_string().contains("duplicate opinion"));
    }

    #[test]
    fn test_misfiled_opinion_is_rejected() {
        let engine = SynthesisEngine::default();
        let mut opinions = OpinionMap::new();
        opinions.push("a", Opinion::new(Judge::Defense, "b", 5, "ok"));
        assert!(engine.validate_input(&EvidenceMap::new(), &opinions).is_err());
    }

    #[test]
    fn test_out_of_range_evidence_is_rejected() {
        let engine = SynthesisEngine::default();
        let mut evidence = EvidenceMap::new();
        evidence.push("a", Evidence::new("g", Presence::Absent, "x", "r", 1.5));
        assert!(engine.validate_input(&evidence, &OpinionMap::new()).is_err());
    }

    #[test]
    fn test_remediation_plan_lists_only_low_scores_in_rubric_order() {
        let engine = SynthesisEngine::default();
        let opinions = OpinionMap::from_opinions(vec![
            Opinion::new(Judge::Prosecutor, "b", 1, "No citations at all"),
            Opinion::new(Judge::Prosecutor, "a", 2, "History is one commit"),
        ]);
        let mut dims = dims();
        dims[0].target_artifact = TargetArtifact::PdfReport;
        let report = engine
            .synthesize("s", &dims, &EvidenceMap::new(), &opinions, RunDiagnostics::default())
            .unwrap();
        let lines: Vec<&str> = report.remediation_plan.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("- Alpha:"));
        assert!(lines[1].starts_with("- Beta:"));
    }

    struct Failing;

    #[async_trait::async_trait]
    impl SummaryGenerator for Failing {
        async fn summarize(&self, _report: &Report) -> CollaboratorResult<String> {
            Err(CollaboratorError::Unavailable("model offline".to_string()))
        }
    }

    #[tokio::test]
    async fn test_summary_failure_falls_back_to_template() {
        let engine = SynthesisEngine::default();
        let report = engine
            .synthesize("repo", &[], &EvidenceMap::new(), &OpinionMap::new(), RunDiagnostics::default())
            .unwrap();
        let report = engine.summarize(report, &Failing).await;
        assert!(report.diagnostics.summary_fallback);
        assert_eq!(
            report.executive_summary,
            "Audit of repo evaluated 0 dimension(s); overall score 0.00/5.0."
        );
    }
}
