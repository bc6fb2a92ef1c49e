//! The arbitration rules and score rounding.
//!
//! Rule order is fixed: Evidence, then Functionality, then Security. The
//! security cap runs last so neither earlier rule can lift a capped score
//! back above the cap.

use crate::domain::{Evidence, Opinion, RubricDimension, ScoreTrace, SynthesisRule, TargetArtifact};

use super::matcher::EvidenceMatcher;
use super::policy::SynthesisPolicy;

/// Adjusted (unrounded) score with its audit trail.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub score: f64,
    pub trace: ScoreTrace,
    pub fired: Vec<SynthesisRule>,
}

/// Arithmetic mean of raw scores. Callers guarantee `opinions` is non-empty.
pub fn mean_score(opinions: &[Opinion]) -> f64 {
    let total: u32 = opinions.iter().map(|op| u32::from(op.score)).sum();
    f64::from(total) / opinions.len() as f64
}

/// Apply the rule chain to a criterion's opinions.
pub fn apply_rules(
    policy: &SynthesisPolicy,
    matcher: &dyn EvidenceMatcher,
    dimension: &RubricDimension,
    opinions: &[Opinion],
    evidence: &[Evidence],
) -> RuleOutcome {
    let base_mean = mean_score(opinions);
    let mut score = base_mean;
    let mut fired = Vec::new();

    // Penalty applies once per criterion however many pairs qualify.
    let contradicted = opinions
        .iter()
        .filter(|op| op.score >= policy.success_claim_min)
        .any(|op| {
            evidence
                .iter()
                .any(|ev| matcher.contradicts(op, ev, policy.evidence_confidence_floor))
        });
    if contradicted {
        score = (score - policy.hallucination_penalty).max(policy.score_floor);
        fired.push(SynthesisRule::Evidence);
    }
    let after_evidence = score;

    if dimension.target_artifact == TargetArtifact::GithubRepo {
        if let Some(pragmatic) = opinion_of(opinions, policy.pragmatic) {
            if pragmatic.score >= policy.functionality_min {
                score = (score + f64::from(pragmatic.score)) / 2.0;
                fired.push(SynthesisRule::Functionality);
            }
        }
    }
    let after_functionality = score;

    if let Some(adversarial) = opinion_of(opinions, policy.adversarial) {
        if adversarial.score <= policy.security_max && policy.mentions_risk(&adversarial.argument)
        {
            score = score.min(policy.security_cap);
            fired.push(SynthesisRule::Security);
        }
    }

    RuleOutcome {
        score,
        trace: ScoreTrace {
            base_mean,
            after_evidence,
            after_functionality,
            after_security: score,
        },
        fired,
    }
}

/// Round half up and clamp into `1..=5`.
pub fn round_score(score: f64) -> u8 {
    (score + 0.5).floor().clamp(1.0, 5.0) as u8
}

fn opinion_of(opinions: &[Opinion], judge: crate::domain::Judge) -> Option<&Opinion> {
    opinions.iter().find(|op| op.judge == judge)
}
