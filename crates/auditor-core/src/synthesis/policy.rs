//! Tunable constants of the arbitration rules.

use serde::{Deserialize, Serialize};

use crate::domain::Judge;

/// Terms that mark an adversarial argument as a security finding.
pub const DEFAULT_RISK_TERMS: &[&str] = &[
    "security",
    "flaw",
    "vulnerability",
    "vulnerable",
    "injection",
    "unsanitized",
    "unsanitised",
    "exploit",
    "insecure",
    "os.system",
];

/// Thresholds and designations used by the synthesis rules.
///
/// The defaults are the production rule set; tests and alternative rubrics
/// may override individual fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisPolicy {
    /// Subtracted once when a success claim is contradicted by evidence.
    pub hallucination_penalty: f64,
    /// Lower bound applied after the penalty.
    pub score_floor: f64,
    /// Scores at or above this count as claiming success.
    pub success_claim_min: u8,
    /// Absent evidence must be strictly more confident than this to contradict.
    pub evidence_confidence_floor: f64,
    /// Minimum pragmatic score that confirms functionality.
    pub functionality_min: u8,
    /// Adversarial scores at or below this can trigger the security cap.
    pub security_max: u8,
    pub security_cap: f64,
    /// Raw score spread at or above which dissent is reported.
    pub dissent_threshold: u8,
    /// Characters of the lowest scorer's argument quoted in remediation.
    pub remediation_quote_chars: usize,
    /// The lowest scorer's argument is quoted when its score is below this.
    pub remediation_concern_below: u8,
    /// Criteria scoring below this enter the remediation plan.
    pub plan_threshold: u8,
    pub adversarial: Judge,
    pub pragmatic: Judge,
    pub risk_terms: Vec<String>,
}

impl Default for SynthesisPolicy {
    fn default() -> Self {
        Self {
            hallucination_penalty: 1.5,
            score_floor: 1.0,
            success_claim_min: 4,
            evidence_confidence_floor: 0.8,
            functionality_min: 4,
            security_max: 2,
            security_cap: 3.0,
            dissent_threshold: 2,
            remediation_quote_chars: 200,
            remediation_concern_below: 3,
            plan_threshold: 4,
            adversarial: Judge::Prosecutor,
            pragmatic: Judge::TechLead,
            risk_terms: DEFAULT_RISK_TERMS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl SynthesisPolicy {
    /// Case-insensitive check for any risk term in `text`.
    pub fn mentions_risk(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.risk_terms
            .iter()
            .any(|term| lowered.contains(&term.to_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_values() {
        let p = SynthesisPolicy::default();
        assert_eq!(p.hallucination_penalty, 1.5);
        assert_eq!(p.security_cap, 3.0);
        assert_eq!(p.adversarial, Judge::Prosecutor);
        assert_eq!(p.pragmatic, Judge::TechLead);
    }

    #[test]
    fn test_mentions_risk_is_case_insensitive() {
        let p = SynthesisPolicy::default();
        assert!(p.mentions_risk("Critical SECURITY vulnerability found"));
        assert!(p.mentions_risk("calls os.system( with user input"));
        assert!(!p.mentions_risk("Clean, well-structured graph wiring"));
    }
}
