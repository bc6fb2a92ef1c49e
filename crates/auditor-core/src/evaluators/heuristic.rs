//! Deterministic persona scoring from evidence alone.
//!
//! Used when no language model is configured and in tests. Each persona maps
//! the share of confirmed findings onto its own scale: the Prosecutor is
//! harsh on any gap, the Defense credits effort, the TechLead sits between.

use async_trait::async_trait;

use crate::domain::{Evidence, Judge, Opinion, Presence, RubricDimension};
use crate::execution::CollaboratorResult;

use super::{citations, Evaluator};

/// Absent records below this confidence do not count as findings.
const DECISIVE_CONFIDENCE: f64 = 0.5;
/// Mean confidence at which the TechLead trusts a clean result fully.
const TRUSTED_CONFIDENCE: f64 = 0.9;

#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicEvaluator;

/// Tally of decisive findings for one dimension.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Tally {
    present: usize,
    absent: usize,
    undecided: usize,
    mean_confidence: f64,
}

impl Tally {
    fn of(evidence: &[Evidence]) -> Self {
        let mut tally = Tally {
            present: 0,
            absent: 0,
            undecided: 0,
            mean_confidence: 0.0,
        };
        for ev in evidence {
            match ev.found {
                Presence::Present => tally.present += 1,
                Presence::Absent if ev.confidence >= DECISIVE_CONFIDENCE => tally.absent += 1,
                _ => tally.undecided += 1,
            }
        }
        if !evidence.is_empty() {
            tally.mean_confidence =
                evidence.iter().map(|e| e.confidence).sum::<f64>() / evidence.len() as f64;
        }
        tally
    }

    /// Share of decisive findings that were present.
    fn ratio(&self) -> Option<f64> {
        let decisive = self.present + self.absent;
        (decisive > 0).then(|| self.present as f64 / decisive as f64)
    }
}

fn score_for(judge: Judge, tally: &Tally, has_evidence: bool) -> u8 {
    let Some(ratio) = tally.ratio() else {
        return match (judge, has_evidence) {
            (Judge::Prosecutor, false) => 1,
            (Judge::Defense, false) => 2,
            (Judge::TechLead, false) => 1,
            (Judge::Prosecutor, true) => 2,
            (_, true) => 3,
        };
    };

    match judge {
        Judge::Prosecutor if ratio >= 1.0 => 4,
        Judge::Prosecutor if ratio >= 0.5 => 2,
        Judge::Prosecutor => 1,
        Judge::Defense if ratio >= 1.0 => 5,
        Judge::Defense if ratio >= 0.5 => 4,
        Judge::Defense => 3,
        Judge::TechLead if ratio >= 1.0 && tally.mean_confidence >= TRUSTED_CONFIDENCE => 5,
        Judge::TechLead if ratio >= 1.0 => 4,
        Judge::TechLead if ratio >= 0.5 => 3,
        Judge::TechLead => 2,
    }
}

fn argument_for(judge: Judge, dimension: &RubricDimension, tally: &Tally, evidence: &[Evidence]) -> String {
    let name = dimension.display_name();
    if evidence.is_empty() {
        return format!("No evidence was collected for {name}; nothing supports a passing grade.");
    }

    let gaps: Vec<&str> = evidence
        .iter()
        .filter(|e| e.found == Presence::Absent)
        .map(|e| e.rationale.as_str())
        .collect();
    let strengths: Vec<&str> = evidence
        .iter()
        .filter(|e| e.found == Presence::Present)
        .map(|e| e.rationale.as_str())
        .collect();

    let counts = format!(
        "{} confirmed, {} missing, {} undecided",
        tally.present, tally.absent, tally.undecided
    );

    match judge {
        Judge::Prosecutor if !gaps.is_empty() => {
            format!("{name} has unproven claims ({counts}). Gaps: {}", gaps.join(" "))
        }
        Judge::Prosecutor => {
            format!("{name} holds up under scrutiny ({counts}), though nothing exceeds the stated requirement.")
        }
        Judge::Defense if !strengths.is_empty() => {
            format!("{name} shows deliberate effort ({counts}). Strengths: {}", strengths.join(" "))
        }
        Judge::Defense => {
            format!("{name} was attempted ({counts}); the intent is visible even where execution falls short.")
        }
        Judge::TechLead => {
            let verdict = match tally.ratio() {
                Some(r) if r >= 1.0 => "works as specified",
                Some(r) if r >= 0.5 => "partially works",
                Some(_) => "does not work as required",
                None => "cannot be verified",
            };
            format!("{name} {verdict} ({counts}).")
        }
    }
}

#[async_trait]
impl Evaluator for HeuristicEvaluator {
    fn name(&self) -> &str {
        "heuristic"
    }

    async fn evaluate(
        &self,
        dimension: &RubricDimension,
        evidence: &[Evidence],
        judge: Judge,
    ) -> CollaboratorResult<Opinion> {
        let tally = Tally::of(evidence);
        let score = score_for(judge, &tally, !evidence.is_empty());
        let argument = argument_for(judge, dimension, &tally, evidence);
        Ok(Opinion::new(judge, &dimension.id, score, argument).with_citations(citations(evidence)))
    }
}
