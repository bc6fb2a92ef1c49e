//! Judicial opinions rendered by evaluator personas.

use serde::{Deserialize, Serialize};

use super::error::ValidationError;

/// The three evaluator personas.
///
/// Variant order is the canonical judge order used wherever opinions are
/// listed or ties between judges are broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Judge {
    /// Adversarial lens: scrutinises gaps, security flaws, and laziness.
    Prosecutor,
    /// Advocate lens: rewards effort, intent, and creative workarounds.
    Defense,
    /// Pragmatic lens: does it work, is it maintainable.
    TechLead,
}

impl Judge {
    pub const ALL: [Judge; 3] = [Judge::Prosecutor, Judge::Defense, Judge::TechLead];

    /// System prompt establishing the persona.
    pub fn persona(&self) -> &'static str {
        match self {
            Judge::Prosecutor => {
                "You are the Prosecutor. Trust no one and assume vibe coding. \
                 Scrutinize the evidence for gaps, security flaws, and laziness."
            }
            Judge::Defense => {
                "You are the Defense Attorney. Reward effort and intent and look for \
                 the spirit of the law. Highlight creative workarounds and deep thought."
            }
            Judge::TechLead => {
                "You are the Tech Lead. Apply a pragmatic lens: does it actually work, \
                 is it maintainable? Evaluate architectural soundness and code cleanliness."
            }
        }
    }
}

impl std::fmt::Display for Judge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Judge::Prosecutor => "Prosecutor",
            Judge::Defense => "Defense",
            Judge::TechLead => "TechLead",
        };
        write!(f, "{s}")
    }
}

/// One judge's scored judgment on one criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opinion {
    pub judge: Judge,
    pub criterion_id: String,
    /// Integer score, 1–5 inclusive.
    pub score: u8,
    pub argument: String,
    /// Evidence locations the judge relied on, in citation order.
    #[serde(default)]
    pub cited_evidence: Vec<String>,
}

impl Opinion {
    pub fn new(
        judge: Judge,
        criterion_id: impl Into<String>,
        score: u8,
        argument: impl Into<String>,
    ) -> Self {
        Self {
            judge,
            criterion_id: criterion_id.into(),
            score,
            argument: argument.into(),
            cited_evidence: Vec::new(),
        }
    }

    pub fn with_citations(mut self, cited: Vec<String>) -> Self {
        self.cited_evidence = cited;
        self
    }

    /// Terminal low-confidence opinion recorded when a judge could not deliberate.
    pub fn failure(
        judge: Judge,
        criterion_id: impl Into<String>,
        reason: impl std::fmt::Display,
    ) -> Self {
        Self::new(
            judge,
            criterion_id,
            1,
            format!("Evaluation failed: {reason}"),
        )
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.criterion_id.trim().is_empty() {
            return Err(ValidationError::MissingField {
                record: format!("opinion from {}", self.judge),
                field: "criterion_id".to_string(),
            });
        }
        if !(1..=5).contains(&self.score) {
            return Err(ValidationError::ScoreOutOfRange {
                judge: self.judge.to_string(),
                criterion_id: self.criterion_id.clone(),
                score: self.score,
            });
        }
        if self.argument.trim().is_empty() {
            return Err(ValidationError::MissingField {
                record: format!("opinion from {} on {}", self.judge, self.criterion_id),
                field: "argument".to_string(),
            });
        }
        Ok(())
    }
}
