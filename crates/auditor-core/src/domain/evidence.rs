//! Evidence records produced by investigators.

use serde::{Deserialize, Serialize};

use super::error::ValidationError;

/// Maximum number of characters kept in [`Evidence::content`].
pub const MAX_CONTENT_CHARS: usize = 1000;

/// Tri-state outcome of a forensic check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    /// The checked property was observed.
    Present,
    /// The checked property was looked for and not observed.
    Absent,
    /// The check could not be carried out.
    Unknown,
}

impl Presence {
    pub fn from_bool(found: bool) -> Self {
        if found {
            Presence::Present
        } else {
            Presence::Absent
        }
    }
}

impl std::fmt::Display for Presence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Presence::Present => "found",
            Presence::Absent => "missing",
            Presence::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// One observation supporting or refuting a rubric criterion.
///
/// Evidence is immutable once built; the orchestrator only ever appends
/// records to the run's evidence map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// What was being checked.
    pub goal: String,
    pub found: Presence,
    /// Provenance pointer: file path, commit id, page, or `"N/A"`.
    pub location: String,
    /// Raw excerpt, truncated to [`MAX_CONTENT_CHARS`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub rationale: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
}

impl Evidence {
    pub fn new(
        goal: impl Into<String>,
        found: Presence,
        location: impl Into<String>,
        rationale: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            goal: goal.into(),
            found,
            location: location.into(),
            content: None,
            rationale: rationale.into(),
            confidence,
        }
    }

    /// Attach a raw excerpt, truncating it on a char boundary.
    pub fn with_content(mut self, content: impl AsRef<str>) -> Self {
        self.content = Some(truncate_chars(content.as_ref(), MAX_CONTENT_CHARS));
        self
    }

    /// Sentinel recorded when an investigator could not run its check.
    pub fn failure(
        goal: impl Into<String>,
        location: impl Into<String>,
        reason: impl std::fmt::Display,
    ) -> Self {
        Self::new(
            goal,
            Presence::Absent,
            location,
            format!("investigation failed: {reason}"),
            1.0,
        )
    }

    /// Reject records that would make the rule engine ill-defined.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.goal.trim().is_empty() {
            return Err(ValidationError::MissingField {
                record: "evidence".to_string(),
                field: "goal".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(ValidationError::ConfidenceOutOfRange {
                goal: self.goal.clone(),
                confidence: self.confidence,
            });
        }
        Ok(())
    }
}

/// Take at most `max` characters of `s`.
pub(crate) fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
