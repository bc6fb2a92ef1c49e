//! Domain-level error taxonomy for the auditor.

/// Errors produced while validating records handed to the synthesis engine.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("opinion from {judge} on {criterion_id}: score {score} outside 1..=5")]
    ScoreOutOfRange {
        judge: String,
        criterion_id: String,
        score: u8,
    },

    #[error("{record} is missing required field: {field}")]
    MissingField { record: String, field: String },

    #[error("evidence '{goal}' has confidence {confidence} outside [0, 1]")]
    ConfidenceOutOfRange { goal: String, confidence: f64 },

    #[error("duplicate opinion from {judge} on {criterion_id}")]
    DuplicateOpinion { judge: String, criterion_id: String },

    #[error("opinion filed under {filed_under} names criterion {criterion_id}")]
    MisfiledOpinion {
        filed_under: String,
        criterion_id: String,
    },
}

/// Auditor domain errors.
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("invalid rubric: {0}")]
    InvalidRubric(String),

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("malformed synthesis input: {0}")]
    MalformedInput(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for auditor domain operations.
pub type AuditResult<T> = std::result::Result<T, AuditError>;
