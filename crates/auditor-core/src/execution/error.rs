//! Error types for collaborator calls (investigators, evaluators, language models).

/// Errors raised by an external collaborator.
///
/// These never escape the pipeline: the stage wrappers turn them into
/// sentinel evidence or failure-marker opinions.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    #[error("attempt timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("gave up after {attempts} attempt(s): {reason}")]
    Exhausted { attempts: u32, reason: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for collaborator calls.
pub type CollaboratorResult<T> = std::result::Result<T, CollaboratorError>;
