//! Execution controls for collaborator calls: per-attempt timeout and
//! bounded retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::{CollaboratorError, CollaboratorResult};

/// Retry budget applied to every collaborator call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryPolicy {
    /// Maximum wall-clock time for a single attempt (milliseconds).
    pub timeout_ms: u64,
    /// Maximum number of retries (0 = run once).
    pub max_retries: u32,
    /// Base delay for exponential backoff between retries (milliseconds).
    pub backoff_base_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout_ms: 120_000,
            max_retries: 2,
            backoff_base_ms: 500,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.backoff_base_ms.saturating_mul(factor))
    }
}

/// Run `call` until it succeeds or the retry budget is spent.
///
/// Each attempt is bounded by `policy.timeout_ms`. On exhaustion the last
/// failure is reported as [`CollaboratorError::Exhausted`] so callers can
/// degrade to a sentinel record.
pub async fn call_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut call: F,
) -> CollaboratorResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CollaboratorResult<T>>,
{
    let max_attempts = policy.max_retries + 1;
    let timeout = Duration::from_millis(policy.timeout_ms);
    let mut last_error = String::new();

    for attempt in 1..=max_attempts {
        let outcome = match tokio::time::timeout(timeout, call()).await {
            Ok(result) => result,
            Err(_elapsed) => Err(CollaboratorError::Timeout {
                elapsed_ms: policy.timeout_ms,
            }),
        };

        match outcome {
            Ok(value) => return Ok(value),
            Err(e) => {
                debug!(call = %label, attempt, error = %e, "collaborator attempt failed");
                last_error = e.to_string();
                if attempt < max_attempts {
                    tokio::time::sleep(policy.backoff(attempt)).await;
                }
            }
        }
    }

    Err(CollaboratorError::Exhausted {
        attempts: max_attempts,
        reason: last_error,
    })
}
