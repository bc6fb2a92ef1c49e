//! Controls wrapped around every external collaborator call.
//!
//! - [`error`]: `CollaboratorError`, `CollaboratorResult`
//! - [`retry`]: `RetryPolicy`, `call_with_retry()` (timeout + exponential backoff)

pub mod error;
pub mod retry;

pub use error::{CollaboratorError, CollaboratorResult};
pub use retry::{call_with_retry, RetryPolicy};
