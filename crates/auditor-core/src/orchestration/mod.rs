//! Pipeline orchestration.
//!
//! - [`context`]: `Subject`, `AuditContext` (run inputs)
//! - [`barrier`]: `CoverageAudit`, `audit_coverage()` (fan-in completeness check)
//! - [`graph`]: `AuditGraph` (fan-out/fan-in stages, degradation, synthesis)

pub mod barrier;
pub mod context;
pub mod graph;

pub use barrier::{audit_coverage, CoverageAudit};
pub use context::{AuditContext, Subject};
pub use graph::{AuditGraph, AuditGraphBuilder, AuditOutcome, RunState, Stage};
