//! Domain models for the auditor.
//!
//! Canonical definitions for the core records:
//! - `Evidence`: an investigator's observation about one criterion
//! - `Opinion`: one judge's scored judgment on one criterion
//! - `RubricDimension` / `Rubric`: the externally supplied criteria
//! - `CriterionResult` / `Report`: synthesis output
//! - `CriterionMap`: append-only run-scoped stores

pub mod error;
pub mod evidence;
pub mod opinion;
pub mod report;
pub mod rubric;
pub mod store;

pub use error::{AuditError, AuditResult, ValidationError};
pub use evidence::{Evidence, Presence};
pub use opinion::{Judge, Opinion};
pub use report::{CriterionResult, Report, RunDiagnostics, ScoreTrace, SynthesisRule};
pub use rubric::{Rubric, RubricDimension, TargetArtifact};
pub use store::{CriterionMap, EvidenceMap, OpinionMap};
