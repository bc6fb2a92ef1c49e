//! Evidence-gathering collaborators.
//!
//! An [`Investigator`] owns one [`TargetArtifact`]. For each run the graph
//! opens a session against the subject (cloning, reading, extracting) and
//! asks it to examine every dimension that targets the investigator's
//! artifact. Sessions own their scratch resources and release them on drop.

pub mod docs;
pub mod git;
pub mod repo;
pub mod vision;

use async_trait::async_trait;

use crate::domain::{Evidence, RubricDimension, TargetArtifact};
use crate::execution::CollaboratorResult;
use crate::orchestration::Subject;

pub use docs::DocInvestigator;
pub use repo::RepoInvestigator;
pub use vision::VisionInspector;

/// A pluggable evidence source.
#[async_trait]
pub trait Investigator: Send + Sync {
    /// Branch name used in logs and degraded-record reasons.
    fn name(&self) -> &str;

    /// Dimensions targeting this artifact are routed here.
    fn artifact(&self) -> TargetArtifact;

    /// Prepare a per-run session (clone, parse, extract).
    async fn open(&self, subject: &Subject) -> CollaboratorResult<Box<dyn InvestigationSession>>;
}

/// Per-run state of one investigator.
#[async_trait]
pub trait InvestigationSession: Send + Sync {
    /// Evidence for one dimension. May be empty.
    async fn examine(&self, dimension: &RubricDimension) -> CollaboratorResult<Vec<Evidence>>;
}

/// Lowercased words of a dimension name worth searching for.
pub(crate) fn dimension_keywords(dimension: &RubricDimension) -> Vec<String> {
    dimension
        .display_name()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 3)
        .map(str::to_lowercase)
        .collect()
}
