//! Judge collaborators: turn frozen evidence into one opinion per dimension.

pub mod heuristic;
pub mod llm;

use async_trait::async_trait;

use crate::domain::{Evidence, Judge, Opinion, RubricDimension};
use crate::execution::CollaboratorResult;

pub use heuristic::HeuristicEvaluator;
pub use llm::LlmEvaluator;

/// Renders a persona's opinion on a single dimension.
///
/// Implementations see only the evidence for that dimension and never
/// another judge's opinion.
#[async_trait]
pub trait Evaluator: Send + Sync {
    fn name(&self) -> &str;

    async fn evaluate(
        &self,
        dimension: &RubricDimension,
        evidence: &[Evidence],
        judge: Judge,
    ) -> CollaboratorResult<Opinion>;
}

/// Citation labels for the evidence a judge relied on.
pub(crate) fn citations(evidence: &[Evidence]) -> Vec<String> {
    evidence
        .iter()
        .map(|ev| format!("{} @ {}", ev.goal, ev.location))
        .collect()
}
