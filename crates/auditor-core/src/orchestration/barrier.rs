//! Evidence barrier: coverage audit after all investigators have joined.

use serde::{Deserialize, Serialize};

use crate::domain::{EvidenceMap, RubricDimension};
use crate::obs;

/// Which dimensions have evidence. Informational only; never blocks.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CoverageAudit {
    /// Dimension ids without any evidence, in rubric order.
    pub missing: Vec<String>,
    /// Number of dimensions with at least one record.
    pub covered: usize,
}

impl CoverageAudit {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Audit `evidence` against the rubric. The map itself is not touched.
pub fn audit_coverage(evidence: &EvidenceMap, dimensions: &[RubricDimension]) -> CoverageAudit {
    let missing: Vec<String> = dimensions
        .iter()
        .filter(|d| !evidence.covers(&d.id))
        .map(|d| d.id.clone())
        .collect();
    let audit = CoverageAudit {
        covered: dimensions.len() - missing.len(),
        missing,
    };
    obs::emit_barrier_coverage(audit.covered, &audit.missing);
    audit
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Evidence, Presence, TargetArtifact};

    fn dims(ids: &[&str]) -> Vec<RubricDimension> {
        ids.iter()
            .map(|id| RubricDimension::new(*id, *id, TargetArtifact::GithubRepo))
            .collect()
    }

    #[test]
    fn test_missing_lists_uncovered_in_rubric_order() {
        let mut evidence = EvidenceMap::new();
        evidence.push("b", Evidence::new("g", Presence::Present, "x", "r", 1.0));
        let audit = audit_coverage(&evidence, &dims(&["c", "b", "a"]));
        assert_eq!(audit.missing, vec!["c".to_string(), "a".to_string()]);
        assert_eq!(audit.covered, 1);
        assert!(!audit.is_complete());
    }

    #[test]
    fn test_empty_rubric_is_complete() {
        let audit = audit_coverage(&EvidenceMap::new(), &[]);
        assert!(audit.is_complete());
        assert_eq!(audit.covered, 0);
    }
}
