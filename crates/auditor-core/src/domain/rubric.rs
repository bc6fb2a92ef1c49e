//! Rubric dimensions and the JSON rubric loader.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::{AuditError, AuditResult};

/// Which artifact a dimension is judged against; selects the investigator branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TargetArtifact {
    GithubRepo,
    PdfReport,
    PdfImages,
    #[default]
    #[serde(other)]
    Other,
}

impl std::fmt::Display for TargetArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TargetArtifact::GithubRepo => "github_repo",
            TargetArtifact::PdfReport => "pdf_report",
            TargetArtifact::PdfImages => "pdf_images",
            TargetArtifact::Other => "other",
        };
        write!(f, "{s}")
    }
}

/// One evaluation criterion. Read-only to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricDimension {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub forensic_instruction: String,
    #[serde(default)]
    pub success_pattern: String,
    #[serde(default)]
    pub failure_pattern: String,
    #[serde(default)]
    pub target_artifact: TargetArtifact,
}

impl RubricDimension {
    pub fn new(id: impl Into<String>, name: impl Into<String>, target: TargetArtifact) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            forensic_instruction: String::new(),
            success_pattern: String::new(),
            failure_pattern: String::new(),
            target_artifact: target,
        }
    }

    /// Human-facing name, falling back to the id.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Deserialize)]
struct RubricFile {
    #[serde(default)]
    rubric_metadata: serde_json::Value,
    #[serde(default)]
    dimensions: Vec<RubricDimension>,
}

/// An ordered set of dimensions plus opaque metadata.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Rubric {
    pub metadata: serde_json::Value,
    pub dimensions: Vec<RubricDimension>,
}

impl Rubric {
    pub fn new(dimensions: Vec<RubricDimension>) -> AuditResult<Self> {
        let rubric = Self {
            metadata: serde_json::Value::Null,
            dimensions,
        };
        rubric.validate()?;
        Ok(rubric)
    }

    /// Parse a rubric document of the form `{"rubric_metadata": {..}, "dimensions": [..]}`.
    pub fn from_json_str(raw: &str) -> AuditResult<Self> {
        let file: RubricFile = serde_json::from_str(raw)
            .map_err(|e| AuditError::InvalidRubric(format!("parse error: {e}")))?;
        let rubric = Self {
            metadata: file.rubric_metadata,
            dimensions: file.dimensions,
        };
        rubric.validate()?;
        Ok(rubric)
    }

    /// Load a rubric from disk.
    ///
    /// A missing file yields an empty rubric (the run still produces an
    /// empty report); an unreadable or malformed file is an error.
    pub fn load(path: &Path) -> AuditResult<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "rubric not found; continuing with an empty rubric");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn dimension(&self, id: &str) -> Option<&RubricDimension> {
        self.dimensions.iter().find(|d| d.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    fn validate(&self) -> AuditResult<()> {
        let mut seen = HashSet::new();
        for dim in &self.dimensions {
            if dim.id.trim().is_empty() {
                return Err(AuditError::InvalidRubric(
                    "dimension with empty id".to_string(),
                ));
            }
            if !seen.insert(dim.id.as_str()) {
                return Err(AuditError::InvalidRubric(format!(
                    "duplicate dimension id: {}",
                    dim.id
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "rubric_metadata": {"rubric_name": "Automaton Auditor", "version": "3.0.0"},
        "dimensions": [
            {
                "id": "git_forensic_analysis",
                "name": "Git Forensic Analysis",
                "target_artifact": "github_repo",
                "forensic_instruction": "Run git log --oneline --reverse.",
                "success_pattern": "More than 3 commits showing progression.",
                "failure_pattern": "Single init commit."
            },
            {"id": "swarm_visual", "name": "Architectural Diagram", "target_artifact": "pdf_images"},
            {"id": "future", "target_artifact": "hologram"}
        ]
    }"#;

    #[test]
    fn test_parse_sample_rubric_preserves_order() {
        let rubric = Rubric::from_json_str(SAMPLE).unwrap();
        let ids: Vec<&str> = rubric.dimensions.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["git_forensic_analysis", "swarm_visual", "future"]);
        assert_eq!(
            rubric.dimensions[0].target_artifact,
            TargetArtifact::GithubRepo
        );
        assert_eq!(rubric.metadata["version"], "3.0.0");
    }

    #[test]
    fn test_unknown_target_artifact_maps_to_other() {
        let rubric = Rubric::from_json_str(SAMPLE).unwrap();
        let dim = rubric.dimension("future").unwrap();
        assert_eq!(dim.target_artifact, TargetArtifact::Other);
        assert_eq!(dim.display_name(), "future");
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let raw = r#"{"dimensions": [{"id": "a"}, {"id": "a"}]}"#;
        let err = Rubric::from_json_str(raw).unwrap_err();
        assert!(err.to_string().contains("duplicate dimension id: a"));
    }

    #[test]
    fn test_missing_file_yields_empty_rubric() {
        let dir = tempfile::tempdir().unwrap();
        let rubric = Rubric::load(&dir.path().join("rubric.json")).unwrap();
        assert!(rubric.is_empty());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rubric.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            Rubric::load(&path),
            Err(AuditError::InvalidRubric(_))
        ));
    }
}
