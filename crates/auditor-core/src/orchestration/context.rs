//! Run inputs: what is audited and against which rubric.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{Rubric, RubricDimension};

/// The artifact pair under audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Repository URL or local checkout path.
    pub repo: String,
    /// Accompanying report (PDF, markdown or text), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<PathBuf>,
}

impl Subject {
    pub fn new(repo: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            report: None,
        }
    }

    pub fn with_report(mut self, report: impl Into<PathBuf>) -> Self {
        self.report = Some(report.into());
        self
    }

    /// The repository as a local directory, when it is one.
    pub fn local_repo(&self) -> Option<&Path> {
        let path = Path::new(&self.repo);
        path.is_dir().then_some(path)
    }
}

/// Everything a run needs before the first stage starts.
#[derive(Debug, Clone)]
pub struct AuditContext {
    pub subject: Subject,
    pub rubric: Rubric,
}

impl AuditContext {
    pub fn new(subject: Subject, rubric: Rubric) -> Self {
        Self { subject, rubric }
    }

    pub fn dimensions(&self) -> &[RubricDimension] {
        &self.rubric.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_repo_only_for_existing_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let local = Subject::new(dir.path().to_string_lossy());
        assert_eq!(local.local_repo(), Some(dir.path()));

        let remote = Subject::new("https://github.com/example/repo.git");
        assert!(remote.local_repo().is_none());
    }
}
