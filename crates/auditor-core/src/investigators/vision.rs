//! Diagram inspector placeholder.
//!
//! Image analysis is not configured, so every diagram dimension receives an
//! `unknown` observation rather than a guess.

use async_trait::async_trait;

use crate::domain::{Evidence, Presence, RubricDimension, TargetArtifact};
use crate::execution::CollaboratorResult;
use crate::orchestration::Subject;

use super::{InvestigationSession, Investigator};

#[derive(Debug, Clone, Copy, Default)]
pub struct VisionInspector;

#[async_trait]
impl Investigator for VisionInspector {
    fn name(&self) -> &str {
        "vision_inspector"
    }

    fn artifact(&self) -> TargetArtifact {
        TargetArtifact::PdfImages
    }

    async fn open(&self, subject: &Subject) -> CollaboratorResult<Box<dyn InvestigationSession>> {
        let location = subject
            .report
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "N/A".to_string());
        Ok(Box::new(VisionSession { location }))
    }
}

struct VisionSession {
    location: String,
}

#[async_trait]
impl InvestigationSession for VisionSession {
    async fn examine(&self, dimension: &RubricDimension) -> CollaboratorResult<Vec<Evidence>> {
        Ok(vec![Evidence::new(
            format!("Analyze diagrams for {}", dimension.display_name()),
            Presence::Unknown,
            self.location.clone(),
            "Image analysis is not configured; diagrams were not inspected.",
            0.0,
        )])
    }
}
