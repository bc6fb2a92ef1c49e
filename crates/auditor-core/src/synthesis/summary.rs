//! Executive summary generation, isolated from scoring.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::Report;
use crate::execution::{CollaboratorError, CollaboratorResult};
use crate::llm::ChatModel;

/// Produces the free-text executive summary for a scored report.
#[async_trait]
pub trait SummaryGenerator: Send + Sync {
    async fn summarize(&self, report: &Report) -> CollaboratorResult<String>;
}

/// Deterministic fallback sentence: overall score and dimension count.
pub fn templated_summary(report: &Report) -> String {
    format!(
        "Audit of {} evaluated {} dimension(s); overall score {:.2}/5.0.",
        report.subject_id,
        report.criteria.len(),
        report.overall_score
    )
}

/// Summary generator that never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateSummary;

#[async_trait]
impl SummaryGenerator for TemplateSummary {
    async fn summarize(&self, report: &Report) -> CollaboratorResult<String> {
        Ok(templated_summary(report))
    }
}

/// Summary written by a chat model from the scored criteria.
pub struct LlmSummary {
    model: Arc<dyn ChatModel>,
}

impl LlmSummary {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }
}

const SUMMARY_SYSTEM: &str = "You are the Chief Justice of a code audit court. \
Write a concise executive summary (at most five sentences) of the verdicts below. \
Do not change any score.";

#[async_trait]
impl SummaryGenerator for LlmSummary {
    async fn summarize(&self, report: &Report) -> CollaboratorResult<String> {
        let mut prompt = format!(
            "Subject: {}\nOverall score: {:.2}/5.0\n\nVerdicts:\n",
            report.subject_id, report.overall_score
        );
        for c in &report.criteria {
            prompt.push_str(&format!("- {}: {}/5", c.dimension_name, c.final_score));
            if let Some(dissent) = &c.dissent_summary {
                prompt.push_str(&format!(" (dissent: {dissent})"));
            }
            prompt.push('\n');
        }

        let text = self.model.complete(SUMMARY_SYSTEM, &prompt).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(CollaboratorError::InvalidResponse(
                "empty summary".to_string(),
            ));
        }
        Ok(text.to_string())
    }
}
