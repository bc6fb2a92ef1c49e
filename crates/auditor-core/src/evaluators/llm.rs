//! Persona prompts answered by a chat model as structured JSON.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::domain::{evidence::truncate_chars, Evidence, Judge, Opinion, RubricDimension};
use crate::execution::{CollaboratorError, CollaboratorResult};
use crate::llm::{extract_json_object, ChatModel};

use super::Evaluator;

/// Characters of each evidence excerpt included in the prompt.
const PROMPT_EXCERPT_CHARS: usize = 200;

const RESPONSE_FORMAT: &str = "Respond with a single JSON object and nothing else: \
{\"score\": <integer 1-5>, \"argument\": \"<your reasoning>\", \
\"cited_evidence\": [\"<evidence location>\", ...]}";

pub struct LlmEvaluator {
    model: Arc<dyn ChatModel>,
}

impl LlmEvaluator {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }
}

#[derive(Debug, Deserialize)]
struct RawOpinion {
    score: f64,
    #[serde(default)]
    argument: String,
    #[serde(default)]
    cited_evidence: Vec<String>,
}

/// Persona system prompt plus the required response shape.
pub fn system_prompt(judge: Judge) -> String {
    format!("{}\n\n{RESPONSE_FORMAT}", judge.persona())
}

/// The dimension's forensic protocol followed by the collected evidence.
pub fn user_prompt(dimension: &RubricDimension, evidence: &[Evidence]) -> String {
    let mut prompt = format!(
        "Assess: {}\nForensic Protocol: {}\nSuccess Pattern: {}\nFailure Pattern: {}\n\nEvidence Collected:\n",
        dimension.display_name(),
        dimension.forensic_instruction,
        dimension.success_pattern,
        dimension.failure_pattern,
    );
    if evidence.is_empty() {
        prompt.push_str("- none\n");
    }
    for ev in evidence {
        prompt.push_str(&format!(
            "- Goal: {} ({})\n  Location: {}\n  Rationale: {}\n  Confidence: {:.2}\n",
            ev.goal, ev.found, ev.location, ev.rationale, ev.confidence
        ));
        if let Some(content) = &ev.content {
            prompt.push_str(&format!(
                "  Content: {}\n",
                truncate_chars(content, PROMPT_EXCERPT_CHARS)
            ));
        }
    }
    prompt.push_str("\nProvide your opinion with a score (1-5), an argument, and the evidence you cite.");
    prompt
}

/// Parse a model reply into an opinion, rejecting out-of-range scores.
pub fn parse_opinion(raw: &str, judge: Judge, criterion_id: &str) -> CollaboratorResult<Opinion> {
    let body = extract_json_object(raw)
        .ok_or_else(|| CollaboratorError::InvalidResponse("no JSON object in reply".to_string()))?;
    let parsed: RawOpinion = serde_json::from_str(body)
        .map_err(|e| CollaboratorError::InvalidResponse(format!("opinion JSON: {e}")))?;

    if !parsed.score.is_finite() || parsed.score.fract() != 0.0 || !(1.0..=5.0).contains(&parsed.score) {
        return Err(CollaboratorError::InvalidResponse(format!(
            "score {} is not an integer in 1..=5",
            parsed.score
        )));
    }
    if parsed.argument.trim().is_empty() {
        return Err(CollaboratorError::InvalidResponse("empty argument".to_string()));
    }

    Ok(Opinion::new(judge, criterion_id, parsed.score as u8, parsed.argument.trim())
        .with_citations(parsed.cited_evidence))
}

#[async_trait]
impl Evaluator for LlmEvaluator {
    fn name(&self) -> &str {
        "llm"
    }

    #[instrument(skip(self, dimension, evidence), fields(dimension = %dimension.id, judge = %judge))]
    async fn evaluate(
        &self,
        dimension: &RubricDimension,
        evidence: &[Evidence],
        judge: Judge,
    ) -> CollaboratorResult<Opinion> {
        let reply = self
            .model
            .complete(&system_prompt(judge), &user_prompt(dimension, evidence))
            .await?;
        let opinion = parse_opinion(&reply, judge, &dimension.id)?;
        debug!(score = opinion.score, "opinion parsed");
        Ok(opinion)
    }
}
