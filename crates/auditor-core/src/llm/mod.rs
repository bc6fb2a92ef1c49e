//! Language-model collaborator used by the LLM evaluator and summary.

pub mod client;

use async_trait::async_trait;

use crate::execution::CollaboratorResult;

pub use client::{LlmConfig, OpenAiChatClient};

/// A chat model that turns a (system, user) prompt pair into text.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> CollaboratorResult<String>;
}

/// Strip a surrounding markdown code fence and return the JSON object body.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_json_from_fenced_block() {
        let raw = "```json\n{\"score\": 4, \"argument\": \"ok\"}\n```";
        assert_eq!(
            extract_json_object(raw),
            Some("{\"score\": 4, \"argument\": \"ok\"}")
        );
    }

    #[test]
    fn test_extract_json_none_without_object() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("} {"), None);
    }
}
