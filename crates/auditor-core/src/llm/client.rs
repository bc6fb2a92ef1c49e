//! OpenAI-compatible chat-completions client (OpenRouter, local gateways, ...).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::execution::{CollaboratorError, CollaboratorResult};

use super::ChatModel;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str = "arcee-ai/trinity-large-preview:free";

/// Connection settings for the chat endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmConfig {
    /// Base URL; `/chat/completions` is appended.
    pub base_url: String,
    pub model: String,
    /// Bearer token (optional for local gateways).
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        LlmConfig::new(DEFAULT_BASE_URL, DEFAULT_MODEL)
    }
}

impl LlmConfig {
    /// Read configuration from environment variables.
    ///
    /// Reads:
    /// - AUDITOR_LLM_BASE_URL (optional, default: OpenRouter)
    /// - AUDITOR_LLM_MODEL (optional)
    /// - AUDITOR_LLM_API_KEY, falling back to OPENROUTER_API_KEY (optional)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`LlmConfig::from_env`] with an injected variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let set = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();
        if let Some(url) = set("AUDITOR_LLM_BASE_URL") {
            config.base_url = url;
        }
        if let Some(model) = set("AUDITOR_LLM_MODEL") {
            config.model = model;
        }
        config.api_key = set("AUDITOR_LLM_API_KEY").or_else(|| set("OPENROUTER_API_KEY"));
        config
    }

    pub fn new(base_url: &str, model: &str) -> Self {
        LlmConfig {
            base_url: base_url.to_string(),
            model: model.to_string(),
            api_key: None,
            temperature: 0.0,
        }
    }

    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP chat client.
pub struct OpenAiChatClient {
    config: LlmConfig,
    http_client: reqwest::Client,
}

impl OpenAiChatClient {
    pub fn new(config: LlmConfig) -> CollaboratorResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("automaton-auditor/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }
}

#[async_trait]
impl ChatModel for OpenAiChatClient {
    #[instrument(skip(self, system, user), fields(model = %self.config.model))]
    async fn complete(&self, system: &str, user: &str) -> CollaboratorResult<String> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: self.config.temperature,
        };

        let mut request = self.http_client.post(self.config.endpoint()).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::Unavailable(format!(
                "chat endpoint returned {status}: {}",
                detail.chars().take(200).collect::<String>()
            )));
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| CollaboratorError::InvalidResponse("empty completion".to_string()))?;

        debug!(chars = content.len(), "chat completion received");
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ignores_environment() {
        let cfg = LlmConfig::default();
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.model, DEFAULT_MODEL);
        assert_eq!(cfg.api_key, None);
    }

    #[test]
    fn test_lookup_supplies_connection_settings() {
        let cfg = LlmConfig::from_lookup(|key| match key {
            "AUDITOR_LLM_BASE_URL" => Some("http://localhost:4000/v1".to_string()),
            "AUDITOR_LLM_MODEL" => Some("local-model".to_string()),
            "OPENROUTER_API_KEY" => Some("sk-or-fallback".to_string()),
            _ => None,
        });
        assert_eq!(cfg.base_url, "http://localhost:4000/v1");
        assert_eq!(cfg.model, "local-model");
        assert_eq!(cfg.api_key.as_deref(), Some("sk-or-fallback"));

        let cfg = LlmConfig::from_lookup(|key| match key {
            "AUDITOR_LLM_API_KEY" => Some("sk-primary".to_string()),
            "OPENROUTER_API_KEY" => Some("sk-or-fallback".to_string()),
            _ => None,
        });
        assert_eq!(cfg.api_key.as_deref(), Some("sk-primary"));
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_endpoint_joins_without_double_slash() {
        let cfg = LlmConfig::new("http://localhost:8080/v1/", "m");
        assert_eq!(cfg.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_api_key_is_not_serialized() {
        let cfg = LlmConfig::new("http://x", "m").with_api_key("secret");
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    fn test_response_shape_parses() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"hi"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("hi"));
    }
}
