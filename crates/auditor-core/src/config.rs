//! Run configuration assembled from environment variables.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::{AuditError, AuditResult};
use crate::execution::RetryPolicy;
use crate::llm::LlmConfig;

pub const DEFAULT_OUTPUT_DIR: &str = "audit";
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Which evaluator backs the judge personas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluatorKind {
    /// Deterministic scoring from evidence; needs no network.
    #[default]
    Heuristic,
    /// Persona prompts answered by the configured chat model.
    Llm,
}

impl FromStr for EvaluatorKind {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "heuristic" => Ok(EvaluatorKind::Heuristic),
            "llm" => Ok(EvaluatorKind::Llm),
            other => Err(AuditError::Configuration(format!(
                "unknown evaluator '{other}' (expected heuristic or llm)"
            ))),
        }
    }
}

impl std::fmt::Display for EvaluatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvaluatorKind::Heuristic => write!(f, "heuristic"),
            EvaluatorKind::Llm => write!(f, "llm"),
        }
    }
}

/// Settings for one audit run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    pub retry: RetryPolicy,
    /// Directory receiving the rendered and JSON reports.
    pub output_dir: PathBuf,
    pub evaluator: EvaluatorKind,
    /// Evaluator calls allowed in flight at once, across all judges.
    pub max_concurrent: usize,
    pub llm: LlmConfig,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            evaluator: EvaluatorKind::default(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            llm: LlmConfig::default(),
        }
    }
}

impl AuditConfig {
    /// Read configuration from environment variables.
    ///
    /// Reads:
    /// - AUDITOR_TIMEOUT_MS, AUDITOR_MAX_RETRIES, AUDITOR_BACKOFF_MS (optional)
    /// - AUDITOR_OUTPUT_DIR (optional, default: `audit`)
    /// - AUDITOR_EVALUATOR: `heuristic` or `llm` (optional)
    /// - AUDITOR_MAX_CONCURRENT (optional, default: 4, must be positive)
    /// - the chat model variables read by [`LlmConfig::from_env`]
    pub fn from_env() -> AuditResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`AuditConfig::from_env`] with an injected variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AuditResult<Self> {
        let mut config = Self::default();

        if let Some(ms) = parse_var(&lookup, "AUDITOR_TIMEOUT_MS")? {
            config.retry.timeout_ms = ms;
        }
        if let Some(n) = parse_var(&lookup, "AUDITOR_MAX_RETRIES")? {
            config.retry.max_retries = n;
        }
        if let Some(ms) = parse_var(&lookup, "AUDITOR_BACKOFF_MS")? {
            config.retry.backoff_base_ms = ms;
        }
        if let Some(dir) = lookup("AUDITOR_OUTPUT_DIR").filter(|d| !d.trim().is_empty()) {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(kind) = lookup("AUDITOR_EVALUATOR") {
            config.evaluator = kind.parse()?;
        }
        if let Some(n) = parse_var::<usize>(&lookup, "AUDITOR_MAX_CONCURRENT")? {
            if n == 0 {
                return Err(AuditError::Configuration(
                    "AUDITOR_MAX_CONCURRENT must be at least 1".to_string(),
                ));
            }
            config.max_concurrent = n;
        }
        config.llm = LlmConfig::from_lookup(&lookup);
        Ok(config)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> AuditResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| AuditError::Configuration(format!("{key}={raw}: {e}"))),
    }
}
