//! Deterministic synthesis of judge opinions into per-criterion verdicts.
//!
//! - [`policy`]: `SynthesisPolicy` (rule constants and persona roles)
//! - [`matcher`]: `EvidenceMatcher` (when evidence contradicts a success claim)
//! - [`rules`]: Rules of Evidence, Functionality and Security, rounding
//! - [`dissent`]: dissent summaries and remediation text
//! - [`summary`]: `SummaryGenerator` with templated fallback
//! - [`engine`]: `SynthesisEngine` (validation, verdicts, report assembly)

pub mod dissent;
pub mod engine;
pub mod matcher;
pub mod policy;
pub mod rules;
pub mod summary;

pub use engine::SynthesisEngine;
pub use matcher::{AbsenceMatcher, EvidenceMatcher, GoalMentionMatcher};
pub use policy::{SynthesisPolicy, DEFAULT_RISK_TERMS};
pub use rules::{apply_rules, mean_score, round_score, RuleOutcome};
pub use summary::{templated_summary, LlmSummary, SummaryGenerator, TemplateSummary};
