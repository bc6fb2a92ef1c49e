//! Automaton Auditor Core Library
//!
//! Parallel investigation of a repository and its report, an evidence
//! barrier, three independent judge personas, and a deterministic synthesis
//! engine that turns their opinions into one defensible verdict per rubric
//! criterion.

pub mod config;
pub mod domain;
pub mod evaluators;
pub mod execution;
pub mod investigators;
pub mod llm;
pub mod obs;
pub mod orchestration;
pub mod reporting;
pub mod synthesis;
pub mod telemetry;

pub use config::{AuditConfig, EvaluatorKind};

pub use domain::{
    AuditError, AuditResult, CriterionMap, CriterionResult, Evidence, EvidenceMap, Judge,
    Opinion, OpinionMap, Presence, Report, Rubric, RubricDimension, RunDiagnostics, ScoreTrace,
    SynthesisRule, TargetArtifact, ValidationError,
};

pub use evaluators::{Evaluator, HeuristicEvaluator, LlmEvaluator};
pub use execution::{call_with_retry, CollaboratorError, CollaboratorResult, RetryPolicy};
pub use investigators::{
    DocInvestigator, InvestigationSession, Investigator, RepoInvestigator, VisionInspector,
};
pub use llm::{ChatModel, LlmConfig, OpenAiChatClient};

pub use orchestration::{
    audit_coverage, AuditContext, AuditGraph, AuditGraphBuilder, AuditOutcome, CoverageAudit,
    RunState, Stage, Subject,
};

pub use reporting::{render_report_md, ReportArtifact, ReportStore, SavedReport};

pub use telemetry::init_tracing;

pub use synthesis::{
    AbsenceMatcher, EvidenceMatcher, GoalMentionMatcher, LlmSummary, SummaryGenerator,
    SynthesisEngine, SynthesisPolicy, TemplateSummary,
};

/// Version of the auditor
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
