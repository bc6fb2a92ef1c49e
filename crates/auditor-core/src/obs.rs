//! Structured lifecycle events for an audit run.
//!
//! - `RunSpan` RAII guard tagging everything inside a run with its id
//! - `emit_*` functions for stage, barrier, degradation and verdict events
//!
//! Events are emitted at `info!` (degradations at `warn!`); filter them with
//! `AUDITOR_LOG`.

use std::fmt::Display;

use tracing::{info, warn};

use crate::domain::SynthesisRule;

/// RAII guard that keeps the `auditor.run` span entered.
///
/// Not `Send`; async code should use [`run_span`] with `Instrument` instead.
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    pub fn enter(run_id: &str) -> Self {
        Self {
            _span: run_span(run_id).entered(),
        }
    }
}

/// The span every run executes under.
pub fn run_span(run_id: &str) -> tracing::Span {
    tracing::info_span!("auditor.run", run_id = %run_id)
}

pub fn emit_run_started(run_id: &str, subject: &str, dimensions: usize) {
    info!(event = "run.started", run_id = %run_id, subject = %subject, dimensions);
}

pub fn emit_stage_started(stage: impl Display, branches: usize) {
    info!(event = "stage.started", stage = %stage, branches);
}

pub fn emit_stage_finished(stage: impl Display, records: usize, duration_ms: u64) {
    info!(event = "stage.finished", stage = %stage, records, duration_ms);
}

/// Barrier audit result. `missing` lists dimensions without evidence.
pub fn emit_barrier_coverage(covered: usize, missing: &[String]) {
    if missing.is_empty() {
        info!(event = "barrier.coverage", covered, missing = 0);
    } else {
        warn!(
            event = "barrier.coverage",
            covered,
            missing = missing.len(),
            dimensions = %missing.join(","),
            "dimensions without evidence"
        );
    }
}

/// A branch or a single collaborator call degraded to sentinel records.
pub fn emit_branch_degraded(branch: &str, records: usize, reason: &dyn Display) {
    warn!(event = "branch.degraded", branch = %branch, records, reason = %reason);
}

pub fn emit_criterion_synthesized(dimension_id: &str, final_score: u8, rules: &[SynthesisRule]) {
    let rules = rules
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    info!(
        event = "criterion.synthesized",
        dimension = %dimension_id,
        final_score,
        rules = %rules,
    );
}

pub fn emit_run_finished(run_id: &str, overall_score: f64, criteria: usize, duration_ms: u64) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        overall_score,
        criteria,
        duration_ms,
    );
}
