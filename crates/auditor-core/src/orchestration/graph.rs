//! The audit graph: investigation fan-out, evidence barrier, evaluation
//! fan-out, synthesis.
//!
//! Branches run as tokio tasks in a [`JoinSet`] and never share mutable
//! state. Each returns its own partial [`CriterionMap`]; the orchestrator
//! folds them in as they complete. A branch that errors, times out, or
//! panics is replaced by explicit failure records so every downstream stage
//! still sees a complete picture.

use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures::future::join_all;
use futures::FutureExt;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn, Instrument};
use uuid::Uuid;

use crate::config::{AuditConfig, EvaluatorKind, DEFAULT_MAX_CONCURRENT};
use crate::domain::{
    AuditError, AuditResult, CriterionMap, Evidence, EvidenceMap, Judge, Opinion, OpinionMap,
    Report, RubricDimension, RunDiagnostics,
};
use crate::evaluators::{Evaluator, HeuristicEvaluator, LlmEvaluator};
use crate::execution::{call_with_retry, CollaboratorError, CollaboratorResult, RetryPolicy};
use crate::investigators::{DocInvestigator, Investigator, RepoInvestigator, VisionInspector};
use crate::llm::{ChatModel, OpenAiChatClient};
use crate::obs;
use crate::synthesis::{LlmSummary, SummaryGenerator, SynthesisEngine, TemplateSummary};

use super::barrier::{audit_coverage, CoverageAudit};
use super::context::{AuditContext, Subject};

/// Graph stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Context,
    Investigation,
    EvidenceBarrier,
    Evaluation,
    Synthesis,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::Context => "context",
            Stage::Investigation => "investigation",
            Stage::EvidenceBarrier => "evidence_barrier",
            Stage::Evaluation => "evaluation",
            Stage::Synthesis => "synthesis",
        };
        write!(f, "{s}")
    }
}

/// Run-scoped aggregate, written only by the orchestrator's merge step.
#[derive(Debug, Clone, Serialize)]
pub struct RunState {
    pub run_id: Uuid,
    pub evidence: EvidenceMap,
    pub opinions: OpinionMap,
    pub coverage: CoverageAudit,
    /// Failure records substituted for errored, timed-out or panicked work.
    pub degraded_records: usize,
    pub completed: Vec<Stage>,
}

impl RunState {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            evidence: EvidenceMap::new(),
            opinions: OpinionMap::new(),
            coverage: CoverageAudit::default(),
            degraded_records: 0,
            completed: Vec::new(),
        }
    }
}

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct AuditOutcome {
    pub run_id: Uuid,
    pub report: Report,
    pub state: RunState,
}

/// One branch's partial update.
struct Branch<T> {
    records: CriterionMap<T>,
    degraded: usize,
}

impl<T> Branch<T> {
    fn new() -> Self {
        Self {
            records: CriterionMap::new(),
            degraded: 0,
        }
    }

    fn degrade(&mut self, criterion_id: &str, record: T) {
        self.records.push(criterion_id, record);
        self.degraded += 1;
    }
}

type BranchResult<T> = (usize, std::thread::Result<Branch<T>>);

/// The assembled pipeline. Cheap to share; holds no per-run state.
pub struct AuditGraph {
    investigators: Vec<Arc<dyn Investigator>>,
    evaluators: BTreeMap<Judge, Arc<dyn Evaluator>>,
    summarizer: Arc<dyn SummaryGenerator>,
    engine: Arc<SynthesisEngine>,
    retry: RetryPolicy,
    max_concurrent: usize,
}

/// Builder for [`AuditGraph`].
pub struct AuditGraphBuilder {
    investigators: Vec<Arc<dyn Investigator>>,
    evaluators: BTreeMap<Judge, Arc<dyn Evaluator>>,
    summarizer: Arc<dyn SummaryGenerator>,
    engine: SynthesisEngine,
    retry: RetryPolicy,
    max_concurrent: usize,
}

impl Default for AuditGraphBuilder {
    fn default() -> Self {
        Self {
            investigators: Vec::new(),
            evaluators: BTreeMap::new(),
            summarizer: Arc::new(TemplateSummary),
            engine: SynthesisEngine::default(),
            retry: RetryPolicy::default(),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }
}

impl AuditGraphBuilder {
    pub fn investigator(mut self, investigator: Arc<dyn Investigator>) -> Self {
        self.investigators.push(investigator);
        self
    }

    /// Register the evaluator backing one judge persona. Replaces any earlier one.
    pub fn evaluator(mut self, judge: Judge, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluators.insert(judge, evaluator);
        self
    }

    /// Back every judge persona with the same evaluator.
    pub fn evaluator_for_all(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        for judge in Judge::ALL {
            self.evaluators.insert(judge, Arc::clone(&evaluator));
        }
        self
    }

    pub fn summarizer(mut self, summarizer: Arc<dyn SummaryGenerator>) -> Self {
        self.summarizer = summarizer;
        self
    }

    pub fn engine(mut self, engine: SynthesisEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Upper bound on evaluator calls in flight across all judges.
    pub fn max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    /// Fails when a judge persona has no evaluator.
    pub fn build(self) -> AuditResult<AuditGraph> {
        let missing: Vec<String> = Judge::ALL
            .iter()
            .filter(|j| !self.evaluators.contains_key(*j))
            .map(ToString::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(AuditError::Configuration(format!(
                "no evaluator registered for: {}",
                missing.join(", ")
            )));
        }
        if self.max_concurrent == 0 {
            return Err(AuditError::Configuration(
                "max_concurrent must be at least 1".to_string(),
            ));
        }

        Ok(AuditGraph {
            investigators: self.investigators,
            evaluators: self.evaluators,
            summarizer: self.summarizer,
            engine: Arc::new(self.engine),
            retry: self.retry,
            max_concurrent: self.max_concurrent,
        })
    }
}

impl AuditGraph {
    pub fn builder() -> AuditGraphBuilder {
        AuditGraphBuilder::default()
    }

    /// Built-in collaborators: repository, document and diagram
    /// investigators, plus heuristic or LLM-backed judges per `config`.
    pub fn standard(config: &AuditConfig) -> AuditResult<Self> {
        let builder = Self::builder()
            .investigator(Arc::new(RepoInvestigator))
            .investigator(Arc::new(DocInvestigator))
            .investigator(Arc::new(VisionInspector))
            .retry_policy(config.retry.clone())
            .max_concurrent(config.max_concurrent);

        let builder = match config.evaluator {
            EvaluatorKind::Heuristic => builder.evaluator_for_all(Arc::new(HeuristicEvaluator)),
            EvaluatorKind::Llm => {
                let client = OpenAiChatClient::new(config.llm.clone())
                    .map_err(|e| AuditError::Configuration(format!("chat client: {e}")))?;
                let model: Arc<dyn ChatModel> = Arc::new(client);
                builder
                    .evaluator_for_all(Arc::new(LlmEvaluator::new(Arc::clone(&model))))
                    .summarizer(Arc::new(LlmSummary::new(model)))
            }
        };
        builder.build()
    }

    /// Execute every stage exactly once for `context`.
    pub async fn run(&self, context: AuditContext) -> AuditResult<AuditOutcome> {
        let run_id = Uuid::new_v4();
        let span = obs::run_span(&run_id.to_string());
        self.execute(run_id, context).instrument(span).await
    }

    async fn execute(&self, run_id: Uuid, context: AuditContext) -> AuditResult<AuditOutcome> {
        let started = Instant::now();
        let AuditContext { subject, rubric } = context;
        obs::emit_run_started(&run_id.to_string(), &subject.repo, rubric.dimensions.len());

        let mut state = RunState::new(run_id);
        let subject = Arc::new(subject);
        let dimensions = Arc::new(rubric.dimensions);
        state.completed.push(Stage::Context);

        // Investigation fan-out, then barrier.
        let (evidence, degraded) = self.investigate(&subject, &dimensions).await;
        state.evidence = evidence;
        state.degraded_records += degraded;
        state.completed.push(Stage::Investigation);

        state.coverage = audit_coverage(&state.evidence, &dimensions);
        state.completed.push(Stage::EvidenceBarrier);

        // Evaluation fan-out over frozen evidence.
        let frozen = Arc::new(std::mem::take(&mut state.evidence));
        let (opinions, degraded) = self.deliberate(&frozen, &dimensions).await;
        state.evidence = Arc::try_unwrap(frozen).unwrap_or_else(|shared| (*shared).clone());
        state.opinions = opinions;
        state.degraded_records += degraded;
        state.degraded_records += backfill_opinions(&mut state.opinions, &dimensions);
        state.completed.push(Stage::Evaluation);

        // Synthesis.
        let diagnostics = RunDiagnostics {
            missing_evidence: state.coverage.missing.clone(),
            skipped_dimensions: Vec::new(),
            degraded_records: state.degraded_records,
            summary_fallback: false,
        };
        let report = self.engine.synthesize(
            &subject.repo,
            &dimensions,
            &state.evidence,
            &state.opinions,
            diagnostics,
        )?;
        let bounded = BoundedSummary {
            inner: self.summarizer.as_ref(),
            retry: &self.retry,
        };
        let report = self.engine.summarize(report, &bounded).await;
        state.completed.push(Stage::Synthesis);

        obs::emit_run_finished(
            &run_id.to_string(),
            report.overall_score,
            report.criteria.len(),
            started.elapsed().as_millis() as u64,
        );

        Ok(AuditOutcome {
            run_id,
            report,
            state,
        })
    }

    #[instrument(skip_all, fields(stage = %Stage::Investigation))]
    async fn investigate(
        &self,
        subject: &Arc<Subject>,
        dimensions: &Arc<Vec<RubricDimension>>,
    ) -> (EvidenceMap, usize) {
        let started = Instant::now();
        let mut set = JoinSet::new();
        let mut routed: BTreeMap<usize, (String, Vec<RubricDimension>)> = BTreeMap::new();

        for (idx, investigator) in self.investigators.iter().enumerate() {
            let dims: Vec<RubricDimension> = dimensions
                .iter()
                .filter(|d| d.target_artifact == investigator.artifact())
                .cloned()
                .collect();
            if dims.is_empty() {
                debug!(investigator = %investigator.name(), "no dimensions routed; branch skipped");
                continue;
            }
            routed.insert(idx, (investigator.name().to_string(), dims.clone()));

            let investigator = Arc::clone(investigator);
            let subject = Arc::clone(subject);
            let retry = self.retry.clone();
            set.spawn(async move {
                let out = AssertUnwindSafe(investigate_branch(investigator, subject, dims, retry))
                    .catch_unwind()
                    .await;
                (idx, out)
            });
        }
        obs::emit_stage_started(Stage::Investigation, routed.len());

        let (evidence, degraded) = join_branches(set, &routed, |name, dims, reason| {
            let mut branch = Branch::new();
            for d in dims {
                branch.degrade(&d.id, investigation_failure(name, d, &reason));
            }
            branch
        })
        .await;

        obs::emit_stage_finished(
            Stage::Investigation,
            evidence.record_count(),
            started.elapsed().as_millis() as u64,
        );
        (evidence, degraded)
    }

    #[instrument(skip_all, fields(stage = %Stage::Evaluation))]
    async fn deliberate(
        &self,
        evidence: &Arc<EvidenceMap>,
        dimensions: &Arc<Vec<RubricDimension>>,
    ) -> (OpinionMap, usize) {
        let started = Instant::now();
        let mut set = JoinSet::new();
        let mut routed: BTreeMap<usize, (String, Vec<RubricDimension>)> = BTreeMap::new();
        let mut judges: BTreeMap<usize, Judge> = BTreeMap::new();
        let permits = Arc::new(Semaphore::new(self.max_concurrent));

        for (idx, (judge, evaluator)) in self.evaluators.iter().enumerate() {
            let judge = *judge;
            routed.insert(idx, (judge.to_string(), dimensions.to_vec()));
            judges.insert(idx, judge);

            let evaluator = Arc::clone(evaluator);
            let evidence = Arc::clone(evidence);
            let dimensions = Arc::clone(dimensions);
            let retry = self.retry.clone();
            let permits = Arc::clone(&permits);
            set.spawn(async move {
                let branch = evaluation_branch(judge, evaluator, evidence, dimensions, retry, permits);
                let out = AssertUnwindSafe(branch).catch_unwind().await;
                (idx, out)
            });
        }
        obs::emit_stage_started(Stage::Evaluation, routed.len());

        let (opinions, degraded) = join_branches(set, &routed, |name, dims, reason| {
            let mut branch = Branch::new();
            if let Some(judge) = Judge::ALL.iter().find(|j| j.to_string() == name) {
                for d in dims {
                    branch.degrade(&d.id, Opinion::failure(*judge, &d.id, reason));
                }
            }
            branch
        })
        .await;

        obs::emit_stage_finished(
            Stage::Evaluation,
            opinions.record_count(),
            started.elapsed().as_millis() as u64,
        );
        (opinions, degraded)
    }
}

/// Fan-in: merge branches in completion order. A branch that panicked or
/// never completed contributes `fallback` records instead.
async fn join_branches<T, F>(
    mut set: JoinSet<BranchResult<T>>,
    routed: &BTreeMap<usize, (String, Vec<RubricDimension>)>,
    fallback: F,
) -> (CriterionMap<T>, usize)
where
    T: Send + 'static,
    F: Fn(&str, &[RubricDimension], &str) -> Branch<T>,
{
    let mut merged = CriterionMap::new();
    let mut degraded = 0;
    let mut pending: BTreeSet<usize> = routed.keys().copied().collect();

    while let Some(joined) = set.join_next().await {
        let (idx, outcome) = match joined {
            Ok(done) => done,
            Err(e) => {
                warn!(error = %e, "branch task did not complete");
                continue;
            }
        };
        pending.remove(&idx);

        let branch = match outcome {
            Ok(branch) => branch,
            Err(payload) => {
                let reason = format!("branch panicked: {}", panic_message(payload.as_ref()));
                match routed.get(&idx) {
                    Some((name, dims)) => {
                        obs::emit_branch_degraded(name, dims.len(), &reason);
                        fallback(name, dims, &reason)
                    }
                    None => continue,
                }
            }
        };
        degraded += branch.degraded;
        merged.merge(branch.records);
    }

    for idx in pending {
        if let Some((name, dims)) = routed.get(&idx) {
            let reason = "branch task was cancelled";
            obs::emit_branch_degraded(name, dims.len(), &reason);
            let branch = fallback(name, dims, reason);
            degraded += branch.degraded;
            merged.merge(branch.records);
        }
    }

    (merged, degraded)
}

fn investigation_failure(branch: &str, dimension: &RubricDimension, reason: &dyn std::fmt::Display) -> Evidence {
    Evidence::failure(
        format!("Investigate {}", dimension.display_name()),
        branch,
        reason,
    )
}

/// One investigator over its routed dimensions, sequentially.
async fn investigate_branch(
    investigator: Arc<dyn Investigator>,
    subject: Arc<Subject>,
    dims: Vec<RubricDimension>,
    retry: RetryPolicy,
) -> Branch<Evidence> {
    let name = investigator.name().to_string();
    let mut branch = Branch::new();

    let open_label = format!("{name}.open");
    let session = match call_with_retry(&retry, &open_label, || investigator.open(&subject)).await {
        Ok(session) => session,
        Err(e) => {
            obs::emit_branch_degraded(&name, dims.len(), &e);
            for d in &dims {
                branch.degrade(&d.id, investigation_failure(&name, d, &e));
            }
            return branch;
        }
    };

    for d in &dims {
        let label = format!("{name}:{}", d.id);
        match call_with_retry(&retry, &label, || session.examine(d)).await {
            Ok(records) => {
                for record in records {
                    match record.validate() {
                        Ok(()) => branch.records.push(d.id.as_str(), record),
                        Err(e) => {
                            obs::emit_branch_degraded(&label, 1, &e);
                            branch.degrade(&d.id, investigation_failure(&name, d, &e));
                        }
                    }
                }
            }
            Err(e) => {
                obs::emit_branch_degraded(&label, 1, &e);
                branch.degrade(&d.id, investigation_failure(&name, d, &e));
            }
        }
    }
    info!(investigator = %name, records = branch.records.record_count(), "investigation finished");
    branch
}

/// One judge over every dimension, concurrently per dimension.
///
/// Each call holds a permit from `permits`, shared by every judge in the run.
async fn evaluation_branch(
    judge: Judge,
    evaluator: Arc<dyn Evaluator>,
    evidence: Arc<EvidenceMap>,
    dimensions: Arc<Vec<RubricDimension>>,
    retry: RetryPolicy,
    permits: Arc<Semaphore>,
) -> Branch<Opinion> {
    let calls = dimensions.iter().map(|d| {
        let evaluator = &evaluator;
        let evidence = &evidence;
        let retry = &retry;
        let permits = &permits;
        async move {
            let _permit = permits.acquire().await.ok();
            let label = format!("{judge}:{}", d.id);
            let result = call_with_retry(retry, &label, || {
                evaluator.evaluate(d, evidence.get(&d.id), judge)
            })
            .await;
            (d, result)
        }
    });
    let results = join_all(calls).await;

    let mut branch = Branch::new();
    for (d, result) in results {
        match result.and_then(|op| accept_opinion(op, judge, &d.id)) {
            Ok(op) => branch.records.push(d.id.as_str(), op),
            Err(e) => {
                obs::emit_branch_degraded(&format!("{judge}:{}", d.id), 1, &e);
                branch.degrade(&d.id, Opinion::failure(judge, &d.id, &e));
            }
        }
    }
    branch
}

/// Reject opinions that are misattributed or out of range.
fn accept_opinion(op: Opinion, judge: Judge, criterion_id: &str) -> CollaboratorResult<Opinion> {
    if op.judge != judge || op.criterion_id != criterion_id {
        return Err(CollaboratorError::InvalidResponse(format!(
            "expected opinion from {judge} on {criterion_id}, got {} on {}",
            op.judge, op.criterion_id
        )));
    }
    op.validate()
        .map_err(|e| CollaboratorError::InvalidResponse(e.to_string()))?;
    Ok(op)
}

/// Fill every missing (judge, dimension) pair with a failure marker.
fn backfill_opinions(opinions: &mut OpinionMap, dimensions: &[RubricDimension]) -> usize {
    let mut filled = 0;
    for d in dimensions {
        for judge in Judge::ALL {
            if !opinions.has_opinion(judge, &d.id) {
                warn!(judge = %judge, dimension = %d.id, "no opinion rendered; recording failure marker");
                opinions.push(d.id.as_str(), Opinion::failure(judge, &d.id, "no opinion rendered"));
                filled += 1;
            }
        }
    }
    filled
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Applies the run's retry policy to the summary call.
struct BoundedSummary<'a> {
    inner: &'a dyn SummaryGenerator,
    retry: &'a RetryPolicy,
}

#[async_trait]
impl SummaryGenerator for BoundedSummary<'_> {
    async fn summarize(&self, report: &Report) -> CollaboratorResult<String> {
        call_with_retry(self.retry, "summary", || self.inner.summarize(report)).await
    }
}
