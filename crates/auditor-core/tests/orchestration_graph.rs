//! Audit graph runs with scripted collaborators: fan-out, barrier,
//! deliberation, degradation, and synthesis.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use auditor_core::{
    AuditContext, AuditGraph, CollaboratorError, CollaboratorResult, Evaluator, Evidence,
    InvestigationSession, Investigator, Judge, Opinion, Presence, Report, RetryPolicy, Rubric,
    RubricDimension, Stage, Subject, SummaryGenerator, TargetArtifact,
};

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        timeout_ms: 200,
        max_retries: 0,
        backoff_base_ms: 1,
    }
}

fn rubric() -> Rubric {
    Rubric::new(vec![
        RubricDimension::new("git_forensic_analysis", "Git Forensic Analysis", TargetArtifact::GithubRepo),
        RubricDimension::new("theoretical_depth", "Theoretical Depth", TargetArtifact::PdfReport),
        RubricDimension::new("swarm_visual", "Architectural Diagram", TargetArtifact::PdfImages),
    ])
    .unwrap()
}

fn context() -> AuditContext {
    AuditContext::new(Subject::new("https://example.com/repo.git"), rubric())
}

/// Emits one present record per dimension, goal named after the dimension.
struct StaticInvestigator {
    name: &'static str,
    artifact: TargetArtifact,
}

struct StaticSession;

#[async_trait]
impl InvestigationSession for StaticSession {
    async fn examine(&self, dimension: &RubricDimension) -> CollaboratorResult<Vec<Evidence>> {
        Ok(vec![Evidence::new(
            dimension.id.clone(),
            Presence::Present,
            "src/",
            "observed",
            0.9,
        )])
    }
}

#[async_trait]
impl Investigator for StaticInvestigator {
    fn name(&self) -> &str {
        self.name
    }

    fn artifact(&self) -> TargetArtifact {
        self.artifact
    }

    async fn open(&self, _subject: &Subject) -> CollaboratorResult<Box<dyn InvestigationSession>> {
        Ok(Box::new(StaticSession))
    }
}

/// Reports a confidence no calibrated tool could produce.
struct OverconfidentInvestigator;

struct OverconfidentSession;

#[async_trait]
impl InvestigationSession for OverconfidentSession {
    async fn examine(&self, dimension: &RubricDimension) -> CollaboratorResult<Vec<Evidence>> {
        Ok(vec![Evidence::new(
            dimension.id.clone(),
            Presence::Present,
            "src/",
            "certain beyond certainty",
            1.2,
        )])
    }
}

#[async_trait]
impl Investigator for OverconfidentInvestigator {
    fn name(&self) -> &str {
        "repo_investigator"
    }

    fn artifact(&self) -> TargetArtifact {
        TargetArtifact::GithubRepo
    }

    async fn open(&self, _subject: &Subject) -> CollaboratorResult<Box<dyn InvestigationSession>> {
        Ok(Box::new(OverconfidentSession))
    }
}

struct PanickingInvestigator;

#[async_trait]
impl Investigator for PanickingInvestigator {
    fn name(&self) -> &str {
        "doc_analyst"
    }

    fn artifact(&self) -> TargetArtifact {
        TargetArtifact::PdfReport
    }

    async fn open(&self, _subject: &Subject) -> CollaboratorResult<Box<dyn InvestigationSession>> {
        panic!("pdf parser exploded");
    }
}

struct UnavailableInvestigator;

#[async_trait]
impl Investigator for UnavailableInvestigator {
    fn name(&self) -> &str {
        "repo_investigator"
    }

    fn artifact(&self) -> TargetArtifact {
        TargetArtifact::GithubRepo
    }

    async fn open(&self, _subject: &Subject) -> CollaboratorResult<Box<dyn InvestigationSession>> {
        Err(CollaboratorError::Unavailable("clone refused".to_string()))
    }
}

fn standard_investigators() -> Vec<Arc<dyn Investigator>> {
    vec![
        Arc::new(StaticInvestigator {
            name: "repo_investigator",
            artifact: TargetArtifact::GithubRepo,
        }),
        Arc::new(StaticInvestigator {
            name: "doc_analyst",
            artifact: TargetArtifact::PdfReport,
        }),
        Arc::new(StaticInvestigator {
            name: "vision_inspector",
            artifact: TargetArtifact::PdfImages,
        }),
    ]
}

/// Fixed score per judge; records every call it receives.
#[derive(Default)]
struct RecordingEvaluator {
    seen: Mutex<Vec<(Judge, String, Vec<String>)>>,
}

#[async_trait]
impl Evaluator for RecordingEvaluator {
    fn name(&self) -> &str {
        "recording"
    }

    async fn evaluate(
        &self,
        dimension: &RubricDimension,
        evidence: &[Evidence],
        judge: Judge,
    ) -> CollaboratorResult<Opinion> {
        let goals = evidence.iter().map(|ev| ev.goal.clone()).collect();
        self.seen
            .lock()
            .unwrap()
            .push((judge, dimension.id.clone(), goals));
        let score = match judge {
            Judge::Prosecutor => 3,
            Judge::Defense => 4,
            Judge::TechLead => 4,
        };
        Ok(Opinion::new(judge, &dimension.id, score, format!("{judge} reviewed {}", dimension.id)))
    }
}

struct SlowEvaluator;

#[async_trait]
impl Evaluator for SlowEvaluator {
    fn name(&self) -> &str {
        "slow"
    }

    async fn evaluate(
        &self,
        dimension: &RubricDimension,
        _evidence: &[Evidence],
        judge: Judge,
    ) -> CollaboratorResult<Opinion> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Opinion::new(judge, &dimension.id, 5, "too late"))
    }
}

/// Tracks how many calls overlap at once.
#[derive(Default)]
struct CountingEvaluator {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    calls: AtomicUsize,
}

#[async_trait]
impl Evaluator for CountingEvaluator {
    fn name(&self) -> &str {
        "counting"
    }

    async fn evaluate(
        &self,
        dimension: &RubricDimension,
        _evidence: &[Evidence],
        judge: Judge,
    ) -> CollaboratorResult<Opinion> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Opinion::new(judge, &dimension.id, 3, "counted"))
    }
}

/// Answers for the wrong judge.
struct MisattributingEvaluator;

#[async_trait]
impl Evaluator for MisattributingEvaluator {
    fn name(&self) -> &str {
        "misattributing"
    }

    async fn evaluate(
        &self,
        dimension: &RubricDimension,
        _evidence: &[Evidence],
        _judge: Judge,
    ) -> CollaboratorResult<Opinion> {
        Ok(Opinion::new(Judge::Defense, &dimension.id, 5, "I am everyone"))
    }
}

struct FailingSummary;

#[async_trait]
impl SummaryGenerator for FailingSummary {
    async fn summarize(&self, _report: &Report) -> CollaboratorResult<String> {
        Err(CollaboratorError::Unavailable("model offline".to_string()))
    }
}

struct FixedSummary;

#[async_trait]
impl SummaryGenerator for FixedSummary {
    async fn summarize(&self, _report: &Report) -> CollaboratorResult<String> {
        Ok("The court has spoken.".to_string())
    }
}

fn graph_with(
    investigators: Vec<Arc<dyn Investigator>>,
    evaluator: Arc<dyn Evaluator>,
) -> auditor_core::AuditGraphBuilder {
    let mut builder = AuditGraph::builder().retry_policy(fast_retry());
    for inv in investigators {
        builder = builder.investigator(inv);
    }
    builder.evaluator_for_all(evaluator)
}

#[tokio::test]
async fn test_full_run_scores_every_dimension() {
    let graph = graph_with(standard_investigators(), Arc::new(RecordingEvaluator::default()))
        .build()
        .unwrap();

    let outcome = graph.run(context()).await.unwrap();

    assert_eq!(
        outcome.state.completed,
        vec![
            Stage::Context,
            Stage::Investigation,
            Stage::EvidenceBarrier,
            Stage::Evaluation,
            Stage::Synthesis,
        ]
    );
    assert!(outcome.state.coverage.is_complete());
    assert_eq!(outcome.state.degraded_records, 0);

    let report = &outcome.report;
    assert_eq!(report.subject_id, "https://example.com/repo.git");
    let ids: Vec<&str> = report.criteria.iter().map(|c| c.dimension_id.as_str()).collect();
    assert_eq!(ids, vec!["git_forensic_analysis", "theoretical_depth", "swarm_visual"]);
    for c in &report.criteria {
        assert_eq!(c.judge_opinions.len(), 3, "{}", c.dimension_id);
    }
    // 11/3 on the repo dimension, then functionality pulls toward 4.
    assert_eq!(report.criterion("git_forensic_analysis").unwrap().final_score, 4);
    assert_eq!(report.criterion("theoretical_depth").unwrap().final_score, 4);
    assert!(!report.diagnostics.summary_fallback);
}

#[tokio::test]
async fn test_evaluators_see_only_their_dimension_evidence() {
    let evaluator = Arc::new(RecordingEvaluator::default());
    let graph = graph_with(standard_investigators(), evaluator.clone())
        .build()
        .unwrap();

    graph.run(context()).await.unwrap();

    let seen = evaluator.seen.lock().unwrap();
    assert_eq!(seen.len(), 9, "three judges times three dimensions");
    for (judge, dimension, goals) in seen.iter() {
        assert_eq!(goals, &vec![dimension.clone()], "{judge} on {dimension}");
    }
}

#[tokio::test]
async fn test_panicking_investigator_degrades_to_failure_evidence() {
    let investigators: Vec<Arc<dyn Investigator>> = vec![
        Arc::new(StaticInvestigator {
            name: "repo_investigator",
            artifact: TargetArtifact::GithubRepo,
        }),
        Arc::new(PanickingInvestigator),
        Arc::new(StaticInvestigator {
            name: "vision_inspector",
            artifact: TargetArtifact::PdfImages,
        }),
    ];
    let graph = graph_with(investigators, Arc::new(RecordingEvaluator::default()))
        .build()
        .unwrap();

    let outcome = graph.run(context()).await.unwrap();

    let records = outcome.state.evidence.get("theoretical_depth");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].found, Presence::Absent);
    assert_eq!(records[0].confidence, 1.0);
    assert!(records[0].rationale.contains("pdf parser exploded"));
    assert_eq!(outcome.state.degraded_records, 1);

    // The other branches were unaffected.
    assert_eq!(outcome.state.evidence.get("git_forensic_analysis")[0].found, Presence::Present);
    assert_eq!(outcome.report.criteria.len(), 3);
    assert_eq!(outcome.report.diagnostics.degraded_records, 1);
}

#[tokio::test]
async fn test_out_of_range_evidence_degrades_instead_of_aborting() {
    let investigators: Vec<Arc<dyn Investigator>> = vec![
        Arc::new(OverconfidentInvestigator),
        Arc::new(StaticInvestigator {
            name: "doc_analyst",
            artifact: TargetArtifact::PdfReport,
        }),
        Arc::new(StaticInvestigator {
            name: "vision_inspector",
            artifact: TargetArtifact::PdfImages,
        }),
    ];
    let graph = graph_with(investigators, Arc::new(RecordingEvaluator::default()))
        .build()
        .unwrap();

    let outcome = graph.run(context()).await.unwrap();

    let records = outcome.state.evidence.get("git_forensic_analysis");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].found, Presence::Absent);
    assert_eq!(records[0].confidence, 1.0);
    assert!(records[0].rationale.starts_with("investigation failed:"));
    assert!(records[0].rationale.contains("confidence 1.2"));
    assert_eq!(outcome.state.degraded_records, 1);
    assert!(outcome.state.coverage.is_complete());

    assert_eq!(outcome.report.criteria.len(), 3);
    assert_eq!(outcome.report.diagnostics.degraded_records, 1);
}

#[tokio::test]
async fn test_unavailable_investigator_records_sentinel() {
    let investigators: Vec<Arc<dyn Investigator>> = vec![Arc::new(UnavailableInvestigator)];
    let graph = graph_with(investigators, Arc::new(RecordingEvaluator::default()))
        .build()
        .unwrap();

    let outcome = graph.run(context()).await.unwrap();

    let records = outcome.state.evidence.get("git_forensic_analysis");
    assert_eq!(records.len(), 1);
    assert!(records[0].rationale.starts_with("investigation failed:"));
    assert!(records[0].rationale.contains("clone refused"));
    assert_eq!(
        outcome.state.coverage.missing,
        vec!["theoretical_depth".to_string(), "swarm_visual".to_string()]
    );
    assert_eq!(
        outcome.report.diagnostics.missing_evidence,
        outcome.state.coverage.missing
    );
}

#[tokio::test]
async fn test_timed_out_judge_yields_failure_opinions() {
    let graph = AuditGraph::builder()
        .retry_policy(RetryPolicy {
            timeout_ms: 50,
            max_retries: 0,
            backoff_base_ms: 1,
        })
        .investigator(Arc::new(StaticInvestigator {
            name: "repo_investigator",
            artifact: TargetArtifact::GithubRepo,
        }))
        .evaluator(Judge::Prosecutor, Arc::new(RecordingEvaluator::default()))
        .evaluator(Judge::Defense, Arc::new(RecordingEvaluator::default()))
        .evaluator(Judge::TechLead, Arc::new(SlowEvaluator))
        .build()
        .unwrap();

    let outcome = graph.run(context()).await.unwrap();

    for c in &outcome.report.criteria {
        let tech_lead = c
            .judge_opinions
            .iter()
            .find(|op| op.judge == Judge::TechLead)
            .unwrap();
        assert_eq!(tech_lead.score, 1);
        assert!(tech_lead.argument.starts_with("Evaluation failed:"));
    }
    assert_eq!(outcome.state.degraded_records, 3);
}

#[tokio::test]
async fn test_misattributed_opinions_are_replaced() {
    let graph = graph_with(standard_investigators(), Arc::new(MisattributingEvaluator))
        .build()
        .unwrap();

    let outcome = graph.run(context()).await.unwrap();

    for c in &outcome.report.criteria {
        assert_eq!(c.judge_opinions.len(), 3);
        let judges: Vec<Judge> = c.judge_opinions.iter().map(|op| op.judge).collect();
        assert_eq!(judges, Judge::ALL.to_vec());
        let defense = &c.judge_opinions[1];
        assert_eq!(defense.score, 5);
        assert_eq!(c.judge_opinions[0].score, 1);
        assert_eq!(c.judge_opinions[2].score, 1);
    }
    assert_eq!(outcome.state.degraded_records, 6);
}

#[tokio::test]
async fn test_unrouted_dimension_is_missing_but_still_judged() {
    let rubric = Rubric::new(vec![
        RubricDimension::new("git_forensic_analysis", "Git Forensic Analysis", TargetArtifact::GithubRepo),
        RubricDimension::new("chief_justice_synthesis", "Chief Justice Synthesis", TargetArtifact::Other),
    ])
    .unwrap();
    let graph = graph_with(standard_investigators(), Arc::new(RecordingEvaluator::default()))
        .build()
        .unwrap();

    let outcome = graph
        .run(AuditContext::new(Subject::new("repo"), rubric))
        .await
        .unwrap();

    assert_eq!(
        outcome.report.diagnostics.missing_evidence,
        vec!["chief_justice_synthesis".to_string()]
    );
    assert!(outcome.report.criterion("chief_justice_synthesis").is_some());
}

#[tokio::test]
async fn test_failing_summary_falls_back_to_template() {
    let graph = graph_with(standard_investigators(), Arc::new(RecordingEvaluator::default()))
        .summarizer(Arc::new(FailingSummary))
        .build()
        .unwrap();

    let outcome = graph.run(context()).await.unwrap();

    assert!(outcome.report.diagnostics.summary_fallback);
    assert!(outcome
        .report
        .executive_summary
        .starts_with("Audit of https://example.com/repo.git evaluated 3 dimension(s)"));
}

#[tokio::test]
async fn test_generated_summary_is_used() {
    let graph = graph_with(standard_investigators(), Arc::new(RecordingEvaluator::default()))
        .summarizer(Arc::new(FixedSummary))
        .build()
        .unwrap();

    let outcome = graph.run(context()).await.unwrap();

    assert_eq!(outcome.report.executive_summary, "The court has spoken.");
    assert!(!outcome.report.diagnostics.summary_fallback);
}

#[tokio::test]
async fn test_empty_rubric_produces_empty_report() {
    let graph = graph_with(standard_investigators(), Arc::new(RecordingEvaluator::default()))
        .build()
        .unwrap();

    let outcome = graph
        .run(AuditContext::new(Subject::new("repo"), Rubric::default()))
        .await
        .unwrap();

    assert!(outcome.report.criteria.is_empty());
    assert_eq!(outcome.report.overall_score, 0.0);
    assert!(outcome.state.evidence.is_empty());
}

#[tokio::test]
async fn test_evaluator_calls_share_one_concurrency_limit() {
    let dimensions: Vec<RubricDimension> = (0..40)
        .map(|i| RubricDimension::new(format!("dimension_{i}"), format!("Dimension {i}"), TargetArtifact::Other))
        .collect();
    let ctx = AuditContext::new(
        Subject::new("https://example.com/repo.git"),
        Rubric::new(dimensions).unwrap(),
    );
    let evaluator = Arc::new(CountingEvaluator::default());
    let graph = graph_with(Vec::new(), evaluator.clone())
        .retry_policy(RetryPolicy {
            timeout_ms: 5_000,
            max_retries: 0,
            backoff_base_ms: 1,
        })
        .max_concurrent(4)
        .build()
        .unwrap();

    let outcome = graph.run(ctx).await.unwrap();

    assert_eq!(evaluator.calls.load(Ordering::SeqCst), 120);
    let peak = evaluator.peak.load(Ordering::SeqCst);
    assert!(peak <= 4, "peak concurrency {peak}");
    assert!(peak >= 2, "calls never overlapped");
    assert_eq!(outcome.state.degraded_records, 0);
    assert_eq!(outcome.report.criteria.len(), 40);
}

#[test]
fn test_zero_concurrency_is_rejected() {
    let err = graph_with(Vec::new(), Arc::new(RecordingEvaluator::default()))
        .max_concurrent(0)
        .build()
        .err()
        .unwrap();
    assert!(err.to_string().contains("max_concurrent"));
}
