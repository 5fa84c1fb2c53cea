//! Fan-out/fan-in execution of one stage attempt.
//!
//! An attempt runs in three dispatch steps followed by aggregation:
//!
//! 1. the primary role, alone, seeded with the pre-stage artifacts;
//! 2. every enabled supporting role concurrently, seeded with the pre-stage
//!    and primary artifacts;
//! 3. every enabled reviewer concurrently, seeded with everything so far.
//!
//! Each member runs in its own spawned task so a panic is trapped into that
//! member's failure result instead of tearing down the attempt.

mod aggregate;

pub use aggregate::{MemberKind, failure_issue, verdict};

use crate::context::{ContextOptimizer, ContextReport, PayloadRequest};
use crate::model::{Artifact, Issue, StageMetrics, StageResult, Task, WorkerResult};
use crate::orchestrator::PipelineCallbacks;
use crate::role::AgentRole;
use crate::stage::StageDefinition;
use crate::worker::Worker;
use chrono::Utc;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything one attempt needs to know about the feature and stage.
#[derive(Debug, Clone)]
pub struct AttemptRequest<'a> {
    pub feature_id: &'a str,
    pub feature_name: &'a str,
    pub feature_description: &'a str,
    pub definition: &'a StageDefinition,
    /// Artifacts that existed before this stage started
    pub inputs: &'a [Artifact],
    /// 1 for the first attempt
    pub attempt: u32,
}

/// What an attempt produced.
#[derive(Debug, Clone)]
pub struct AttemptOutcome {
    pub result: StageResult,
    /// Set when the primary worker failed
    pub primary_error: Option<String>,
    /// Every worker result in dispatch order
    pub workers: Vec<WorkerResult>,
}

/// Runs stage attempts against a worker.
pub struct StageExecutor {
    worker: Arc<dyn Worker>,
    optimizer: Arc<ContextOptimizer>,
    disabled_roles: HashSet<AgentRole>,
}

impl StageExecutor {
    pub fn new(worker: Arc<dyn Worker>, optimizer: Arc<ContextOptimizer>) -> Self {
        Self {
            worker,
            optimizer,
            disabled_roles: HashSet::new(),
        }
    }

    pub fn with_disabled_roles(mut self, roles: impl IntoIterator<Item = AgentRole>) -> Self {
        self.disabled_roles.extend(roles);
        self
    }

    fn enabled(&self, roles: &[AgentRole]) -> Vec<AgentRole> {
        roles
            .iter()
            .copied()
            .filter(|r| !self.disabled_roles.contains(r))
            .collect()
    }

    fn build_task(
        &self,
        request: &AttemptRequest<'_>,
        role: AgentRole,
        inputs: &[Artifact],
        kind: MemberKind,
    ) -> (Task, ContextReport) {
        let definition = request.definition;
        let expected = definition.expected_outputs_for(role);
        let payload = self.optimizer.build_payload(&PayloadRequest {
            role,
            stage: definition.stage,
            feature_name: request.feature_name,
            feature_description: request.feature_description,
            artifacts: inputs,
            expected_outputs: &expected,
            review: kind == MemberKind::Reviewer,
        });

        let mut task = Task::new(request.feature_id, definition.stage, role)
            .with_description(request.feature_description)
            .with_instructions(payload.text)
            .with_inputs(inputs.to_vec())
            .with_expected_outputs(expected);
        if request.attempt > 1 {
            task = task.with_constraint(format!(
                "Attempt {}: the previous attempt needed revision",
                request.attempt
            ));
        }
        (task, payload.report)
    }

    /// Run one task in its own spawned task, trapping panics.
    async fn dispatch(&self, task: Task, report: ContextReport) -> WorkerResult {
        let role = task.assigned_role;
        let worker = Arc::clone(&self.worker);
        let handle = tokio::spawn(async move { worker.execute(&task).await });

        let mut result = match handle.await {
            Ok(result) => result,
            Err(e) => {
                warn!(role = %role, error = %e, "Worker task aborted");
                WorkerResult::failure(role, format!("Worker task aborted: {}", e))
                    .with_metadata("error_kind", "panic".into())
            }
        };
        if let Ok(value) = serde_json::to_value(&report) {
            result.metadata.insert("context".to_string(), value);
        }
        result
    }

    /// Dispatch a group of roles concurrently and wait for all of them.
    async fn dispatch_group(
        &self,
        request: &AttemptRequest<'_>,
        roles: &[AgentRole],
        inputs: &[Artifact],
        kind: MemberKind,
        callbacks: &dyn PipelineCallbacks,
    ) -> Vec<WorkerResult> {
        if roles.is_empty() {
            return Vec::new();
        }
        let mut pending = Vec::with_capacity(roles.len());
        for &role in roles {
            callbacks.on_agent_work(request.definition.stage, role, kind.as_str());
            let (task, report) = self.build_task(request, role, inputs, kind);
            pending.push(self.dispatch(task, report));
        }
        join_all(pending).await
    }

    /// Execute one attempt of a stage.
    pub async fn run_attempt(
        &self,
        request: AttemptRequest<'_>,
        callbacks: &dyn PipelineCallbacks,
    ) -> AttemptOutcome {
        let definition = request.definition;
        let stage = definition.stage;
        let started_at = Utc::now();
        let mut issues: Vec<Issue> = Vec::new();
        let mut produced: Vec<Artifact> = Vec::new();

        // Primary
        let primary_role = definition.primary_role;
        callbacks.on_agent_work(stage, primary_role, MemberKind::Primary.as_str());
        let (task, report) = self.build_task(&request, primary_role, request.inputs, MemberKind::Primary);
        let primary = self.dispatch(task, report).await;

        let primary_error = if primary.is_success() {
            None
        } else {
            let message = primary
                .error
                .clone()
                .unwrap_or_else(|| "primary worker failed".to_string());
            warn!(stage = %stage, role = %primary_role, attempt = request.attempt, error = %message, "Primary worker failed");
            issues.push(failure_issue(
                request.feature_id,
                stage,
                primary_role,
                MemberKind::Primary,
                &primary,
            ));
            Some(message)
        };
        issues.extend(primary.issues.iter().cloned());
        produced.extend(primary.artifacts.iter().cloned());

        // Supporting
        let mut accumulated: Vec<Artifact> = request.inputs.to_vec();
        accumulated.extend(primary.artifacts.iter().cloned());
        let supporting_roles = self.enabled(&definition.supporting_roles);
        let supporting = self
            .dispatch_group(&request, &supporting_roles, &accumulated, MemberKind::Supporting, callbacks)
            .await;
        for result in &supporting {
            collect_member(&request, result, MemberKind::Supporting, &mut issues, &mut produced);
            accumulated.extend(result.artifacts.iter().cloned());
        }

        // Review
        let reviewer_roles = self.enabled(&definition.reviewer_roles);
        let reviews = self
            .dispatch_group(&request, &reviewer_roles, &accumulated, MemberKind::Reviewer, callbacks)
            .await;
        for result in &reviews {
            collect_member(&request, result, MemberKind::Reviewer, &mut issues, &mut produced);
        }

        // Aggregate
        let status = verdict(primary_error.is_none(), &reviews);
        let mut workers = Vec::with_capacity(1 + supporting.len() + reviews.len());
        workers.push(primary);
        workers.extend(supporting);
        workers.extend(reviews);

        let metrics = StageMetrics {
            tokens_used: workers.iter().map(|w| w.tokens_used).sum(),
            duration_ms: workers.iter().map(|w| w.duration_ms).sum(),
            retry_count: request.attempt.saturating_sub(1),
            artifacts_produced: produced.len(),
            issues_found: issues.len(),
        };

        info!(
            stage = %stage,
            attempt = request.attempt,
            status = %status,
            workers = workers.len(),
            artifacts = metrics.artifacts_produced,
            issues = metrics.issues_found,
            tokens = metrics.tokens_used,
            "Stage attempt finished"
        );

        AttemptOutcome {
            result: StageResult {
                stage,
                status,
                started_at,
                completed_at: Utc::now(),
                artifacts: produced,
                issues,
                metrics,
            },
            primary_error,
            workers,
        }
    }
}

/// Fold a supporting or reviewer result into the attempt's issues and artifacts.
fn collect_member(
    request: &AttemptRequest<'_>,
    result: &WorkerResult,
    kind: MemberKind,
    issues: &mut Vec<Issue>,
    produced: &mut Vec<Artifact>,
) {
    if !result.is_success() {
        debug!(
            stage = %request.definition.stage,
            role = %result.role,
            kind = kind.as_str(),
            "Member failed, filing issue"
        );
        issues.push(failure_issue(
            request.feature_id,
            request.definition.stage,
            result.role,
            kind,
            result,
        ));
        return;
    }
    issues.extend(result.issues.iter().cloned());
    produced.extend(result.artifacts.iter().cloned());
}
