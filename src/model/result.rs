use super::{Artifact, Issue, Severity};
use crate::role::AgentRole;
use crate::stage::Stage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Success,
    Failure,
}

/// Outcome of one worker invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerResult {
    pub role: AgentRole,
    pub status: WorkerStatus,
    pub raw_output: String,
    pub artifacts: Vec<Artifact>,
    pub issues: Vec<Issue>,
    pub tokens_used: u64,
    pub duration_ms: u64,
    /// Failure diagnostic, present only when `status` is `Failure`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl WorkerResult {
    pub fn success(role: AgentRole, raw_output: impl Into<String>) -> Self {
        Self {
            role,
            status: WorkerStatus::Success,
            raw_output: raw_output.into(),
            artifacts: Vec::new(),
            issues: Vec::new(),
            tokens_used: 0,
            duration_ms: 0,
            error: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn failure(role: AgentRole, error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            role,
            status: WorkerStatus::Failure,
            raw_output: String::new(),
            artifacts: Vec::new(),
            issues: Vec::new(),
            tokens_used: 0,
            duration_ms: 0,
            error: Some(error),
            metadata: BTreeMap::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == WorkerStatus::Success
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Terminal status of one stage attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Approved,
    RevisionNeeded,
    Failed,
    Skipped,
}

impl fmt::Display for StageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Approved => "approved",
            Self::RevisionNeeded => "revision_needed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageMetrics {
    pub tokens_used: u64,
    pub duration_ms: u64,
    pub retry_count: u32,
    pub artifacts_produced: usize,
    pub issues_found: usize,
}

/// Result of one stage attempt. The last one recorded per stage is authoritative.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: Stage,
    pub status: StageStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub artifacts: Vec<Artifact>,
    pub issues: Vec<Issue>,
    pub metrics: StageMetrics,
}

impl StageResult {
    /// A skipped stage: no work dispatched, nothing produced.
    pub fn skipped(stage: Stage) -> Self {
        let now = Utc::now();
        Self {
            stage,
            status: StageStatus::Skipped,
            started_at: now,
            completed_at: now,
            artifacts: Vec::new(),
            issues: Vec::new(),
            metrics: StageMetrics::default(),
        }
    }

    pub fn has_critical_issue(&self) -> bool {
        self.issues.iter().any(|i| i.severity.is_critical())
    }
}

/// Summary of a full pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineRunResult {
    pub feature_id: String,
    pub success: bool,
    pub stages_completed: Vec<Stage>,
    pub stages_failed: Vec<Stage>,
    pub stages_skipped: Vec<Stage>,
    pub artifacts: Vec<Artifact>,
    pub issues: Vec<Issue>,
    pub total_tokens_used: u64,
    pub total_duration_ms: u64,
}

impl PipelineRunResult {
    pub fn new(feature_id: impl Into<String>) -> Self {
        Self {
            feature_id: feature_id.into(),
            ..Self::default()
        }
    }

    /// Fold a stage's authoritative result into the run totals.
    pub fn absorb(&mut self, result: &StageResult) {
        self.artifacts.extend(result.artifacts.iter().cloned());
        self.issues.extend(result.issues.iter().cloned());
        self.total_tokens_used += result.metrics.tokens_used;
        self.total_duration_ms += result.metrics.duration_ms;
    }

    /// Seal the run: success iff no stage failed.
    pub fn finalize(mut self) -> Self {
        self.success = self.stages_failed.is_empty();
        self
    }

    /// Issues grouped by severity, most severe first.
    pub fn issues_by_severity(&self) -> BTreeMap<Severity, Vec<&Issue>> {
        let mut grouped: BTreeMap<Severity, Vec<&Issue>> = BTreeMap::new();
        for issue in &self.issues {
            grouped.entry(issue.severity).or_default().push(issue);
        }
        grouped
    }
}
