use crate::model::{Issue, IssueType, Severity, StageStatus, WorkerResult};
use crate::role::AgentRole;
use crate::stage::Stage;

/// Which group a dispatched role belongs to within an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Primary,
    Supporting,
    Reviewer,
}

impl MemberKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Supporting => "supporting",
            Self::Reviewer => "reviewer",
        }
    }
}

/// The issue filed when a worker returns a failure.
///
/// Primary failures are `high`; supporting and reviewer failures are
/// `medium` so they can never block approval on their own.
pub fn failure_issue(
    feature_id: &str,
    stage: Stage,
    role: AgentRole,
    kind: MemberKind,
    result: &WorkerResult,
) -> Issue {
    let severity = match kind {
        MemberKind::Primary => Severity::High,
        MemberKind::Supporting | MemberKind::Reviewer => Severity::Medium,
    };
    let error = result.error.as_deref().unwrap_or("unknown error");
    Issue::new(
        feature_id,
        stage,
        role,
        IssueType::Other,
        severity,
        format!("{} worker {} failed", kind.as_str(), role.display_name()),
    )
    .with_description(error)
}

/// Verdict for one attempt.
///
/// Approved when the primary succeeded and no reviewer reported a critical
/// issue. With no reviewers only the primary outcome matters.
pub fn verdict(primary_ok: bool, reviewer_results: &[WorkerResult]) -> StageStatus {
    if !primary_ok {
        return StageStatus::RevisionNeeded;
    }
    let rejected = reviewer_results
        .iter()
        .flat_map(|r| r.issues.iter())
        .any(|issue| issue.severity.is_critical());
    if rejected {
        StageStatus::RevisionNeeded
    } else {
        StageStatus::Approved
    }
}
