use crate::role::AgentRole;
use crate::stage::Stage;
use crate::util::normalize_token;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    Bug,
    SecurityVulnerability,
    Performance,
    CodeQuality,
    Architecture,
    MissingRequirement,
    DocumentationGap,
    TestFailure,
    Compliance,
    #[default]
    Other,
}

impl IssueType {
    pub const ALL: [IssueType; 10] = [
        Self::Bug,
        Self::SecurityVulnerability,
        Self::Performance,
        Self::CodeQuality,
        Self::Architecture,
        Self::MissingRequirement,
        Self::DocumentationGap,
        Self::TestFailure,
        Self::Compliance,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bug => "bug",
            Self::SecurityVulnerability => "security_vulnerability",
            Self::Performance => "performance",
            Self::CodeQuality => "code_quality",
            Self::Architecture => "architecture",
            Self::MissingRequirement => "missing_requirement",
            Self::DocumentationGap => "documentation_gap",
            Self::TestFailure => "test_failure",
            Self::Compliance => "compliance",
            Self::Other => "other",
        }
    }

    /// Lenient lookup: unrecognized labels become `Other`.
    pub fn from_label(label: &str) -> Self {
        let normalized = normalize_token(label);
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .unwrap_or_default()
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Issue severity.
///
/// Ordered from most to least severe, so sorting puts `Critical` first.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    #[default]
    Medium,
    Low,
    Info,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Self::Critical,
        Self::High,
        Self::Medium,
        Self::Low,
        Self::Info,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Info => "info",
        }
    }

    /// Lenient lookup: unrecognized labels become `Medium`.
    pub fn from_label(label: &str) -> Self {
        let normalized = normalize_token(label);
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == normalized)
            .unwrap_or_default()
    }

    pub fn is_critical(&self) -> bool {
        matches!(self, Self::Critical)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    #[default]
    Open,
    Acknowledged,
    Resolved,
}

/// A problem reported by a worker during a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: String,
    pub feature_id: String,
    pub issue_type: IssueType,
    pub severity: Severity,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub reported_by: AgentRole,
    pub stage: Stage,
    #[serde(default)]
    pub status: IssueStatus,
    pub created_at: DateTime<Utc>,
}

impl Issue {
    pub fn new(
        feature_id: impl Into<String>,
        stage: Stage,
        reported_by: AgentRole,
        issue_type: IssueType,
        severity: Severity,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            feature_id: feature_id.into(),
            issue_type,
            severity,
            title: title.into(),
            description: String::new(),
            reported_by,
            stage,
            status: IssueStatus::Open,
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_type_from_label() {
        assert_eq!(IssueType::from_label("Security Vulnerability"), IssueType::SecurityVulnerability);
        assert_eq!(IssueType::from_label("TEST-FAILURE"), IssueType::TestFailure);
        assert_eq!(IssueType::from_label("gremlin"), IssueType::Other);
    }

    #[test]
    fn test_severity_from_label_defaults_to_medium() {
        assert_eq!(Severity::from_label("CRITICAL"), Severity::Critical);
        assert_eq!(Severity::from_label(" low "), Severity::Low);
        assert_eq!(Severity::from_label("catastrophic"), Severity::Medium);
        assert_eq!(Severity::from_label(""), Severity::Medium);
    }

    #[test]
    fn test_severity_orders_most_severe_first() {
        let mut severities = vec![Severity::Info, Severity::Critical, Severity::Medium];
        severities.sort();
        assert_eq!(severities, vec![Severity::Critical, Severity::Medium, Severity::Info]);
        assert!(Severity::Critical.is_critical());
        assert!(!Severity::High.is_critical());
    }

    #[test]
    fn test_issue_builder() {
        let issue = Issue::new(
            "feat-1",
            Stage::CodeReview,
            AgentRole::CodeReviewer,
            IssueType::Bug,
            Severity::High,
            "Off-by-one",
        )
        .with_description("Loop skips the last element");
        assert_eq!(issue.status, IssueStatus::Open);
        assert_eq!(issue.description, "Loop skips the last element");
    }
}
