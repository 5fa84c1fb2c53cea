use crate::role::AgentRole;
use crate::util::normalize_token;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Kind of document an artifact carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    RequirementsDoc,
    UserStories,
    AcceptanceCriteria,
    ArchitectureDoc,
    ApiSpec,
    DatabaseSchema,
    UiSpec,
    Wireframes,
    TaskList,
    SourceCode,
    UnitTests,
    IntegrationTests,
    TestPlan,
    TestReport,
    CodeReviewReport,
    SecurityReport,
    PerformanceReport,
    ComplianceReport,
    Documentation,
    ApiDocumentation,
    DeploymentPlan,
    InfrastructureConfig,
    Runbook,
    MonitoringConfig,
}

impl ArtifactType {
    pub const ALL: [ArtifactType; 24] = [
        Self::RequirementsDoc,
        Self::UserStories,
        Self::AcceptanceCriteria,
        Self::ArchitectureDoc,
        Self::ApiSpec,
        Self::DatabaseSchema,
        Self::UiSpec,
        Self::Wireframes,
        Self::TaskList,
        Self::SourceCode,
        Self::UnitTests,
        Self::IntegrationTests,
        Self::TestPlan,
        Self::TestReport,
        Self::CodeReviewReport,
        Self::SecurityReport,
        Self::PerformanceReport,
        Self::ComplianceReport,
        Self::Documentation,
        Self::ApiDocumentation,
        Self::DeploymentPlan,
        Self::InfrastructureConfig,
        Self::Runbook,
        Self::MonitoringConfig,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequirementsDoc => "requirements_doc",
            Self::UserStories => "user_stories",
            Self::AcceptanceCriteria => "acceptance_criteria",
            Self::ArchitectureDoc => "architecture_doc",
            Self::ApiSpec => "api_spec",
            Self::DatabaseSchema => "database_schema",
            Self::UiSpec => "ui_spec",
            Self::Wireframes => "wireframes",
            Self::TaskList => "task_list",
            Self::SourceCode => "source_code",
            Self::UnitTests => "unit_tests",
            Self::IntegrationTests => "integration_tests",
            Self::TestPlan => "test_plan",
            Self::TestReport => "test_report",
            Self::CodeReviewReport => "code_review_report",
            Self::SecurityReport => "security_report",
            Self::PerformanceReport => "performance_report",
            Self::ComplianceReport => "compliance_report",
            Self::Documentation => "documentation",
            Self::ApiDocumentation => "api_documentation",
            Self::DeploymentPlan => "deployment_plan",
            Self::InfrastructureConfig => "infrastructure_config",
            Self::Runbook => "runbook",
            Self::MonitoringConfig => "monitoring_config",
        }
    }

    /// Human-readable name, used as the default artifact name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::RequirementsDoc => "Requirements Document",
            Self::UserStories => "User Stories",
            Self::AcceptanceCriteria => "Acceptance Criteria",
            Self::ArchitectureDoc => "Architecture Document",
            Self::ApiSpec => "API Specification",
            Self::DatabaseSchema => "Database Schema",
            Self::UiSpec => "UI Specification",
            Self::Wireframes => "Wireframes",
            Self::TaskList => "Task List",
            Self::SourceCode => "Source Code",
            Self::UnitTests => "Unit Tests",
            Self::IntegrationTests => "Integration Tests",
            Self::TestPlan => "Test Plan",
            Self::TestReport => "Test Report",
            Self::CodeReviewReport => "Code Review Report",
            Self::SecurityReport => "Security Report",
            Self::PerformanceReport => "Performance Report",
            Self::ComplianceReport => "Compliance Report",
            Self::Documentation => "Documentation",
            Self::ApiDocumentation => "API Documentation",
            Self::DeploymentPlan => "Deployment Plan",
            Self::InfrastructureConfig => "Infrastructure Config",
            Self::Runbook => "Runbook",
            Self::MonitoringConfig => "Monitoring Config",
        }
    }

    /// Match a free-form label against the table after normalization.
    ///
    /// Returns `None` for anything unrecognized; callers drop such records.
    pub fn from_label(label: &str) -> Option<Self> {
        let normalized = normalize_token(label);
        Self::ALL.into_iter().find(|t| t.as_str() == normalized)
    }
}

impl fmt::Display for ArtifactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactStatus {
    #[default]
    Draft,
    Final,
    Superseded,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    #[default]
    Pending,
    Approved,
    ChangesRequested,
}

/// A versioned document produced by a worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub id: String,
    pub artifact_type: ArtifactType,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub content: String,
    pub created_by: AgentRole,
    /// Assigned by the store; zero until persisted.
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub status: ArtifactStatus,
    #[serde(default)]
    pub review_status: ReviewStatus,
    pub created_at: DateTime<Utc>,
}

impl Artifact {
    pub fn new(
        artifact_type: ArtifactType,
        name: impl Into<String>,
        content: impl Into<String>,
        created_by: AgentRole,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            artifact_type,
            name: name.into(),
            description: String::new(),
            content: content.into(),
            created_by,
            version: 0,
            status: ArtifactStatus::Draft,
            review_status: ReviewStatus::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn line_count(&self) -> usize {
        self.content.lines().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_label_normalizes() {
        assert_eq!(ArtifactType::from_label("Source Code"), Some(ArtifactType::SourceCode));
        assert_eq!(ArtifactType::from_label("API-SPEC"), Some(ArtifactType::ApiSpec));
        assert_eq!(ArtifactType::from_label("  requirements_doc "), Some(ArtifactType::RequirementsDoc));
    }

    #[test]
    fn test_from_label_unknown() {
        assert_eq!(ArtifactType::from_label("napkin_sketch"), None);
        assert_eq!(ArtifactType::from_label(""), None);
    }

    #[test]
    fn test_every_type_roundtrips_through_label() {
        for t in ArtifactType::ALL {
            assert_eq!(ArtifactType::from_label(t.as_str()), Some(t));
            assert_eq!(ArtifactType::from_label(&t.to_string()), Some(t));
        }
    }

    #[test]
    fn test_new_artifact_is_unversioned_draft() {
        let artifact = Artifact::new(
            ArtifactType::TaskList,
            "Tasks",
            "- one\n- two",
            AgentRole::EngineeringManager,
        );
        assert_eq!(artifact.version, 0);
        assert_eq!(artifact.status, ArtifactStatus::Draft);
        assert_eq!(artifact.review_status, ReviewStatus::Pending);
        assert_eq!(artifact.line_count(), 2);
    }
}
