//! Agent roles that stage tasks are assigned to.
//!
//! Roles are a closed set. Every per-role behaviour (display name, system
//! instructions, context allowlists) is an exhaustive `match`, so an unknown
//! role can only appear at the parsing boundary.
//!
//! ```
//! use stagecraft::role::AgentRole;
//!
//! let role: AgentRole = "Senior Developer".parse().unwrap();
//! assert_eq!(role, AgentRole::SeniorDeveloper);
//! assert_eq!(role.to_string(), "senior_developer");
//! ```

use crate::errors::StageConfigurationError;
use crate::util::normalize_token;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A role bound to a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    ProductManager,
    BusinessAnalyst,
    EngineeringManager,
    SystemArchitect,
    ApiDesigner,
    DatabaseEngineer,
    UiDesigner,
    SeniorDeveloper,
    JuniorDeveloper,
    CodeReviewer,
    QaEngineer,
    TestAutomationEngineer,
    SecurityEngineer,
    ComplianceOfficer,
    DocumentationWriter,
    DevopsEngineer,
    SreEngineer,
    PerformanceEngineer,
}

impl AgentRole {
    /// Every role, in a stable order.
    pub const ALL: [AgentRole; 18] = [
        Self::ProductManager,
        Self::BusinessAnalyst,
        Self::EngineeringManager,
        Self::SystemArchitect,
        Self::ApiDesigner,
        Self::DatabaseEngineer,
        Self::UiDesigner,
        Self::SeniorDeveloper,
        Self::JuniorDeveloper,
        Self::CodeReviewer,
        Self::QaEngineer,
        Self::TestAutomationEngineer,
        Self::SecurityEngineer,
        Self::ComplianceOfficer,
        Self::DocumentationWriter,
        Self::DevopsEngineer,
        Self::SreEngineer,
        Self::PerformanceEngineer,
    ];

    /// Machine identifier, also used for the worker's environment.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProductManager => "product_manager",
            Self::BusinessAnalyst => "business_analyst",
            Self::EngineeringManager => "engineering_manager",
            Self::SystemArchitect => "system_architect",
            Self::ApiDesigner => "api_designer",
            Self::DatabaseEngineer => "database_engineer",
            Self::UiDesigner => "ui_designer",
            Self::SeniorDeveloper => "senior_developer",
            Self::JuniorDeveloper => "junior_developer",
            Self::CodeReviewer => "code_reviewer",
            Self::QaEngineer => "qa_engineer",
            Self::TestAutomationEngineer => "test_automation_engineer",
            Self::SecurityEngineer => "security_engineer",
            Self::ComplianceOfficer => "compliance_officer",
            Self::DocumentationWriter => "documentation_writer",
            Self::DevopsEngineer => "devops_engineer",
            Self::SreEngineer => "sre_engineer",
            Self::PerformanceEngineer => "performance_engineer",
        }
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ProductManager => "Product Manager",
            Self::BusinessAnalyst => "Business Analyst",
            Self::EngineeringManager => "Engineering Manager",
            Self::SystemArchitect => "System Architect",
            Self::ApiDesigner => "API Designer",
            Self::DatabaseEngineer => "Database Engineer",
            Self::UiDesigner => "UI Designer",
            Self::SeniorDeveloper => "Senior Developer",
            Self::JuniorDeveloper => "Junior Developer",
            Self::CodeReviewer => "Code Reviewer",
            Self::QaEngineer => "QA Engineer",
            Self::TestAutomationEngineer => "Test Automation Engineer",
            Self::SecurityEngineer => "Security Engineer",
            Self::ComplianceOfficer => "Compliance Officer",
            Self::DocumentationWriter => "Documentation Writer",
            Self::DevopsEngineer => "DevOps Engineer",
            Self::SreEngineer => "Site Reliability Engineer",
            Self::PerformanceEngineer => "Performance Engineer",
        }
    }

    /// Role-specific system instructions placed at the top of every payload.
    pub fn system_instructions(&self) -> &'static str {
        match self {
            Self::ProductManager => {
                "You are the Product Manager. Turn the feature request into clear requirements and user stories with measurable acceptance criteria."
            }
            Self::BusinessAnalyst => {
                "You are the Business Analyst. Refine requirements, surface edge cases, and make acceptance criteria testable."
            }
            Self::EngineeringManager => {
                "You are the Engineering Manager. Judge feasibility and scope, and break work into well-sized, ordered tasks."
            }
            Self::SystemArchitect => {
                "You are the System Architect. Design components, data flow, and integration points that satisfy the requirements."
            }
            Self::ApiDesigner => {
                "You are the API Designer. Specify external interfaces: endpoints, request/response shapes, and error contracts."
            }
            Self::DatabaseEngineer => {
                "You are the Database Engineer. Design schemas, migrations, and indexes for the feature's data."
            }
            Self::UiDesigner => {
                "You are the UI Designer. Produce UI specifications and wireframes covering every user-facing flow."
            }
            Self::SeniorDeveloper => {
                "You are the Senior Developer. Write production-quality code that follows the project's conventions."
            }
            Self::JuniorDeveloper => {
                "You are the Junior Developer. Implement well-scoped pieces of the task list following the project's conventions."
            }
            Self::CodeReviewer => {
                "You are the Code Reviewer. Review the code for correctness, readability, and adherence to conventions."
            }
            Self::QaEngineer => {
                "You are the QA Engineer. Write a test plan and report on how the implementation meets the acceptance criteria."
            }
            Self::TestAutomationEngineer => {
                "You are the Test Automation Engineer. Write automated unit and integration tests for the implementation."
            }
            Self::SecurityEngineer => {
                "You are the Security Engineer. Identify vulnerabilities, insecure defaults, and missing controls."
            }
            Self::ComplianceOfficer => {
                "You are the Compliance Officer. Check data handling and logging against regulatory and policy requirements."
            }
            Self::DocumentationWriter => {
                "You are the Documentation Writer. Write user and API documentation for the feature."
            }
            Self::DevopsEngineer => {
                "You are the DevOps Engineer. Produce the deployment plan and infrastructure configuration."
            }
            Self::SreEngineer => {
                "You are the Site Reliability Engineer. Define runbooks, monitoring, and alerting for the feature."
            }
            Self::PerformanceEngineer => {
                "You are the Performance Engineer. Look for latency, throughput, and resource-usage problems."
            }
        }
    }

    /// Whether this role writes or reviews code directly and therefore
    /// benefits from full artifact bodies.
    pub fn works_on_code(&self) -> bool {
        matches!(
            self,
            Self::SeniorDeveloper
                | Self::JuniorDeveloper
                | Self::CodeReviewer
                | Self::TestAutomationEngineer
        )
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentRole {
    type Err = StageConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_token(s);
        let role = match normalized.as_str() {
            "devops" => Self::DevopsEngineer,
            "sre" | "site_reliability_engineer" => Self::SreEngineer,
            "qa" => Self::QaEngineer,
            other => Self::ALL
                .into_iter()
                .find(|r| r.as_str() == other)
                .ok_or_else(|| StageConfigurationError::UnknownRole(s.to_string()))?,
        };
        Ok(role)
    }
}
