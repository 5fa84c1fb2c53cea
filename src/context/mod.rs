//! Role-aware payload construction.
//!
//! The optimizer assembles the text sent to a worker from six components:
//! role instructions, the task itself, the filtered project overview, the
//! filtered style profile, the input artifacts, and the output-format
//! boilerplate. Each component is sized for the role, and a
//! [`ContextReport`] records what filtering saved.

mod budget;
mod sections;
mod summary;

pub use budget::{ComponentCost, ContextReport};
pub use sections::{Section, filter_document, overview_allowlist, profile_allowlist, split_sections};
pub use summary::{ArtifactSummary, KEY_POINT_MAX_CHARS, SummaryLimits, condense};

use crate::config::ContextConfig;
use crate::model::{Artifact, ArtifactType};
use crate::protocol::{ARTIFACT_END, ARTIFACT_START, ISSUE_END, ISSUE_START};
use crate::role::AgentRole;
use crate::stage::Stage;
use tracing::debug;

/// What a payload is being built for.
#[derive(Debug, Clone)]
pub struct PayloadRequest<'a> {
    pub role: AgentRole,
    pub stage: Stage,
    pub feature_name: &'a str,
    pub feature_description: &'a str,
    pub artifacts: &'a [Artifact],
    pub expected_outputs: &'a [ArtifactType],
    /// Reviewers are asked for issues rather than new artifacts.
    pub review: bool,
}

/// A rendered payload and its token accounting.
#[derive(Debug, Clone)]
pub struct Payload {
    pub text: String,
    pub report: ContextReport,
}

/// Builds role-tailored worker payloads.
#[derive(Debug, Clone, Default)]
pub struct ContextOptimizer {
    config: ContextConfig,
    overview: Option<String>,
    profile: Option<String>,
}

impl ContextOptimizer {
    pub fn new(config: ContextConfig) -> Self {
        Self {
            config,
            overview: None,
            profile: None,
        }
    }

    pub fn with_overview(mut self, overview: impl Into<String>) -> Self {
        self.overview = Some(overview.into());
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Overview sections relevant to `role`, or `None` to omit the section.
    pub fn overview_for(&self, role: AgentRole) -> Option<String> {
        self.overview
            .as_deref()
            .and_then(|doc| filter_document(doc, overview_allowlist(role)))
    }

    /// Style profile sections relevant to `role`, or `None` to omit the section.
    pub fn profile_for(&self, role: AgentRole) -> Option<String> {
        self.profile
            .as_deref()
            .and_then(|doc| filter_document(doc, profile_allowlist(role)))
    }

    /// Verbatim body for short artifacts, summary for long ones.
    pub fn optimize_artifact_body(&self, artifact: &Artifact) -> String {
        condense(
            artifact,
            self.config.summary_line_threshold,
            self.config.summary_limits(),
        )
    }

    /// Whether `role` gets full artifact bodies for this selection.
    pub fn wants_full_content(&self, role: AgentRole, artifacts: &[Artifact]) -> bool {
        if !role.works_on_code() {
            return false;
        }
        let total: usize = artifacts.iter().map(|a| a.content.len()).sum();
        total < self.config.full_content_byte_ceiling
    }

    /// Render the artifact section as sent and as it would be unfiltered.
    fn render_artifacts(&self, role: AgentRole, artifacts: &[Artifact]) -> (String, String) {
        if artifacts.is_empty() {
            return (String::new(), String::new());
        }
        let full = self.wants_full_content(role, artifacts);

        let mut optimized = String::from("## Input Artifacts\n\n");
        let mut unfiltered = optimized.clone();
        for artifact in artifacts {
            let header = format!(
                "### {} ({}, v{})\n",
                artifact.name, artifact.artifact_type, artifact.version
            );
            let body = if full {
                artifact.content.clone()
            } else {
                self.optimize_artifact_body(artifact)
            };
            optimized.push_str(&header);
            optimized.push_str(&body);
            optimized.push_str("\n\n");
            unfiltered.push_str(&header);
            unfiltered.push_str(&artifact.content);
            unfiltered.push_str("\n\n");
        }
        (optimized, unfiltered)
    }

    /// Assemble the payload for one task.
    pub fn build_payload(&self, request: &PayloadRequest<'_>) -> Payload {
        let mut report = ContextReport::new();
        let mut parts: Vec<String> = Vec::new();

        let system = request.role.system_instructions().to_string();
        report.record("system", &system, &system);
        parts.push(system);

        let task = render_task(request);
        report.record("task", &task, &task);
        parts.push(task);

        let overview_full = self.overview.clone().unwrap_or_default();
        let overview = self
            .overview_for(request.role)
            .map(|text| format!("## Project Overview\n\n{}", text));
        report.record(
            "overview",
            overview.as_deref().unwrap_or_default(),
            &overview_full,
        );
        parts.extend(overview);

        let profile_full = self.profile.clone().unwrap_or_default();
        let profile = self
            .profile_for(request.role)
            .map(|text| format!("## Conventions\n\n{}", text));
        report.record(
            "profile",
            profile.as_deref().unwrap_or_default(),
            &profile_full,
        );
        parts.extend(profile);

        let (artifacts, artifacts_full) = self.render_artifacts(request.role, request.artifacts);
        report.record("artifacts", &artifacts, &artifacts_full);
        if !artifacts.is_empty() {
            parts.push(artifacts);
        }

        let format = render_output_format(request);
        report.record("output_format", &format, &format);
        parts.push(format);

        debug!(
            role = %request.role,
            stage = %request.stage,
            optimized = report.optimized_tokens(),
            unfiltered = report.unfiltered_tokens(),
            "Context {}",
            report.status()
        );

        Payload {
            text: parts.join("\n\n"),
            report,
        }
    }
}

fn render_task(request: &PayloadRequest<'_>) -> String {
    let mut text = format!(
        "## Task\n\nStage: {}\nFeature: {}\n",
        request.stage.display_name(),
        request.feature_name
    );
    if !request.feature_description.trim().is_empty() {
        text.push('\n');
        text.push_str(request.feature_description.trim());
        text.push('\n');
    }
    if request.review {
        text.push_str(
            "\nReview the input artifacts. Report every problem you find as an issue. \
             Use severity critical only for defects that must block this stage.\n",
        );
    }
    text
}

fn render_output_format(request: &PayloadRequest<'_>) -> String {
    let mut text = String::from("## Output Format\n\n");

    if !request.expected_outputs.is_empty() {
        let types: Vec<&str> = request.expected_outputs.iter().map(|t| t.as_str()).collect();
        text.push_str(&format!(
            "Produce these artifact types: {}\nWrap each artifact like this:\n\n",
            types.join(", ")
        ));
        text.push_str(&format!(
            "{ARTIFACT_START}\nType: <artifact type>\nName: <short name>\nDescription: <one line>\nContent:\n<body>\n{ARTIFACT_END}\n\n"
        ));
    }

    text.push_str(&format!(
        "Report problems like this:\n\n{ISSUE_START}\nType: <bug|security_vulnerability|performance|code_quality|architecture|missing_requirement|documentation_gap|test_failure|compliance|other>\nSeverity: <critical|high|medium|low|info>\nTitle: <one line>\nDescription: <details>\n{ISSUE_END}\n"
    ));
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    const OVERVIEW: &str = "## Overview\nA billing service.\n\n## Entry Points\n- src/main.rs\n\n## Deployment\nHelm chart.\n";
    const PROFILE: &str = "## Naming\nsnake_case.\n\n## Logging\nUse tracing.\n";

    fn artifact(ty: ArtifactType, lines: usize) -> Artifact {
        let content = (0..lines).map(|i| format!("- item {}", i)).collect::<Vec<_>>().join("\n");
        Artifact::new(ty, ty.display_name(), content, AgentRole::ProductManager)
    }

    fn request<'a>(role: AgentRole, artifacts: &'a [Artifact]) -> PayloadRequest<'a> {
        PayloadRequest {
            role,
            stage: Stage::ArchitectureDesign,
            feature_name: "Billing",
            feature_description: "Add invoices",
            artifacts,
            expected_outputs: &[ArtifactType::ApiSpec],
            review: false,
        }
    }

    fn optimizer() -> ContextOptimizer {
        ContextOptimizer::new(ContextConfig::default())
            .with_overview(OVERVIEW)
            .with_profile(PROFILE)
    }

    #[test]
    fn test_payload_contains_role_and_task() {
        let payload = optimizer().build_payload(&request(AgentRole::ApiDesigner, &[]));
        assert!(payload.text.starts_with("You are the API Designer."));
        assert!(payload.text.contains("Stage: Architecture Design"));
        assert!(payload.text.contains("Add invoices"));
        assert!(payload.text.contains("api_spec"));
        assert!(payload.text.contains(ARTIFACT_START));
    }

    #[test]
    fn test_payload_filters_overview_by_role() {
        let payload = optimizer().build_payload(&request(AgentRole::ApiDesigner, &[]));
        assert!(payload.text.contains("src/main.rs"));
        assert!(!payload.text.contains("Helm chart"));
        assert!(payload.text.contains("## Conventions"));
        assert!(payload.text.contains("snake_case"));
        assert!(!payload.text.contains("Use tracing"));
    }

    #[test]
    fn test_absent_sections_are_omitted() {
        let payload = optimizer().build_payload(&request(AgentRole::ProductManager, &[]));
        assert!(!payload.text.contains("## Conventions"));

        let bare = ContextOptimizer::default().build_payload(&request(AgentRole::ApiDesigner, &[]));
        assert!(!bare.text.contains("## Project Overview"));
    }

    #[test]
    fn test_long_artifacts_are_summarized_for_non_code_roles() {
        let artifacts = vec![artifact(ArtifactType::RequirementsDoc, 300)];
        let payload = optimizer().build_payload(&request(AgentRole::SystemArchitect, &artifacts));
        assert!(payload.text.contains("(300 lines total)"));
        assert!(!payload.text.contains("- item 200"));
        assert!(payload.report.savings() > 0);
    }

    #[test]
    fn test_code_roles_get_full_content_under_ceiling() {
        let artifacts = vec![artifact(ArtifactType::ArchitectureDoc, 60)];
        let payload = optimizer().build_payload(&request(AgentRole::SeniorDeveloper, &artifacts));
        assert!(payload.text.contains("- item 59"));
        assert!(!payload.text.contains("lines total"));
    }

    #[test]
    fn test_code_roles_fall_back_to_summary_over_ceiling() {
        let artifacts = vec![artifact(ArtifactType::ArchitectureDoc, 2000)];
        let opt = optimizer();
        assert!(!opt.wants_full_content(AgentRole::SeniorDeveloper, &artifacts));
        let payload = opt.build_payload(&request(AgentRole::SeniorDeveloper, &artifacts));
        assert!(payload.text.contains("(2000 lines total)"));
    }

    #[test]
    fn test_report_covers_every_component() {
        let payload = optimizer().build_payload(&request(AgentRole::ApiDesigner, &[]));
        let names: Vec<&str> = payload
            .report
            .components
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(
            names,
            vec!["system", "task", "overview", "profile", "artifacts", "output_format"]
        );
    }

    #[test]
    fn test_review_payload_asks_for_issues() {
        let mut req = request(AgentRole::SecurityEngineer, &[]);
        req.review = true;
        let payload = optimizer().build_payload(&req);
        assert!(payload.text.contains("Use severity critical only"));
    }
}
