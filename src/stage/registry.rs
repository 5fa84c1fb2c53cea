//! Stage definitions and the ordered registry.

use super::Stage;
use crate::errors::StageConfigurationError;
use crate::model::ArtifactType;
use crate::role::AgentRole;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Immutable description of one stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDefinition {
    pub stage: Stage,
    /// Role that produces the stage's main output.
    pub primary_role: AgentRole,
    /// Roles that contribute alongside the primary, dispatched concurrently.
    #[serde(default)]
    pub supporting_roles: Vec<AgentRole>,
    /// Roles that review the accumulated output, dispatched concurrently.
    #[serde(default)]
    pub reviewer_roles: Vec<AgentRole>,
    /// Artifact types fetched from the store as input for the stage.
    #[serde(default)]
    pub required_input_types: Vec<ArtifactType>,
    /// Artifact types the primary role is asked to produce.
    #[serde(default)]
    pub expected_output_types: Vec<ArtifactType>,
    /// Mandatory stages cannot be skipped by request or inference.
    pub mandatory: bool,
    /// Upper bound on retries for this stage, regardless of configuration.
    pub retry_ceiling: u32,
}

impl StageDefinition {
    pub fn new(stage: Stage, primary_role: AgentRole, mandatory: bool, retry_ceiling: u32) -> Self {
        Self {
            stage,
            primary_role,
            supporting_roles: Vec::new(),
            reviewer_roles: Vec::new(),
            required_input_types: Vec::new(),
            expected_output_types: Vec::new(),
            mandatory,
            retry_ceiling,
        }
    }

    pub fn with_supporting(mut self, roles: impl IntoIterator<Item = AgentRole>) -> Self {
        self.supporting_roles.extend(roles);
        self
    }

    pub fn with_reviewers(mut self, roles: impl IntoIterator<Item = AgentRole>) -> Self {
        self.reviewer_roles.extend(roles);
        self
    }

    pub fn with_inputs(mut self, types: impl IntoIterator<Item = ArtifactType>) -> Self {
        self.required_input_types.extend(types);
        self
    }

    pub fn with_outputs(mut self, types: impl IntoIterator<Item = ArtifactType>) -> Self {
        self.expected_output_types.extend(types);
        self
    }

    /// Artifact types a supporting or reviewing role is expected to emit.
    pub fn expected_outputs_for(&self, role: AgentRole) -> Vec<ArtifactType> {
        if role == self.primary_role {
            return self.expected_output_types.clone();
        }
        if self.reviewer_roles.contains(&role) {
            return vec![review_output_type(role)];
        }
        self.expected_output_types.clone()
    }
}

/// The report type a reviewer files.
fn review_output_type(role: AgentRole) -> ArtifactType {
    match role {
        AgentRole::SecurityEngineer => ArtifactType::SecurityReport,
        AgentRole::PerformanceEngineer => ArtifactType::PerformanceReport,
        AgentRole::ComplianceOfficer => ArtifactType::ComplianceReport,
        _ => ArtifactType::CodeReviewReport,
    }
}

/// Ordered, validated table of stage definitions.
#[derive(Debug, Clone)]
pub struct StageRegistry {
    stages: Vec<StageDefinition>,
}

impl StageRegistry {
    /// Build a registry from definitions, validating the table.
    ///
    /// Definitions are sorted into pipeline order. Fails on an empty table,
    /// duplicate stages, the terminal marker, or a primary role reused as
    /// its own supporter or reviewer.
    pub fn new(mut stages: Vec<StageDefinition>) -> Result<Self, StageConfigurationError> {
        if stages.is_empty() {
            return Err(StageConfigurationError::EmptyRegistry);
        }

        let mut seen = HashSet::new();
        for def in &stages {
            if def.stage.is_terminal() {
                return Err(StageConfigurationError::TerminalStageInTable(def.stage));
            }
            if !seen.insert(def.stage) {
                return Err(StageConfigurationError::DuplicateStage(def.stage));
            }
            if def.supporting_roles.contains(&def.primary_role)
                || def.reviewer_roles.contains(&def.primary_role)
            {
                return Err(StageConfigurationError::RoleConflict {
                    stage: def.stage,
                    role: def.primary_role,
                });
            }
        }

        stages.sort_by_key(|d| d.stage);
        Ok(Self { stages })
    }

    /// The standard ten-stage feature pipeline.
    pub fn standard() -> Self {
        use AgentRole::*;
        use ArtifactType::*;

        let stages = vec![
            StageDefinition::new(Stage::RequirementsGathering, ProductManager, true, 2)
                .with_supporting([BusinessAnalyst])
                .with_reviewers([EngineeringManager])
                .with_outputs([RequirementsDoc, UserStories, AcceptanceCriteria]),
            StageDefinition::new(Stage::ArchitectureDesign, SystemArchitect, true, 2)
                .with_supporting([ApiDesigner, DatabaseEngineer])
                .with_reviewers([EngineeringManager, SecurityEngineer])
                .with_inputs([RequirementsDoc, UserStories])
                .with_outputs([ArchitectureDoc, ApiSpec, DatabaseSchema]),
            StageDefinition::new(Stage::UiUxDesign, UiDesigner, false, 1)
                .with_reviewers([ProductManager])
                .with_inputs([RequirementsDoc, UserStories])
                .with_outputs([UiSpec, Wireframes]),
            StageDefinition::new(Stage::TaskBreakdown, EngineeringManager, true, 1)
                .with_supporting([SeniorDeveloper])
                .with_inputs([RequirementsDoc, ArchitectureDoc])
                .with_outputs([TaskList]),
            StageDefinition::new(Stage::Implementation, SeniorDeveloper, true, 3)
                .with_supporting([JuniorDeveloper, DatabaseEngineer])
                .with_inputs([ArchitectureDoc, ApiSpec, TaskList, UiSpec])
                .with_outputs([SourceCode]),
            StageDefinition::new(Stage::CodeReview, CodeReviewer, true, 2)
                .with_reviewers([SeniorDeveloper, PerformanceEngineer])
                .with_inputs([SourceCode, ArchitectureDoc])
                .with_outputs([CodeReviewReport]),
            StageDefinition::new(Stage::Testing, QaEngineer, true, 2)
                .with_supporting([TestAutomationEngineer])
                .with_inputs([SourceCode, RequirementsDoc])
                .with_outputs([TestPlan, UnitTests, IntegrationTests, TestReport]),
            StageDefinition::new(Stage::SecurityReview, SecurityEngineer, false, 1)
                .with_supporting([ComplianceOfficer])
                .with_inputs([SourceCode, ArchitectureDoc])
                .with_outputs([SecurityReport]),
            StageDefinition::new(Stage::Documentation, DocumentationWriter, false, 1)
                .with_reviewers([ProductManager])
                .with_inputs([SourceCode, ApiSpec, ArchitectureDoc])
                .with_outputs([Documentation, ApiDocumentation]),
            StageDefinition::new(Stage::Deployment, DevopsEngineer, false, 1)
                .with_supporting([SreEngineer])
                .with_inputs([SourceCode, ArchitectureDoc])
                .with_outputs([DeploymentPlan, InfrastructureConfig, Runbook, MonitoringConfig]),
        ];

        Self { stages }
    }

    /// All definitions in pipeline order.
    pub fn stages_in_order(&self) -> &[StageDefinition] {
        &self.stages
    }

    /// Look up a stage's definition.
    pub fn lookup(&self, stage: Stage) -> Result<&StageDefinition, StageConfigurationError> {
        self.stages
            .iter()
            .find(|d| d.stage == stage)
            .ok_or(StageConfigurationError::MissingDefinition(stage))
    }

    /// Position of a stage in the pipeline order.
    pub fn position(&self, stage: Stage) -> Result<usize, StageConfigurationError> {
        self.stages
            .iter()
            .position(|d| d.stage == stage)
            .ok_or(StageConfigurationError::MissingDefinition(stage))
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl Default for StageRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry_has_ten_stages_in_order() {
        let registry = StageRegistry::standard();
        let order: Vec<Stage> = registry.stages_in_order().iter().map(|d| d.stage).collect();
        assert_eq!(order, Stage::WORKING.to_vec());
    }

    #[test]
    fn test_standard_registry_validates() {
        let defs = StageRegistry::standard().stages_in_order().to_vec();
        assert!(StageRegistry::new(defs).is_ok());
    }

    #[test]
    fn test_first_stage_is_mandatory() {
        let registry = StageRegistry::standard();
        assert!(registry.stages_in_order()[0].mandatory);
    }

    #[test]
    fn test_skippable_stages() {
        let registry = StageRegistry::standard();
        let skippable: Vec<Stage> = registry
            .stages_in_order()
            .iter()
            .filter(|d| !d.mandatory)
            .map(|d| d.stage)
            .collect();
        assert_eq!(
            skippable,
            vec![
                Stage::UiUxDesign,
                Stage::SecurityReview,
                Stage::Documentation,
                Stage::Deployment
            ]
        );
    }

    #[test]
    fn test_lookup_and_position() {
        let registry = StageRegistry::standard();
        let def = registry.lookup(Stage::Implementation).unwrap();
        assert_eq!(def.primary_role, AgentRole::SeniorDeveloper);
        assert_eq!(def.retry_ceiling, 3);
        assert_eq!(registry.position(Stage::Implementation).unwrap(), 4);
    }

    #[test]
    fn test_lookup_missing_stage() {
        let registry = StageRegistry::new(vec![StageDefinition::new(
            Stage::Testing,
            AgentRole::QaEngineer,
            true,
            1,
        )])
        .unwrap();
        assert_eq!(
            registry.lookup(Stage::Deployment).unwrap_err(),
            StageConfigurationError::MissingDefinition(Stage::Deployment)
        );
    }

    #[test]
    fn test_new_rejects_empty() {
        assert_eq!(
            StageRegistry::new(vec![]).unwrap_err(),
            StageConfigurationError::EmptyRegistry
        );
    }

    #[test]
    fn test_new_rejects_duplicates() {
        let def = StageDefinition::new(Stage::Testing, AgentRole::QaEngineer, true, 1);
        let err = StageRegistry::new(vec![def.clone(), def]).unwrap_err();
        assert_eq!(err, StageConfigurationError::DuplicateStage(Stage::Testing));
    }

    #[test]
    fn test_new_rejects_terminal_marker() {
        let def = StageDefinition::new(Stage::Completed, AgentRole::QaEngineer, true, 1);
        let err = StageRegistry::new(vec![def]).unwrap_err();
        assert_eq!(err, StageConfigurationError::TerminalStageInTable(Stage::Completed));
    }

    #[test]
    fn test_new_rejects_role_conflict() {
        let def = StageDefinition::new(Stage::CodeReview, AgentRole::CodeReviewer, true, 1)
            .with_reviewers([AgentRole::CodeReviewer]);
        let err = StageRegistry::new(vec![def]).unwrap_err();
        assert!(matches!(err, StageConfigurationError::RoleConflict { .. }));
    }

    #[test]
    fn test_new_sorts_into_pipeline_order() {
        let registry = StageRegistry::new(vec![
            StageDefinition::new(Stage::Testing, AgentRole::QaEngineer, true, 1),
            StageDefinition::new(Stage::RequirementsGathering, AgentRole::ProductManager, true, 1),
        ])
        .unwrap();
        assert_eq!(registry.stages_in_order()[0].stage, Stage::RequirementsGathering);
    }

    #[test]
    fn test_reviewer_expected_outputs() {
        let registry = StageRegistry::standard();
        let def = registry.lookup(Stage::ArchitectureDesign).unwrap();
        assert_eq!(
            def.expected_outputs_for(AgentRole::SecurityEngineer),
            vec![ArtifactType::SecurityReport]
        );
        assert_eq!(
            def.expected_outputs_for(AgentRole::SystemArchitect),
            def.expected_output_types
        );
    }
}
