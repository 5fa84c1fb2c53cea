use super::{Artifact, ArtifactType};
use crate::role::AgentRole;
use crate::stage::Stage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One unit of work for a single role within a stage attempt.
///
/// Built by the executor, then handed to a worker by shared reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub feature_id: String,
    pub stage: Stage,
    pub assigned_role: AgentRole,
    pub title: String,
    pub description: String,
    /// Fully rendered payload sent to the worker.
    pub instructions: String,
    pub input_artifacts: Vec<Artifact>,
    pub expected_output_types: Vec<ArtifactType>,
    pub constraints: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(feature_id: impl Into<String>, stage: Stage, assigned_role: AgentRole) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            feature_id: feature_id.into(),
            stage,
            assigned_role,
            title: format!("{}: {}", stage.display_name(), assigned_role.display_name()),
            description: String::new(),
            instructions: String::new(),
            input_artifacts: Vec::new(),
            expected_output_types: Vec::new(),
            constraints: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn with_inputs(mut self, artifacts: Vec<Artifact>) -> Self {
        self.input_artifacts = artifacts;
        self
    }

    pub fn with_expected_outputs(mut self, types: Vec<ArtifactType>) -> Self {
        self.expected_output_types = types;
        self
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraints.push(constraint.into());
        self
    }

    /// The first expected output type, if any.
    pub fn primary_output_type(&self) -> Option<ArtifactType> {
        self.expected_output_types.first().copied()
    }
}
