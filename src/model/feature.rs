use super::{Artifact, Issue, StageResult};
use crate::stage::Stage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureStatus {
    #[default]
    Draft,
    InProgress,
    OnHold,
    Completed,
}

impl std::fmt::Display for FeatureStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Draft => "draft",
            Self::InProgress => "in_progress",
            Self::OnHold => "on_hold",
            Self::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// The unit of work driven through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feature {
    pub id: String,
    pub name: String,
    pub description: String,
    pub current_stage: Stage,
    /// One entry per stage; a retry overwrites the earlier attempt.
    #[serde(default)]
    pub stage_results: BTreeMap<Stage, StageResult>,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
    #[serde(default)]
    pub issues: Vec<Issue>,
    #[serde(default)]
    pub status: FeatureStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Feature {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), name, description)
    }

    pub fn with_id(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            current_stage: Stage::RequirementsGathering,
            stage_results: BTreeMap::new(),
            artifacts: Vec::new(),
            issues: Vec::new(),
            status: FeatureStatus::Draft,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move `current_stage` forward; never moves it backwards.
    pub fn advance_to(&mut self, stage: Stage) {
        if stage > self.current_stage {
            self.current_stage = stage;
        }
        self.updated_at = Utc::now();
    }

    pub fn set_status(&mut self, status: FeatureStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}
