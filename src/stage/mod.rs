//! Pipeline stages and the registry that orders them.
//!
//! This module provides:
//! - `Stage`, the closed set of stage names plus the terminal `Completed` marker
//! - `StageDefinition`, the immutable per-stage record
//! - `StageRegistry`, the ordered, validated table loaded once at start-up

mod registry;

pub use registry::{StageDefinition, StageRegistry};

use crate::errors::StageConfigurationError;
use crate::util::normalize_token;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A development stage.
///
/// Variants are declared in pipeline order; `Completed` is the terminal
/// marker a feature reaches once every stage has resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    RequirementsGathering,
    ArchitectureDesign,
    UiUxDesign,
    TaskBreakdown,
    Implementation,
    CodeReview,
    Testing,
    SecurityReview,
    Documentation,
    Deployment,
    Completed,
}

impl Stage {
    /// Every working stage in pipeline order (excludes `Completed`).
    pub const WORKING: [Stage; 10] = [
        Self::RequirementsGathering,
        Self::ArchitectureDesign,
        Self::UiUxDesign,
        Self::TaskBreakdown,
        Self::Implementation,
        Self::CodeReview,
        Self::Testing,
        Self::SecurityReview,
        Self::Documentation,
        Self::Deployment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RequirementsGathering => "requirements_gathering",
            Self::ArchitectureDesign => "architecture_design",
            Self::UiUxDesign => "ui_ux_design",
            Self::TaskBreakdown => "task_breakdown",
            Self::Implementation => "implementation",
            Self::CodeReview => "code_review",
            Self::Testing => "testing",
            Self::SecurityReview => "security_review",
            Self::Documentation => "documentation",
            Self::Deployment => "deployment",
            Self::Completed => "completed",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::RequirementsGathering => "Requirements Gathering",
            Self::ArchitectureDesign => "Architecture Design",
            Self::UiUxDesign => "UI/UX Design",
            Self::TaskBreakdown => "Task Breakdown",
            Self::Implementation => "Implementation",
            Self::CodeReview => "Code Review",
            Self::Testing => "Testing",
            Self::SecurityReview => "Security Review",
            Self::Documentation => "Documentation",
            Self::Deployment => "Deployment",
            Self::Completed => "Completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = StageConfigurationError;

    /// Parses case- and punctuation-insensitively, so `UI_UX_DESIGN`,
    /// `ui-ux-design` and `UI/UX Design` all name the same stage.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize_token(s);
        Self::WORKING
            .into_iter()
            .chain(std::iter::once(Self::Completed))
            .find(|stage| stage.as_str() == normalized)
            .ok_or_else(|| StageConfigurationError::UnknownStage(s.to_string()))
    }
}

/// Parse a comma-separated list of stage names.
pub fn parse_stage_list(list: &str) -> Result<Vec<Stage>, StageConfigurationError> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}
