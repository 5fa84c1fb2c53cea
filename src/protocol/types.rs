use crate::model::{ArtifactType, IssueType, Severity};
use serde::{Deserialize, Serialize};

/// An artifact block as decoded from worker text, before it is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedArtifact {
    pub artifact_type: ArtifactType,
    pub name: String,
    pub description: String,
    pub content: String,
}

impl DecodedArtifact {
    pub fn new(artifact_type: ArtifactType, content: impl Into<String>) -> Self {
        Self {
            artifact_type,
            name: artifact_type.display_name().to_string(),
            description: String::new(),
            content: content.into(),
        }
    }

    /// A blank name keeps the type's display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !name.trim().is_empty() {
            self.name = name;
        }
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// An issue block as decoded from worker text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedIssue {
    pub issue_type: IssueType,
    pub severity: Severity,
    pub title: String,
    pub description: String,
}

impl DecodedIssue {
    pub fn new(issue_type: IssueType, severity: Severity, title: impl Into<String>) -> Self {
        Self {
            issue_type,
            severity,
            title: title.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Everything decoded from one blob of worker output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedOutput {
    pub artifacts: Vec<DecodedArtifact>,
    pub issues: Vec<DecodedIssue>,
}

impl DecodedOutput {
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty() && self.issues.is_empty()
    }
}
