//! Feature state storage.
//!
//! The pipeline needs a small persistence surface: record each stage's
//! result, version and fetch artifacts, append issues, and save/load the
//! feature itself. [`InMemoryStore`] backs tests and embedding;
//! [`JsonFileStore`] persists under `.stagecraft/features/`.

mod file;
mod memory;

pub use file::{JsonFileStore, StageLogEntry};
pub use memory::InMemoryStore;

use crate::errors::StoreError;
use crate::model::{Artifact, ArtifactStatus, ArtifactType, Feature, Issue, StageResult};

/// Persistence boundary for feature state.
///
/// Implementations must be shareable across the concurrent members of a
/// stage attempt, since the worker bridge persists artifacts as they arrive.
pub trait FeatureStore: Send + Sync {
    /// Insert or replace the feature record.
    fn save_feature(&self, feature: &Feature) -> Result<(), StoreError>;

    fn load_feature(&self, feature_id: &str) -> Result<Feature, StoreError>;

    /// Record a stage attempt, replacing any earlier attempt of the same stage.
    fn record_stage_result(&self, feature_id: &str, result: &StageResult)
    -> Result<(), StoreError>;

    /// Store a new artifact version and return it with its assigned version.
    fn save_artifact(&self, feature_id: &str, artifact: Artifact) -> Result<Artifact, StoreError>;

    /// The newest version of every artifact of `artifact_type`.
    fn latest_artifacts_by_type(
        &self,
        feature_id: &str,
        artifact_type: ArtifactType,
    ) -> Result<Vec<Artifact>, StoreError>;

    fn record_issues(&self, feature_id: &str, issues: &[Issue]) -> Result<(), StoreError>;
}

/// Assign the next version for the artifact's type and name, mark older
/// versions superseded, and append it.
pub(crate) fn apply_artifact(feature: &mut Feature, mut artifact: Artifact) -> Artifact {
    let mut previous = 0;
    for existing in feature.artifacts.iter_mut().filter(|a| {
        a.artifact_type == artifact.artifact_type && a.name == artifact.name
    }) {
        previous = previous.max(existing.version);
        existing.status = ArtifactStatus::Superseded;
    }
    artifact.version = previous + 1;
    feature.artifacts.push(artifact.clone());
    artifact
}

/// Newest version per name for one artifact type, in first-seen order.
pub(crate) fn latest_of_type(feature: &Feature, artifact_type: ArtifactType) -> Vec<Artifact> {
    let mut latest: Vec<Artifact> = Vec::new();
    for artifact in feature
        .artifacts
        .iter()
        .filter(|a| a.artifact_type == artifact_type)
    {
        match latest.iter_mut().find(|a| a.name == artifact.name) {
            Some(slot) if slot.version < artifact.version => *slot = artifact.clone(),
            Some(_) => {}
            None => latest.push(artifact.clone()),
        }
    }
    latest
}

pub(crate) fn apply_stage_result(feature: &mut Feature, result: &StageResult) {
    feature.stage_results.insert(result.stage, result.clone());
    feature.updated_at = chrono::Utc::now();
}
