use super::{FeatureStore, apply_artifact, apply_stage_result, latest_of_type};
use crate::errors::StoreError;
use crate::model::{Artifact, ArtifactType, Feature, Issue, StageResult};
use std::collections::HashMap;
use std::sync::Mutex;

/// Process-local store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    features: Mutex<HashMap<String, Feature>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_feature<T>(
        &self,
        feature_id: &str,
        f: impl FnOnce(&mut Feature) -> T,
    ) -> Result<T, StoreError> {
        let mut features = self.features.lock().map_err(|_| StoreError::LockPoisoned)?;
        let feature = features
            .get_mut(feature_id)
            .ok_or_else(|| StoreError::FeatureNotFound(feature_id.to_string()))?;
        Ok(f(feature))
    }
}

impl FeatureStore for InMemoryStore {
    fn save_feature(&self, feature: &Feature) -> Result<(), StoreError> {
        let mut features = self.features.lock().map_err(|_| StoreError::LockPoisoned)?;
        features.insert(feature.id.clone(), feature.clone());
        Ok(())
    }

    fn load_feature(&self, feature_id: &str) -> Result<Feature, StoreError> {
        self.with_feature(feature_id, |f| f.clone())
    }

    fn record_stage_result(
        &self,
        feature_id: &str,
        result: &StageResult,
    ) -> Result<(), StoreError> {
        self.with_feature(feature_id, |f| apply_stage_result(f, result))
    }

    fn save_artifact(&self, feature_id: &str, artifact: Artifact) -> Result<Artifact, StoreError> {
        self.with_feature(feature_id, |f| apply_artifact(f, artifact))
    }

    fn latest_artifacts_by_type(
        &self,
        feature_id: &str,
        artifact_type: ArtifactType,
    ) -> Result<Vec<Artifact>, StoreError> {
        self.with_feature(feature_id, |f| latest_of_type(f, artifact_type))
    }

    fn record_issues(&self, feature_id: &str, issues: &[Issue]) -> Result<(), StoreError> {
        self.with_feature(feature_id, |f| f.issues.extend(issues.iter().cloned()))
    }
}
