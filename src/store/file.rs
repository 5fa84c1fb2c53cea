use super::{FeatureStore, apply_artifact, apply_stage_result, latest_of_type};
use crate::errors::StoreError;
use crate::model::{Artifact, ArtifactType, Feature, Issue, StageResult, StageStatus};
use crate::stage::Stage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Feature ids become file names, so they must stay inside the store dir.
fn check_feature_id(feature_id: &str) -> Result<(), StoreError> {
    if feature_id.is_empty()
        || feature_id.contains(['/', '\\'])
        || feature_id.contains("..")
        || feature_id.starts_with('.')
    {
        return Err(StoreError::InvalidFeatureId(feature_id.to_string()));
    }
    Ok(())
}

/// One line of a feature's append-only stage log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageLogEntry {
    pub stage: Stage,
    pub status: StageStatus,
    pub retry_count: u32,
    pub tokens_used: u64,
    pub timestamp: DateTime<Utc>,
}

/// File-backed store.
///
/// Each feature is a JSON snapshot at `<dir>/<id>.json`, rewritten on every
/// change, plus an append-only `<id>.stages.jsonl` with one line per stage
/// attempt. Snapshots are cached in memory and reloaded from disk on a miss,
/// so a new process picks up where an old one stopped.
#[derive(Debug)]
pub struct JsonFileStore {
    dir: PathBuf,
    cache: Mutex<HashMap<String, Feature>>,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            cache: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn snapshot_path(&self, feature_id: &str) -> Result<PathBuf, StoreError> {
        check_feature_id(feature_id)?;
        Ok(self.dir.join(format!("{}.json", feature_id)))
    }

    fn log_path(&self, feature_id: &str) -> Result<PathBuf, StoreError> {
        check_feature_id(feature_id)?;
        Ok(self.dir.join(format!("{}.stages.jsonl", feature_id)))
    }

    fn read_snapshot(&self, feature_id: &str) -> Result<Feature, StoreError> {
        let path = self.snapshot_path(feature_id)?;
        if !path.exists() {
            return Err(StoreError::FeatureNotFound(feature_id.to_string()));
        }
        let content = fs::read_to_string(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    fn write_snapshot(&self, feature: &Feature) -> Result<(), StoreError> {
        let path = self.snapshot_path(&feature.id)?;
        let tmp = path.with_extension("json.tmp");
        let content = serde_json::to_string_pretty(feature)?;
        fs::write(&tmp, content).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StoreError::Io { path, source })
    }

    fn append_log(&self, feature_id: &str, result: &StageResult) -> Result<(), StoreError> {
        let entry = StageLogEntry {
            stage: result.stage,
            status: result.status,
            retry_count: result.metrics.retry_count,
            tokens_used: result.metrics.tokens_used,
            timestamp: result.completed_at,
        };
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        let path = self.log_path(feature_id)?;
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut file| file.write_all(line.as_bytes()))
            .map_err(|source| StoreError::Io { path, source })
    }

    /// Every stage attempt recorded for a feature, oldest first.
    ///
    /// Lines that fail to parse are skipped.
    pub fn stage_log(&self, feature_id: &str) -> Result<Vec<StageLogEntry>, StoreError> {
        let path = self.log_path(feature_id)?;
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(content
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }

    /// Apply `f` to a copy of the feature and persist it.
    ///
    /// The cache only takes the new state once the snapshot is on disk.
    fn update<T>(
        &self,
        feature_id: &str,
        f: impl FnOnce(&mut Feature) -> T,
    ) -> Result<T, StoreError> {
        let mut cache = self.cache.lock().map_err(|_| StoreError::LockPoisoned)?;
        let mut feature = match cache.get(feature_id) {
            Some(feature) => feature.clone(),
            None => self.read_snapshot(feature_id)?,
        };
        let out = f(&mut feature);
        self.write_snapshot(&feature)?;
        cache.insert(feature_id.to_string(), feature);
        Ok(out)
    }
}

impl FeatureStore for JsonFileStore {
    fn save_feature(&self, feature: &Feature) -> Result<(), StoreError> {
        let mut cache = self.cache.lock().map_err(|_| StoreError::LockPoisoned)?;
        self.write_snapshot(feature)?;
        cache.insert(feature.id.clone(), feature.clone());
        Ok(())
    }

    fn load_feature(&self, feature_id: &str) -> Result<Feature, StoreError> {
        let mut cache = self.cache.lock().map_err(|_| StoreError::LockPoisoned)?;
        if let Some(feature) = cache.get(feature_id) {
            return Ok(feature.clone());
        }
        let feature = self.read_snapshot(feature_id)?;
        cache.insert(feature_id.to_string(), feature.clone());
        Ok(feature)
    }

    fn record_stage_result(
        &self,
        feature_id: &str,
        result: &StageResult,
    ) -> Result<(), StoreError> {
        self.update(feature_id, |f| apply_stage_result(f, result))?;
        self.append_log(feature_id, result)
    }

    fn save_artifact(&self, feature_id: &str, artifact: Artifact) -> Result<Artifact, StoreError> {
        self.update(feature_id, |f| apply_artifact(f, artifact))
    }

    fn latest_artifacts_by_type(
        &self,
        feature_id: &str,
        artifact_type: ArtifactType,
    ) -> Result<Vec<Artifact>, StoreError> {
        let feature = self.load_feature(feature_id)?;
        Ok(latest_of_type(&feature, artifact_type))
    }

    fn record_issues(&self, feature_id: &str, issues: &[Issue]) -> Result<(), StoreError> {
        if issues.is_empty() {
            return Ok(());
        }
        self.update(feature_id, |f| f.issues.extend(issues.iter().cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::AgentRole;
    use tempfile::tempdir;

    #[test]
    fn test_save_and_reload_across_instances() {
        let dir = tempdir().unwrap();
        let feature = Feature::with_id("feat-1", "Search", "Full-text search");

        {
            let store = JsonFileStore::new(dir.path()).unwrap();
            store.save_feature(&feature).unwrap();
            store
                .save_artifact(
                    "feat-1",
                    Artifact::new(
                        ArtifactType::RequirementsDoc,
                        "Reqs",
                        "FR-1 search",
                        AgentRole::ProductManager,
                    ),
                )
                .unwrap();
        }

        let reopened = JsonFileStore::new(dir.path()).unwrap();
        let loaded = reopened.load_feature("feat-1").unwrap();
        assert_eq!(loaded.name, "Search");
        assert_eq!(loaded.artifacts.len(), 1);
        assert_eq!(loaded.artifacts[0].version, 1);

        let next = reopened
            .save_artifact(
                "feat-1",
                Artifact::new(
                    ArtifactType::RequirementsDoc,
                    "Reqs",
                    "FR-1 search\nFR-2 filters",
                    AgentRole::ProductManager,
                ),
            )
            .unwrap();
        assert_eq!(next.version, 2);
    }

    #[test]
    fn test_stage_log_is_append_only() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();
        store.save_feature(&Feature::with_id("f", "n", "d")).unwrap();

        let mut attempt = StageResult::skipped(Stage::Implementation);
        attempt.status = StageStatus::RevisionNeeded;
        store.record_stage_result("f", &attempt).unwrap();
        attempt.status = StageStatus::Approved;
        attempt.metrics.retry_count = 1;
        store.record_stage_result("f", &attempt).unwrap();

        let log = store.stage_log("f").unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].status, StageStatus::RevisionNeeded);
        assert_eq!(log[1].status, StageStatus::Approved);
        assert_eq!(log[1].retry_count, 1);

        let feature = store.load_feature("f").unwrap();
        assert_eq!(feature.stage_results.len(), 1);
        assert_eq!(
            feature.stage_results[&Stage::Implementation].status,
            StageStatus::Approved
        );
    }

    #[test]
    fn test_missing_feature() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();
        assert!(matches!(
            store.load_feature("ghost"),
            Err(StoreError::FeatureNotFound(_))
        ));
        assert!(store.stage_log("ghost").unwrap().is_empty());
    }

    #[test]
    fn test_failed_write_leaves_cache_untouched() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();
        store.save_feature(&Feature::with_id("f", "n", "d")).unwrap();

        // A directory where the temp snapshot goes makes the write fail.
        let blocker = dir.path().join("f.json.tmp");
        fs::create_dir(&blocker).unwrap();
        let err = store.save_artifact(
            "f",
            Artifact::new(ArtifactType::SourceCode, "main.rs", "fn main() {}", AgentRole::SeniorDeveloper),
        );
        assert!(matches!(err, Err(StoreError::Io { .. })));
        assert!(store.load_feature("f").unwrap().artifacts.is_empty());

        fs::remove_dir(&blocker).unwrap();
        let issue = Issue::new(
            "f",
            Stage::CodeReview,
            AgentRole::CodeReviewer,
            crate::model::IssueType::Bug,
            crate::model::Severity::Low,
            "Typo",
        );
        store.record_issues("f", &[issue]).unwrap();

        let reopened = JsonFileStore::new(dir.path()).unwrap();
        let on_disk = reopened.load_feature("f").unwrap();
        assert!(on_disk.artifacts.is_empty());
        assert_eq!(on_disk.issues.len(), 1);
    }

    #[test]
    fn test_rejects_path_like_feature_ids() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("features")).unwrap();

        for id in ["../x", "a/b", "a\\b", "..", ".hidden", ""] {
            let feature = Feature::with_id(id, "n", "d");
            assert!(
                matches!(store.save_feature(&feature), Err(StoreError::InvalidFeatureId(_))),
                "accepted {:?}",
                id
            );
            assert!(matches!(
                store.load_feature(id),
                Err(StoreError::InvalidFeatureId(_))
            ));
        }
        assert!(!dir.path().join("x.json").exists());
        assert!(store.save_feature(&Feature::with_id("feat-2.1", "n", "d")).is_ok());
    }

    #[test]
    fn test_corrupt_snapshot_is_a_serialization_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("bad.json"), "{not json").unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();
        assert!(matches!(
            store.load_feature("bad"),
            Err(StoreError::Serialization(_))
        ));
    }
}
