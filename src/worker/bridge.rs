use super::{Worker, decode_result};
use super::process::ProcessRunner;
use super::producer::{ContentProducer, PlaceholderProducer};
use super::stream::parse_stream_output;
use crate::config::WorkerSection;
use crate::errors::WorkerError;
use crate::model::{Task, WorkerResult};
use crate::store::FeatureStore;
use crate::util::estimate_tokens;
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// How the bridge produces worker output. Fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionMode {
    External { program: PathBuf },
    InProcess,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::External { .. } => "external",
            Self::InProcess => "in_process",
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::External { program } => write!(f, "external ({})", program.display()),
            Self::InProcess => f.write_str("in-process"),
        }
    }
}

fn expand_home(command: &str) -> PathBuf {
    if let Some(rest) = command.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(command)
}

/// Locate a worker executable.
///
/// Commands containing a path separator must exist as given (after `~`
/// expansion); bare names are searched on `PATH`.
pub fn discover_program(command: &str) -> Option<PathBuf> {
    let command = command.trim();
    if command.is_empty() {
        return None;
    }

    let candidate = expand_home(command);
    if candidate.components().count() > 1 {
        return candidate.is_file().then_some(candidate);
    }

    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(command))
        .find(|p| p.is_file())
}

/// Dispatches tasks to an external worker process or the in-process
/// producer, decodes the output, and persists decoded artifacts.
pub struct WorkerBridge {
    mode: ExecutionMode,
    runner: Option<ProcessRunner>,
    producer: Arc<dyn ContentProducer>,
    store: Arc<dyn FeatureStore>,
}

impl WorkerBridge {
    /// Resolve the execution mode from worker settings.
    pub fn from_config(
        settings: &WorkerSection,
        working_dir: &Path,
        store: Arc<dyn FeatureStore>,
    ) -> Self {
        match discover_program(&settings.command) {
            Some(program) => {
                info!(program = %program.display(), "Using external worker");
                let runner = ProcessRunner::new(program.clone(), settings.invocation_args())
                    .with_timeout(settings.timeout())
                    .with_stderr_limit(settings.stderr_limit)
                    .with_working_dir(working_dir);
                Self {
                    mode: ExecutionMode::External { program },
                    runner: Some(runner),
                    producer: Arc::new(PlaceholderProducer),
                    store,
                }
            }
            None => {
                if !settings.command.trim().is_empty() {
                    warn!(
                        command = %settings.command,
                        "Worker command not found, falling back to in-process producer"
                    );
                }
                Self::in_process(store)
            }
        }
    }

    pub fn in_process(store: Arc<dyn FeatureStore>) -> Self {
        Self {
            mode: ExecutionMode::InProcess,
            runner: None,
            producer: Arc::new(PlaceholderProducer),
            store,
        }
    }

    /// Replace the in-process producer.
    pub fn with_producer(mut self, producer: Arc<dyn ContentProducer>) -> Self {
        self.producer = producer;
        self
    }

    pub fn mode(&self) -> &ExecutionMode {
        &self.mode
    }

    /// Raw text and, when reported, token usage.
    async fn invoke(&self, task: &Task) -> Result<(String, Option<u64>), WorkerError> {
        let Some(runner) = &self.runner else {
            return self.producer.produce(task).map(|text| (text, None));
        };

        let env = [
            ("STAGECRAFT_ROLE", task.assigned_role.as_str().to_string()),
            ("STAGECRAFT_STAGE", task.stage.as_str().to_string()),
            ("STAGECRAFT_FEATURE_ID", task.feature_id.clone()),
            ("STAGECRAFT_TASK_ID", task.id.clone()),
        ];
        let output = runner.run(&task.instructions, &env).await?;

        match parse_stream_output(&output.stdout) {
            Some(stream) if stream.is_error => Err(WorkerError::Reported(stream.text)),
            Some(stream) => Ok((stream.text, stream.tokens)),
            None => Ok((output.stdout, None)),
        }
    }
}

#[async_trait]
impl Worker for WorkerBridge {
    async fn execute(&self, task: &Task) -> WorkerResult {
        let started = Instant::now();
        let role = task.assigned_role;
        debug!(
            role = %role,
            stage = %task.stage,
            task_id = %task.id,
            mode = self.mode.as_str(),
            "Dispatching task"
        );

        let mut result = match self.invoke(task).await {
            Ok((text, reported)) => {
                let tokens = reported.unwrap_or_else(|| {
                    estimate_tokens(&task.instructions) + estimate_tokens(&text)
                });
                let mut result = decode_result(task, text, Some(&*self.store));
                result.tokens_used = tokens;
                result
            }
            Err(e) => {
                warn!(role = %role, stage = %task.stage, error = %e, "Worker failed");
                WorkerResult::failure(role, e.to_string()).with_metadata("error_kind", e.kind().into())
            }
        };

        result.duration_ms = started.elapsed().as_millis() as u64;
        result
            .metadata
            .insert("mode".to_string(), self.mode.as_str().into());
        debug!(
            role = %role,
            stage = %task.stage,
            success = result.is_success(),
            artifacts = result.artifacts.len(),
            issues = result.issues.len(),
            tokens = result.tokens_used,
            "Task finished"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ArtifactType, Feature, IssueType, Severity};
    use crate::protocol::{DecodedArtifact, DecodedIssue, encode_artifact, encode_issue};
    use crate::role::AgentRole;
    use crate::stage::Stage;
    use crate::store::InMemoryStore;

    struct Scripted(String);

    impl ContentProducer for Scripted {
        fn produce(&self, _task: &Task) -> Result<String, WorkerError> {
            Ok(self.0.clone())
        }
    }

    struct Broken;

    impl ContentProducer for Broken {
        fn produce(&self, _task: &Task) -> Result<String, WorkerError> {
            Err(WorkerError::Producer("generator offline".to_string()))
        }
    }

    fn store() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        store.save_feature(&Feature::with_id("f1", "Search", "d")).unwrap();
        store
    }

    fn task() -> Task {
        Task::new("f1", Stage::ArchitectureDesign, AgentRole::SystemArchitect)
            .with_instructions("design it")
            .with_expected_outputs(vec![ArtifactType::ArchitectureDoc])
    }

    #[test]
    fn test_discover_program() {
        assert_eq!(discover_program(""), None);
        assert_eq!(discover_program("/definitely/not/here/worker"), None);
        assert_eq!(discover_program("stagecraft-no-such-worker-binary"), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_discover_program_on_path() {
        let found = discover_program("sh").unwrap();
        assert!(found.ends_with("sh"));
    }

    #[test]
    fn test_empty_command_means_in_process() {
        let settings = WorkerSection {
            command: String::new(),
            ..WorkerSection::default()
        };
        let bridge = WorkerBridge::from_config(&settings, Path::new("."), store());
        assert_eq!(bridge.mode(), &ExecutionMode::InProcess);
    }

    #[tokio::test]
    async fn test_in_process_persists_versioned_artifacts() {
        let store = store();
        let bridge = WorkerBridge::in_process(store.clone());

        let first = bridge.execute(&task()).await;
        assert!(first.is_success());
        assert_eq!(first.artifacts.len(), 1);
        assert_eq!(first.artifacts[0].version, 1);
        assert_eq!(first.artifacts[0].created_by, AgentRole::SystemArchitect);
        assert_eq!(first.metadata["mode"], "in_process");
        assert!(first.tokens_used > 0);

        let second = bridge.execute(&task()).await;
        assert_eq!(second.artifacts[0].version, 2);
        assert_eq!(
            store
                .latest_artifacts_by_type("f1", ArtifactType::ArchitectureDoc)
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_decoded_issues_are_attributed() {
        let text = format!(
            "Looked it over.\n{}{}",
            encode_artifact(&DecodedArtifact::new(ArtifactType::SecurityReport, "ok")),
            encode_issue(&DecodedIssue::new(
                IssueType::SecurityVulnerability,
                Severity::Critical,
                "Secrets in logs"
            ))
        );
        let bridge = WorkerBridge::in_process(store()).with_producer(Arc::new(Scripted(text)));

        let result = bridge.execute(&task()).await;
        assert_eq!(result.issues.len(), 1);
        let issue = &result.issues[0];
        assert_eq!(issue.reported_by, AgentRole::SystemArchitect);
        assert_eq!(issue.stage, Stage::ArchitectureDesign);
        assert_eq!(issue.feature_id, "f1");
        assert!(issue.severity.is_critical());
    }

    #[tokio::test]
    async fn test_producer_error_becomes_failure() {
        let bridge = WorkerBridge::in_process(store()).with_producer(Arc::new(Broken));
        let result = bridge.execute(&task()).await;
        assert!(!result.is_success());
        assert!(result.error.as_deref().unwrap().contains("generator offline"));
        assert_eq!(result.metadata["error_kind"], "producer");
    }

    #[tokio::test]
    async fn test_unknown_feature_becomes_failure() {
        let bridge = WorkerBridge::in_process(Arc::new(InMemoryStore::new()));
        let result = bridge.execute(&task()).await;
        assert!(!result.is_success());
        assert_eq!(result.metadata["error_kind"], "store");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_external_worker_stream_json() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("worker.sh");
        std::fs::write(
            &script,
            r#"#!/bin/sh
cat > /dev/null
printf '%s\n' '{"type":"result","subtype":"success","result":"---ARTIFACT_START---\nType: architecture_doc\nContent:\nlayers\n---ARTIFACT_END---","usage":{"input_tokens":10,"output_tokens":5}}'
"#,
        )
        .unwrap();
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        let settings = WorkerSection {
            command: script.display().to_string(),
            args: vec![],
            ..WorkerSection::default()
        };
        let bridge = WorkerBridge::from_config(&settings, dir.path(), store());
        assert!(matches!(bridge.mode(), ExecutionMode::External { .. }));

        let result = bridge.execute(&task()).await;
        assert!(result.is_success(), "{:?}", result.error);
        assert_eq!(result.tokens_used, 15);
        assert_eq!(result.artifacts.len(), 1);
        assert_eq!(result.artifacts[0].content, "layers");
        assert_eq!(result.metadata["mode"], "external");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_external_worker_exit_code() {
        let settings = WorkerSection {
            command: "sh".to_string(),
            args: vec!["-c".to_string(), "echo broken >&2; exit 2".to_string()],
            ..WorkerSection::default()
        };
        let bridge = WorkerBridge::from_config(&settings, Path::new("."), store());
        let result = bridge.execute(&task()).await;
        assert!(!result.is_success());
        assert!(result.error.as_deref().unwrap().contains("broken"));
        assert_eq!(result.metadata["error_kind"], "non_zero_exit");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stream_error_result_is_reported_error() {
        let settings = WorkerSection {
            command: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                r#"cat > /dev/null; echo '{"type":"result","subtype":"error_during_execution","result":"rate limited","is_error":true}'"#.to_string(),
            ],
            ..WorkerSection::default()
        };
        let bridge = WorkerBridge::from_config(&settings, Path::new("."), store());
        let result = bridge.execute(&task()).await;

        assert!(!result.is_success());
        let error = result.error.as_deref().unwrap();
        assert!(error.contains("rate limited"));
        assert!(!error.contains("exited with code"));
        assert_eq!(result.metadata["error_kind"], "reported_error");
    }
}
