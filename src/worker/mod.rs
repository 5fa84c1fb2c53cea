//! Worker dispatch.
//!
//! A [`Worker`] turns one [`Task`] into one [`WorkerResult`] and never
//! errors: launch failures, timeouts, and bad exits all come back as
//! `failure` results. [`WorkerBridge`] is the production implementation;
//! [`MockWorker`] is a scripted stand-in for tests and dry runs.

mod bridge;
mod mock;
mod process;
mod producer;
mod stream;

pub use bridge::{ExecutionMode, WorkerBridge, discover_program};
pub use mock::{MockReply, MockWorker};
pub use process::{ProcessOutput, ProcessRunner};
pub use producer::{ContentProducer, PlaceholderProducer};
pub use stream::{StreamEvent, StreamOutput, Usage, parse_stream_output};

use crate::model::{Artifact, Issue, Task, WorkerResult};
use crate::protocol::decode;
use crate::store::FeatureStore;
use async_trait::async_trait;
use tracing::warn;

#[async_trait]
pub trait Worker: Send + Sync {
    async fn execute(&self, task: &Task) -> WorkerResult;
}

/// Decode worker text into a success result.
///
/// With a store, every decoded artifact is persisted and the versioned copy
/// is returned; a store failure turns the whole result into a failure.
pub(crate) fn decode_result(
    task: &Task,
    text: String,
    store: Option<&dyn FeatureStore>,
) -> WorkerResult {
    let role = task.assigned_role;
    let decoded = decode(&text);
    let mut result = WorkerResult::success(role, text);

    for block in decoded.artifacts {
        let artifact = Artifact::new(block.artifact_type, block.name, block.content, role)
            .with_description(block.description);
        let Some(store) = store else {
            result.artifacts.push(artifact);
            continue;
        };
        match store.save_artifact(&task.feature_id, artifact) {
            Ok(saved) => result.artifacts.push(saved),
            Err(e) => {
                warn!(role = %role, error = %e, "Failed to persist artifact");
                return WorkerResult::failure(role, format!("Failed to persist artifact: {}", e))
                    .with_metadata("error_kind", "store".into());
            }
        }
    }

    result.issues = decoded
        .issues
        .into_iter()
        .map(|issue| {
            Issue::new(
                &task.feature_id,
                task.stage,
                role,
                issue.issue_type,
                issue.severity,
                issue.title,
            )
            .with_description(issue.description)
        })
        .collect();
    result
}
