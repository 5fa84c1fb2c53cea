//! Typed error hierarchy for the stagecraft pipeline.
//!
//! Four enums cover the subsystems:
//! - `StageConfigurationError`: registry and lookup problems (always fatal)
//! - `WorkerError`: worker launch/timeout failures, trapped at the bridge
//! - `StoreError`: feature state store failures
//! - `PipelineError`: what the orchestrator surfaces to its caller

use crate::role::AgentRole;
use crate::stage::Stage;
use thiserror::Error;

/// Problems with the stage table or a stage/role reference.
///
/// These abort a run immediately and are never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StageConfigurationError {
    #[error("Unknown stage '{0}'")]
    UnknownStage(String),

    #[error("Stage {0} is not defined in the registry")]
    MissingDefinition(Stage),

    #[error("Stage {0} is defined more than once")]
    DuplicateStage(Stage),

    #[error("The terminal '{0}' marker cannot be registered as a stage")]
    TerminalStageInTable(Stage),

    #[error("Stage {stage} lists its primary role {role} as a supporting or reviewing role")]
    RoleConflict { stage: Stage, role: AgentRole },

    #[error("Unknown role '{0}'")]
    UnknownRole(String),

    #[error("Stage registry is empty")]
    EmptyRegistry,
}

/// Errors from invoking a single worker.
///
/// The dispatch bridge converts every variant into a `failure` worker result;
/// none of these propagate into the executor.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Failed to spawn worker process '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Worker timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Worker exited with code {exit_code}: {diagnostic}")]
    NonZeroExit { exit_code: i32, diagnostic: String },

    #[error("Worker I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The worker exited cleanly but flagged its own result as an error.
    #[error("Worker reported an error: {0}")]
    Reported(String),

    #[error("In-process producer failed: {0}")]
    Producer(String),
}

impl WorkerError {
    /// Short machine-readable kind, recorded in worker result metadata.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Spawn { .. } => "invocation",
            Self::Timeout { .. } => "timeout",
            Self::NonZeroExit { .. } => "non_zero_exit",
            Self::Io(_) => "io",
            Self::Reported(_) => "reported_error",
            Self::Producer(_) => "producer",
        }
    }
}

/// Errors from the feature state store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O error at {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to (de)serialize store state: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error("Feature {0} not found")]
    FeatureNotFound(String),

    #[error("Invalid feature id '{0}': ids become file names and may not contain path separators or '..'")]
    InvalidFeatureId(String),
}

/// Errors surfaced by the orchestrator to its caller.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Stage configuration error: {0}")]
    StageConfiguration(#[from] StageConfigurationError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl PipelineError {
    /// Whether this error must abort the run without retrying.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::StageConfiguration(_) | Self::Store(_))
    }
}
