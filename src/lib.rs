pub mod config;
pub mod context;
pub mod errors;
pub mod executor;
pub mod init;
pub mod model;
pub mod orchestrator;
pub mod policy;
pub mod protocol;
pub mod role;
pub mod stage;
pub mod store;
pub mod util;
pub mod worker;

pub use errors::{PipelineError, StageConfigurationError, StoreError, WorkerError};
pub use orchestrator::{NoopCallbacks, PipelineCallbacks, PipelineOrchestrator, RunOptions};
