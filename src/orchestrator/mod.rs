//! Pipeline orchestration: the stage loop, its options, and lifecycle hooks.

mod callbacks;
mod pipeline;

pub use callbacks::{NoopCallbacks, PipelineCallbacks};
pub use pipeline::{PipelineOrchestrator, RunOptions};
