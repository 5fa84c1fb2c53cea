//! Typed records that flow through the pipeline.
//!
//! Everything here is plain data. Parsing of free-form worker text lives in
//! [`crate::protocol`]; once a record reaches this module it is fully typed.

mod artifact;
mod feature;
mod issue;
mod result;
mod task;

pub use artifact::{Artifact, ArtifactStatus, ArtifactType, ReviewStatus};
pub use feature::{Feature, FeatureStatus};
pub use issue::{Issue, IssueStatus, IssueType, Severity};
pub use result::{
    PipelineRunResult, StageMetrics, StageResult, StageStatus, WorkerResult, WorkerStatus,
};
pub use task::Task;
