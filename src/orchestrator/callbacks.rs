use crate::model::StageResult;
use crate::role::AgentRole;
use crate::stage::Stage;

/// Lifecycle hooks for a pipeline run. Every method defaults to a no-op.
///
/// Hooks are called from the task driving the run, never from inside a
/// concurrent worker.
pub trait PipelineCallbacks: Send + Sync {
    /// A stage attempt is about to dispatch. `attempt` starts at 1.
    fn on_stage_start(&self, _stage: Stage, _attempt: u32) {}

    /// A stage attempt finished with this result.
    fn on_stage_complete(&self, _result: &StageResult) {}

    /// A role is being handed a task.
    fn on_agent_work(&self, _stage: Stage, _role: AgentRole, _activity: &str) {}

    /// A primary worker failed, or the run hit a fatal error. `stage` is
    /// `None` when the error happened outside any stage.
    fn on_error(&self, _stage: Option<Stage>, _message: &str) {}
}

/// Callbacks that ignore every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCallbacks;

impl PipelineCallbacks for NoopCallbacks {}
