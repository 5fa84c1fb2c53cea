//! Retry and skip decisions.
//!
//! [`decide`] is a pure function of the stage definition, how many attempts
//! have run, the latest outcome, and the run's settings. The orchestrator
//! calls it once before dispatching a stage (with no outcome) and again
//! after every attempt.

mod inference;

pub use inference::infer_skips;

use crate::model::StageStatus;
use crate::role::AgentRole;
use crate::stage::StageDefinition;
use std::collections::HashSet;
use std::fmt;
use tracing::info;

/// What to do next with a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Retry,
    Skip,
    Fail,
    Proceed,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Retry => "retry",
            Self::Skip => "skip",
            Self::Fail => "fail",
            Self::Proceed => "proceed",
        };
        f.write_str(s)
    }
}

/// Run-level inputs to the policy.
#[derive(Debug, Clone, Default)]
pub struct PolicyConfig {
    pub max_retries: u32,
    pub disabled_roles: HashSet<AgentRole>,
}

impl PolicyConfig {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            disabled_roles: HashSet::new(),
        }
    }

    pub fn with_disabled_roles(mut self, roles: impl IntoIterator<Item = AgentRole>) -> Self {
        self.disabled_roles.extend(roles);
        self
    }

    pub fn is_disabled(&self, role: AgentRole) -> bool {
        self.disabled_roles.contains(&role)
    }

    /// Retries allowed for a stage: the lower of the run's and the stage's limit.
    pub fn retry_limit(&self, definition: &StageDefinition) -> u32 {
        self.max_retries.min(definition.retry_ceiling)
    }
}

/// Decide the next step for a stage.
///
/// `attempt_count` is the number of attempts already executed; `outcome` is
/// the status of the latest one, or `None` before the first dispatch. A skip
/// request against a mandatory stage is ignored.
pub fn decide(
    definition: &StageDefinition,
    attempt_count: u32,
    outcome: Option<StageStatus>,
    requested_skip: bool,
    config: &PolicyConfig,
) -> Decision {
    if requested_skip {
        if !definition.mandatory {
            return Decision::Skip;
        }
        if outcome.is_none() {
            info!(
                stage = %definition.stage,
                "Skip requested for mandatory stage, running it anyway"
            );
        }
    }

    if config.is_disabled(definition.primary_role) {
        return Decision::Skip;
    }

    match outcome {
        None | Some(StageStatus::Approved) => Decision::Proceed,
        Some(StageStatus::RevisionNeeded) if attempt_count <= config.retry_limit(definition) => {
            Decision::Retry
        }
        Some(_) => Decision::Fail,
    }
}
