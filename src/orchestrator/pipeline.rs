use super::PipelineCallbacks;
use crate::context::ContextOptimizer;
use crate::errors::PipelineError;
use crate::executor::{AttemptRequest, StageExecutor};
use crate::model::{Artifact, Feature, FeatureStatus, PipelineRunResult, StageResult, StageStatus};
use crate::policy::{Decision, PolicyConfig, decide, infer_skips};
use crate::role::AgentRole;
use crate::stage::{Stage, StageDefinition, StageRegistry};
use crate::store::FeatureStore;
use crate::worker::Worker;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Per-run options.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub skip_stages: HashSet<Stage>,
    pub max_retries: u32,
    /// Stages before this one are recorded as skipped and never dispatched
    pub start_from: Option<Stage>,
    pub infer_skips: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            skip_stages: HashSet::new(),
            max_retries: 2,
            start_from: None,
            infer_skips: false,
        }
    }
}

impl RunOptions {
    pub fn with_skips(mut self, stages: impl IntoIterator<Item = Stage>) -> Self {
        self.skip_stages.extend(stages);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn starting_from(mut self, stage: Stage) -> Self {
        self.start_from = Some(stage);
        self
    }

    pub fn with_inferred_skips(mut self, enabled: bool) -> Self {
        self.infer_skips = enabled;
        self
    }
}

/// How a single stage resolved.
enum StageOutcome {
    Completed,
    Skipped,
    Failed,
}

/// Drives a feature through the stage table.
pub struct PipelineOrchestrator {
    registry: Arc<StageRegistry>,
    store: Arc<dyn FeatureStore>,
    executor: StageExecutor,
    disabled_roles: HashSet<AgentRole>,
}

impl PipelineOrchestrator {
    pub fn new(
        registry: Arc<StageRegistry>,
        store: Arc<dyn FeatureStore>,
        worker: Arc<dyn Worker>,
        optimizer: Arc<ContextOptimizer>,
    ) -> Self {
        Self {
            registry,
            store,
            executor: StageExecutor::new(worker, optimizer),
            disabled_roles: HashSet::new(),
        }
    }

    /// Roles that are never dispatched. A stage whose primary role is
    /// disabled is skipped.
    pub fn with_disabled_roles(mut self, roles: impl IntoIterator<Item = AgentRole>) -> Self {
        self.disabled_roles.extend(roles);
        self.executor = self
            .executor
            .with_disabled_roles(self.disabled_roles.iter().copied());
        self
    }

    pub fn registry(&self) -> &StageRegistry {
        &self.registry
    }

    /// Save a new feature, then run it.
    pub async fn start(
        &self,
        feature: &Feature,
        options: &RunOptions,
        callbacks: &dyn PipelineCallbacks,
    ) -> Result<PipelineRunResult, PipelineError> {
        if let Err(e) = self.store.save_feature(feature) {
            callbacks.on_error(None, &e.to_string());
            return Err(e.into());
        }
        self.run(&feature.id, options, callbacks).await
    }

    /// Run a stored feature through the pipeline.
    ///
    /// Halts at the first stage that ends `failed`; later stages are neither
    /// attempted nor reported. Configuration and store errors abort the run.
    pub async fn run(
        &self,
        feature_id: &str,
        options: &RunOptions,
        callbacks: &dyn PipelineCallbacks,
    ) -> Result<PipelineRunResult, PipelineError> {
        let mut current = None;
        match self.drive(feature_id, options, callbacks, &mut current).await {
            Ok(result) => Ok(result),
            Err(e) => {
                warn!(feature_id, error = %e, "Pipeline aborted");
                callbacks.on_error(current, &e.to_string());
                Err(e)
            }
        }
    }

    async fn drive(
        &self,
        feature_id: &str,
        options: &RunOptions,
        callbacks: &dyn PipelineCallbacks,
        current: &mut Option<Stage>,
    ) -> Result<PipelineRunResult, PipelineError> {
        let feature = self.store.load_feature(feature_id)?;
        let start_index = match options.start_from {
            Some(stage) => self.registry.position(stage)?,
            None => 0,
        };

        let mut skips = options.skip_stages.clone();
        if options.infer_skips {
            let inferred = infer_skips(&feature.description);
            if !inferred.is_empty() {
                info!(feature_id, stages = ?inferred, "Inferred skips from description");
            }
            skips.extend(inferred);
        }

        let policy = PolicyConfig::new(options.max_retries)
            .with_disabled_roles(self.disabled_roles.iter().copied());

        self.update_feature(feature_id, |f| f.set_status(FeatureStatus::InProgress))?;
        info!(
            feature_id,
            name = %feature.name,
            stages = self.registry.len(),
            max_retries = options.max_retries,
            "Pipeline started"
        );

        let mut run = PipelineRunResult::new(feature_id);
        for (index, definition) in self.registry.stages_in_order().iter().enumerate() {
            let stage = definition.stage;
            *current = Some(stage);

            if index < start_index {
                run.stages_skipped.push(stage);
                continue;
            }

            let outcome = self
                .run_stage(&feature, definition, skips.contains(&stage), &policy, callbacks, &mut run)
                .await?;
            match outcome {
                StageOutcome::Completed => run.stages_completed.push(stage),
                StageOutcome::Skipped => run.stages_skipped.push(stage),
                StageOutcome::Failed => {
                    run.stages_failed.push(stage);
                    break;
                }
            }
        }

        let run = run.finalize();
        if run.success {
            self.update_feature(feature_id, |f| {
                f.advance_to(Stage::Completed);
                f.set_status(FeatureStatus::Completed);
            })?;
        } else {
            self.update_feature(feature_id, |f| f.set_status(FeatureStatus::OnHold))?;
        }

        info!(
            feature_id,
            success = run.success,
            completed = run.stages_completed.len(),
            failed = run.stages_failed.len(),
            skipped = run.stages_skipped.len(),
            tokens = run.total_tokens_used,
            "Pipeline finished"
        );
        Ok(run)
    }

    /// Run one stage to resolution: skipped, approved, or failed after retries.
    async fn run_stage(
        &self,
        feature: &Feature,
        definition: &StageDefinition,
        requested_skip: bool,
        policy: &PolicyConfig,
        callbacks: &dyn PipelineCallbacks,
        run: &mut PipelineRunResult,
    ) -> Result<StageOutcome, PipelineError> {
        let stage = definition.stage;

        if decide(definition, 0, None, requested_skip, policy) == Decision::Skip {
            info!(stage = %stage, "Skipping stage");
            let skipped = StageResult::skipped(stage);
            self.store.record_stage_result(&feature.id, &skipped)?;
            callbacks.on_stage_complete(&skipped);
            return Ok(StageOutcome::Skipped);
        }

        self.update_feature(&feature.id, |f| f.advance_to(stage))?;
        let inputs = self.stage_inputs(&feature.id, definition)?;

        let mut attempt = 1;
        loop {
            callbacks.on_stage_start(stage, attempt);
            info!(stage = %stage, attempt, inputs = inputs.len(), "Stage attempt started");

            let outcome = self
                .executor
                .run_attempt(
                    AttemptRequest {
                        feature_id: &feature.id,
                        feature_name: &feature.name,
                        feature_description: &feature.description,
                        definition,
                        inputs: &inputs,
                        attempt,
                    },
                    callbacks,
                )
                .await;

            if let Some(message) = &outcome.primary_error {
                callbacks.on_error(Some(stage), message);
            }

            let mut result = outcome.result;
            let decision = decide(definition, attempt, Some(result.status), requested_skip, policy);
            if decision == Decision::Fail {
                result.status = StageStatus::Failed;
            }

            self.store.record_stage_result(&feature.id, &result)?;
            self.store.record_issues(&feature.id, &result.issues)?;
            run.absorb(&result);
            callbacks.on_stage_complete(&result);

            match decision {
                Decision::Proceed => return Ok(StageOutcome::Completed),
                Decision::Retry => {
                    info!(stage = %stage, attempt, "Stage needs revision, retrying");
                    attempt += 1;
                }
                Decision::Fail => {
                    warn!(stage = %stage, attempts = attempt, "Stage failed");
                    return Ok(StageOutcome::Failed);
                }
                Decision::Skip => return Ok(StageOutcome::Skipped),
            }
        }
    }

    /// Latest stored artifacts of every type the stage requires.
    fn stage_inputs(
        &self,
        feature_id: &str,
        definition: &StageDefinition,
    ) -> Result<Vec<Artifact>, PipelineError> {
        let mut inputs = Vec::new();
        for &artifact_type in &definition.required_input_types {
            inputs.extend(self.store.latest_artifacts_by_type(feature_id, artifact_type)?);
        }
        Ok(inputs)
    }

    /// Reload, mutate, and save the feature record.
    ///
    /// Always reloads so artifacts persisted by workers are not clobbered.
    fn update_feature(
        &self,
        feature_id: &str,
        f: impl FnOnce(&mut Feature),
    ) -> Result<(), PipelineError> {
        let mut feature = self.store.load_feature(feature_id)?;
        f(&mut feature);
        self.store.save_feature(&feature)?;
        Ok(())
    }
}
