//! Pipeline execution command: `stagecraft run`.

use anyhow::{Context, Result};
use stagecraft::{PipelineCallbacks, StoreError};
use stagecraft::config::StagecraftConfig;
use stagecraft::context::ContextOptimizer;
use stagecraft::init::features_dir;
use stagecraft::model::{Feature, PipelineRunResult, Severity, StageResult, StageStatus};
use stagecraft::orchestrator::{PipelineOrchestrator, RunOptions};
use stagecraft::role::AgentRole;
use stagecraft::stage::{Stage, StageRegistry, parse_stage_list};
use stagecraft::store::{FeatureStore, JsonFileStore};
use stagecraft::worker::WorkerBridge;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use super::super::Cli;

/// Arguments of the `run` subcommand.
#[derive(Debug, Clone)]
pub struct RunArgs {
    pub name: Option<String>,
    pub description: String,
    pub skip: Option<String>,
    pub max_retries: Option<u32>,
    pub from: Option<String>,
    pub infer_skips: bool,
    pub feature_id: Option<String>,
}

/// Prints lifecycle events to stdout.
struct ConsoleCallbacks {
    verbose: bool,
}

impl PipelineCallbacks for ConsoleCallbacks {
    fn on_stage_start(&self, stage: Stage, attempt: u32) {
        if attempt == 1 {
            println!("{} {}", console::style("▶").cyan(), console::style(stage.display_name()).bold());
        } else {
            println!(
                "{} {} (attempt {})",
                console::style("↻").yellow(),
                console::style(stage.display_name()).bold(),
                attempt
            );
        }
    }

    fn on_stage_complete(&self, result: &StageResult) {
        let status = match result.status {
            StageStatus::Approved => console::style("approved").green(),
            StageStatus::RevisionNeeded => console::style("revision needed").yellow(),
            StageStatus::Failed => console::style("failed").red().bold(),
            StageStatus::Skipped => console::style("skipped").dim(),
        };
        if result.status == StageStatus::Skipped {
            println!("{} {} {}", console::style("·").dim(), result.stage.display_name(), status);
            return;
        }
        println!(
            "  {} ({} artifacts, {} issues, {} tokens)",
            status,
            result.metrics.artifacts_produced,
            result.metrics.issues_found,
            result.metrics.tokens_used
        );
    }

    fn on_agent_work(&self, _stage: Stage, role: AgentRole, activity: &str) {
        if self.verbose {
            println!("    {} {} ({})", console::style("→").dim(), role.display_name(), activity);
        }
    }

    fn on_error(&self, stage: Option<Stage>, message: &str) {
        let prefix = match stage {
            Some(stage) => format!("{}:", stage.display_name()),
            None => "Error:".to_string(),
        };
        println!("  {} {}", console::style(prefix).red().bold(), message);
    }
}

fn stage_names(stages: &[Stage]) -> String {
    if stages.is_empty() {
        "-".to_string()
    } else {
        stages.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
    }
}

fn severity_style(severity: Severity) -> console::StyledObject<&'static str> {
    let label = severity.as_str();
    match severity {
        Severity::Critical => console::style(label).red().bold(),
        Severity::High => console::style(label).red(),
        Severity::Medium => console::style(label).yellow(),
        Severity::Low | Severity::Info => console::style(label).dim(),
    }
}

/// Print the run summary: stage sets, totals, and issues by severity.
pub fn print_summary(result: &PipelineRunResult) {
    println!();
    let headline = if result.success {
        console::style("Pipeline completed").green().bold()
    } else {
        console::style("Pipeline halted").red().bold()
    };
    println!("{} for feature {}", headline, result.feature_id);
    println!();
    println!("  completed: {}", stage_names(&result.stages_completed));
    println!("  failed:    {}", stage_names(&result.stages_failed));
    println!("  skipped:   {}", stage_names(&result.stages_skipped));
    println!(
        "  artifacts: {}   tokens: {}   duration: {:.1}s",
        result.artifacts.len(),
        result.total_tokens_used,
        result.total_duration_ms as f64 / 1000.0
    );

    let grouped = result.issues_by_severity();
    if !grouped.is_empty() {
        println!();
        println!("Issues:");
        for (severity, issues) in grouped {
            println!("  {} ({})", severity_style(severity), issues.len());
            for issue in issues {
                println!(
                    "    - [{}] {} ({})",
                    issue.stage.as_str(),
                    issue.title,
                    issue.reported_by
                );
            }
        }
    }
    println!();
}

fn build_options(config: &StagecraftConfig, args: &RunArgs) -> Result<RunOptions> {
    let mut options = RunOptions::default()
        .with_max_retries(config.toml.pipeline.max_retries)
        .with_inferred_skips(config.toml.pipeline.infer_skips);
    if let Some(list) = &args.skip {
        let stages: HashSet<Stage> = parse_stage_list(list)
            .with_context(|| format!("Invalid --skip list '{}'", list))?
            .into_iter()
            .collect();
        options = options.with_skips(stages);
    }
    if let Some(from) = &args.from {
        let stage: Stage = from
            .parse()
            .with_context(|| format!("Invalid --from stage '{}'", from))?;
        options = options.starting_from(stage);
    }
    Ok(options)
}

/// Resume a stored feature or create a new one.
fn resolve_feature(store: &JsonFileStore, args: &RunArgs) -> Result<Feature> {
    if let Some(id) = &args.feature_id {
        match store.load_feature(id) {
            Ok(feature) => return Ok(feature),
            Err(StoreError::FeatureNotFound(_)) => {}
            Err(e) => return Err(e).with_context(|| format!("Failed to load feature {}", id)),
        }
    }
    let name = args
        .name
        .clone()
        .context("--name is required for a new feature")?;
    let feature = match &args.feature_id {
        Some(id) => Feature::with_id(id.clone(), name, args.description.clone()),
        None => Feature::new(name, args.description.clone()),
    };
    store
        .save_feature(&feature)
        .context("Failed to save feature")?;
    Ok(feature)
}

/// Run the pipeline. Returns whether every attempted stage succeeded.
pub async fn cmd_run(cli: &Cli, project_dir: PathBuf, args: RunArgs) -> Result<bool> {
    let config = StagecraftConfig::with_cli_args(
        project_dir,
        cli.verbose,
        args.max_retries,
        args.infer_skips,
    )?;
    for warning in config.validate() {
        println!("{} {}", console::style("warning:").yellow(), warning);
    }

    let options = build_options(&config, &args)?;
    let store = Arc::new(
        JsonFileStore::new(features_dir(&config.project_dir))
            .context("Failed to open feature store")?,
    );
    let feature = resolve_feature(&store, &args)?;

    let mut optimizer = ContextOptimizer::new(config.toml.context.clone());
    if let Some(overview) = config.read_overview()? {
        optimizer = optimizer.with_overview(overview);
    }
    if let Some(profile) = config.read_profile()? {
        optimizer = optimizer.with_profile(profile);
    }

    let bridge = WorkerBridge::from_config(&config.toml.worker, &config.project_dir, store.clone());
    println!(
        "{} {} ({})",
        console::style("Running").bold().cyan(),
        feature.name,
        feature.id
    );
    println!("  worker: {}", bridge.mode());
    println!();

    let orchestrator = PipelineOrchestrator::new(
        Arc::new(StageRegistry::standard()),
        store,
        Arc::new(bridge),
        Arc::new(optimizer),
    )
    .with_disabled_roles(config.toml.pipeline.disabled_role_set());

    let callbacks = ConsoleCallbacks {
        verbose: config.verbose,
    };
    let result = orchestrator
        .run(&feature.id, &options, &callbacks)
        .await
        .context("Pipeline run failed")?;

    print_summary(&result);
    Ok(result.success)
}
