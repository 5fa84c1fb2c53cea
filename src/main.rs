use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod cmd;

#[derive(Parser)]
#[command(name = "stagecraft")]
#[command(version, about = "Drive a feature through ordered development stages")]
pub struct Cli {
    /// Debug-level logging (RUST_LOG still wins when set)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the .stagecraft directory and a default config
    Init,
    /// Print the stage table
    Stages,
    /// Run a feature through the pipeline
    Run {
        /// Feature name (required unless resuming with --feature-id)
        #[arg(short, long)]
        name: Option<String>,

        /// Feature description
        #[arg(short, long, default_value = "")]
        description: String,

        /// Stages to skip (comma-separated); mandatory stages still run
        #[arg(long)]
        skip: Option<String>,

        /// Retry limit per stage, capped by each stage's own ceiling
        #[arg(long)]
        max_retries: Option<u32>,

        /// Start from this stage; earlier stages are reported as skipped
        #[arg(long)]
        from: Option<String>,

        /// Infer skippable stages from the description
        #[arg(long)]
        infer_skips: bool,

        /// Reuse or resume a stored feature
        #[arg(long)]
        feature_id: Option<String>,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
}

fn init_tracing(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match &cli.command {
        Commands::Init => cmd::cmd_init(&project_dir)?,
        Commands::Stages => cmd::cmd_stages(),
        Commands::Run {
            name,
            description,
            skip,
            max_retries,
            from,
            infer_skips,
            feature_id,
        } => {
            let args = cmd::RunArgs {
                name: name.clone(),
                description: description.clone(),
                skip: skip.clone(),
                max_retries: *max_retries,
                from: from.clone(),
                infer_skips: *infer_skips,
                feature_id: feature_id.clone(),
            };
            let success = cmd::cmd_run(&cli, project_dir, args).await?;
            if !success {
                std::process::exit(1);
            }
        }
        Commands::Config { command } => cmd::cmd_config(&project_dir, command.clone())?,
    }

    Ok(())
}
