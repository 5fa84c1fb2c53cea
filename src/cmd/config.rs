//! Configuration view and validation commands: `stagecraft config`.

use anyhow::Result;

use super::super::ConfigCommands;

pub fn cmd_config(project_dir: &std::path::Path, command: Option<ConfigCommands>) -> Result<()> {
    use stagecraft::config::StagecraftConfig;

    let config = StagecraftConfig::new(project_dir.to_path_buf())?;
    let config_path = config.config_file();

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("{}", console::style("Stagecraft Configuration").bold().cyan());
            println!();

            if config_path.exists() {
                println!("Config file: {}", config_path.display());
            } else {
                println!("No stagecraft.toml found at {}", config_path.display());
                println!("Using defaults. Run 'stagecraft init' to create one.");
            }
            println!();

            let toml = &config.toml;
            println!("[pipeline]");
            println!("  max_retries = {}", toml.pipeline.max_retries);
            println!("  infer_skips = {}", toml.pipeline.infer_skips);
            if !toml.pipeline.disabled_roles.is_empty() {
                println!(
                    "  disabled_roles = [{}]",
                    toml.pipeline.disabled_roles.join(", ")
                );
            }
            println!();

            println!("[worker]");
            if toml.worker.command.is_empty() {
                println!("  command = \"\" (in-process producer)");
            } else {
                println!("  command = \"{}\"", toml.worker.command);
            }
            println!("  args = {:?}", toml.worker.invocation_args());
            println!("  timeout_secs = {}", toml.worker.timeout_secs);
            println!("  stderr_limit = {}", toml.worker.stderr_limit);
            println!();

            println!("[context]");
            println!(
                "  summary_line_threshold = {}",
                toml.context.summary_line_threshold
            );
            println!(
                "  full_content_byte_ceiling = {}",
                toml.context.full_content_byte_ceiling
            );
            println!("  max_key_points = {}", toml.context.max_key_points);
            println!("  max_metrics = {}", toml.context.max_metrics);
            if let Some(path) = &toml.context.overview_file {
                println!("  overview_file = \"{}\"", path.display());
            }
            if let Some(path) = &toml.context.profile_file {
                println!("  profile_file = \"{}\"", path.display());
            }
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let warnings = config.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("{}", console::style("Configuration warnings:").yellow());
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
    }

    Ok(())
}
