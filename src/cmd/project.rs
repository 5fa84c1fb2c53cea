//! Project initialization command: `stagecraft init`.

use anyhow::Result;

pub fn cmd_init(project_dir: &std::path::Path) -> Result<()> {
    use stagecraft::init::init_project;

    let result = init_project(project_dir)?;

    if result.created {
        println!(
            "Initialized stagecraft project at {}",
            result.state_dir.display()
        );
        println!();
        println!("Created directory structure:");
        println!("  .stagecraft/");
        println!("  ├── stagecraft.toml   # Pipeline, worker and context settings");
        println!("  └── features/         # Feature snapshots and stage logs");
        println!();
        println!("Next steps:");
        println!("  1. Review .stagecraft/stagecraft.toml");
        println!("  2. Run `stagecraft run --name <feature> --description <text>`");
    } else if result.wrote_config {
        println!(
            "Wrote default config to existing {}",
            result.state_dir.display()
        );
    } else {
        println!(
            "Stagecraft project already initialized at {}",
            result.state_dir.display()
        );
    }

    Ok(())
}
