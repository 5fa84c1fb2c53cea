//! Project initialization for `stagecraft init`.
//!
//! ```text
//! .stagecraft/
//! ├── stagecraft.toml   # Pipeline, worker and context settings
//! └── features/         # Feature snapshots and stage logs
//! ```

use crate::config::{CONFIG_FILE, STATE_DIR, StagecraftToml};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Directory under the state dir holding feature records.
pub const FEATURES_DIR: &str = "features";

/// Result of initializing a project.
#[derive(Debug)]
pub struct InitResult {
    pub state_dir: PathBuf,
    /// Whether the state directory was newly created
    pub created: bool,
    /// Whether a default config file was written
    pub wrote_config: bool,
}

pub fn state_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(STATE_DIR)
}

pub fn features_dir(project_dir: &Path) -> PathBuf {
    state_dir(project_dir).join(FEATURES_DIR)
}

pub fn is_initialized(project_dir: &Path) -> bool {
    state_dir(project_dir).join(CONFIG_FILE).exists()
}

/// Create the state directory and a default config. Existing files are kept.
pub fn init_project(project_dir: &Path) -> Result<InitResult> {
    let state_dir = state_dir(project_dir);
    let created = !state_dir.exists();

    let features = state_dir.join(FEATURES_DIR);
    std::fs::create_dir_all(&features)
        .with_context(|| format!("Failed to create directory: {}", features.display()))?;

    let config_path = state_dir.join(CONFIG_FILE);
    let wrote_config = !config_path.exists();
    if wrote_config {
        StagecraftToml::default().save(&config_path)?;
    }

    Ok(InitResult {
        state_dir,
        created,
        wrote_config,
    })
}
