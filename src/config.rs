//! Configuration for stagecraft.
//!
//! Settings are read from `.stagecraft/stagecraft.toml` and layered
//! file → environment → CLI:
//!
//! ```toml
//! [pipeline]
//! max_retries = 2
//! infer_skips = false
//! disabled_roles = ["ui_designer"]
//!
//! [worker]
//! command = "claude"
//! args = ["--print", "--output-format", "stream-json", "--verbose", "--dangerously-skip-permissions"]
//! timeout_secs = 600
//! stderr_limit = 2000
//! model = ""
//! max_turns = 0
//!
//! [context]
//! summary_line_threshold = 40
//! full_content_byte_ceiling = 8192
//! max_key_points = 15
//! max_metrics = 10
//! ```
//!
//! Environment overrides: `STAGECRAFT_WORKER_CMD`, `STAGECRAFT_MAX_RETRIES`,
//! `STAGECRAFT_WORKER_TIMEOUT`, `STAGECRAFT_MODEL`.

use crate::context::SummaryLimits;
use crate::role::AgentRole;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the per-project state directory.
pub const STATE_DIR: &str = ".stagecraft";

/// Name of the config file inside the state directory.
pub const CONFIG_FILE: &str = "stagecraft.toml";

/// Pipeline-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSection {
    /// Retries allowed per stage, further capped by each stage's ceiling
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Propose skips for optional stages from the feature description
    #[serde(default)]
    pub infer_skips: bool,
    /// Roles never dispatched
    #[serde(default)]
    pub disabled_roles: Vec<String>,
}

fn default_max_retries() -> u32 {
    2
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            infer_skips: false,
            disabled_roles: Vec::new(),
        }
    }
}

impl PipelineSection {
    /// Disabled roles that parse; unknown names are reported by `validate`.
    pub fn disabled_role_set(&self) -> HashSet<AgentRole> {
        self.disabled_roles
            .iter()
            .filter_map(|name| name.parse().ok())
            .collect()
    }
}

/// External worker invocation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerSection {
    /// Worker executable; empty means always use the in-process producer
    #[serde(default = "default_worker_command")]
    pub command: String,
    #[serde(default = "default_worker_args")]
    pub args: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Maximum characters of stderr kept in a failure diagnostic
    #[serde(default = "default_stderr_limit")]
    pub stderr_limit: usize,
    /// Passed as `--model` when non-empty
    #[serde(default)]
    pub model: String,
    /// Passed as `--max-turns` when non-zero
    #[serde(default)]
    pub max_turns: u32,
}

fn default_worker_command() -> String {
    "claude".to_string()
}

fn default_worker_args() -> Vec<String> {
    [
        "--print",
        "--output-format",
        "stream-json",
        "--verbose",
        "--dangerously-skip-permissions",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_timeout_secs() -> u64 {
    600
}

fn default_stderr_limit() -> usize {
    2000
}

impl Default for WorkerSection {
    fn default() -> Self {
        Self {
            command: default_worker_command(),
            args: default_worker_args(),
            timeout_secs: default_timeout_secs(),
            stderr_limit: default_stderr_limit(),
            model: String::new(),
            max_turns: 0,
        }
    }
}

impl WorkerSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Full argument list: configured args plus model and turn limits.
    pub fn invocation_args(&self) -> Vec<String> {
        let mut args = self.args.clone();
        if !self.model.is_empty() {
            args.push("--model".to_string());
            args.push(self.model.clone());
        }
        if self.max_turns > 0 {
            args.push("--max-turns".to_string());
            args.push(self.max_turns.to_string());
        }
        args
    }
}

/// Context optimizer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Artifact bodies longer than this many lines are summarized
    #[serde(default = "default_summary_line_threshold")]
    pub summary_line_threshold: usize,
    /// Code-focused roles get full bodies while the selection is under this size
    #[serde(default = "default_full_content_byte_ceiling")]
    pub full_content_byte_ceiling: usize,
    #[serde(default = "default_max_key_points")]
    pub max_key_points: usize,
    #[serde(default = "default_max_metrics")]
    pub max_metrics: usize,
    /// Project overview markdown, relative to the project directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overview_file: Option<PathBuf>,
    /// Style and convention profile markdown, relative to the project directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_file: Option<PathBuf>,
}

fn default_summary_line_threshold() -> usize {
    40
}

fn default_full_content_byte_ceiling() -> usize {
    8192
}

fn default_max_key_points() -> usize {
    15
}

fn default_max_metrics() -> usize {
    10
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            summary_line_threshold: default_summary_line_threshold(),
            full_content_byte_ceiling: default_full_content_byte_ceiling(),
            max_key_points: default_max_key_points(),
            max_metrics: default_max_metrics(),
            overview_file: None,
            profile_file: None,
        }
    }
}

impl ContextConfig {
    pub fn summary_limits(&self) -> SummaryLimits {
        SummaryLimits {
            max_key_points: self.max_key_points,
            max_metrics: self.max_metrics,
        }
    }
}

/// The complete stagecraft.toml structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StagecraftToml {
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub worker: WorkerSection,
    #[serde(default)]
    pub context: ContextConfig,
}

impl StagecraftToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse stagecraft.toml")
    }

    /// Load from `<state_dir>/stagecraft.toml`, or defaults if it does not exist.
    pub fn load_or_default(state_dir: &Path) -> Result<Self> {
        let config_path = state_dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize stagecraft.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(cmd) = lookup("STAGECRAFT_WORKER_CMD") {
            self.worker.command = cmd;
        }
        if let Some(raw) = lookup("STAGECRAFT_MAX_RETRIES") {
            self.pipeline.max_retries = raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid STAGECRAFT_MAX_RETRIES '{}'", raw))?;
        }
        if let Some(raw) = lookup("STAGECRAFT_WORKER_TIMEOUT") {
            self.worker.timeout_secs = raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid STAGECRAFT_WORKER_TIMEOUT '{}'", raw))?;
        }
        if let Some(model) = lookup("STAGECRAFT_MODEL") {
            self.worker.model = model;
        }
        Ok(())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        for name in &self.pipeline.disabled_roles {
            if name.parse::<AgentRole>().is_err() {
                warnings.push(format!("Unknown role '{}' in pipeline.disabled_roles", name));
            }
        }

        if self.worker.timeout_secs == 0 {
            warnings.push("worker.timeout_secs is 0: every worker will time out".to_string());
        }

        if self.context.summary_line_threshold == 0 {
            warnings.push(
                "context.summary_line_threshold is 0: every artifact will be summarized"
                    .to_string(),
            );
        }

        if self.context.max_key_points == 0 {
            warnings.push("context.max_key_points is 0: summaries will carry no key points".to_string());
        }

        warnings
    }
}

/// Resolved configuration for one invocation.
#[derive(Debug, Clone)]
pub struct StagecraftConfig {
    pub project_dir: PathBuf,
    pub state_dir: PathBuf,
    pub toml: StagecraftToml,
    pub verbose: bool,
}

impl StagecraftConfig {
    /// Load file settings and apply process environment overrides.
    pub fn new(project_dir: PathBuf) -> Result<Self> {
        let project_dir = project_dir
            .canonicalize()
            .context("Failed to resolve project directory")?;
        let state_dir = project_dir.join(STATE_DIR);
        let mut toml = StagecraftToml::load_or_default(&state_dir)?;
        toml.apply_env(|key| std::env::var(key).ok())?;

        Ok(Self {
            project_dir,
            state_dir,
            toml,
            verbose: false,
        })
    }

    /// Apply CLI overrides on top of file and environment.
    pub fn with_cli_args(
        project_dir: PathBuf,
        verbose: bool,
        max_retries: Option<u32>,
        infer_skips: bool,
    ) -> Result<Self> {
        let mut config = Self::new(project_dir)?;
        config.verbose = verbose;
        if let Some(n) = max_retries {
            config.toml.pipeline.max_retries = n;
        }
        if infer_skips {
            config.toml.pipeline.infer_skips = true;
        }
        Ok(config)
    }

    pub fn config_file(&self) -> PathBuf {
        self.state_dir.join(CONFIG_FILE)
    }

    /// Resolve a configured path relative to the project directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_dir.join(path)
        }
    }

    /// Read the project overview document, if configured and present.
    pub fn read_overview(&self) -> Result<Option<String>> {
        self.read_optional(self.toml.context.overview_file.as_deref())
    }

    /// Read the style profile document, if configured and present.
    pub fn read_profile(&self) -> Result<Option<String>> {
        self.read_optional(self.toml.context.profile_file.as_deref())
    }

    fn read_optional(&self, path: Option<&Path>) -> Result<Option<String>> {
        let Some(path) = path else {
            return Ok(None);
        };
        let path = self.resolve(path);
        if !path.exists() {
            return Ok(None);
        }
        std::fs::read_to_string(&path)
            .map(Some)
            .with_context(|| format!("Failed to read {}", path.display()))
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}
