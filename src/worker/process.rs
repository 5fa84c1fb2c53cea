use crate::errors::WorkerError;
use crate::util::truncate_chars;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Captured output of a finished worker process.
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Launches one external worker process per invocation.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: PathBuf,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    timeout: Duration,
    stderr_limit: usize,
}

impl ProcessRunner {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
            timeout: Duration::from_secs(600),
            stderr_limit: 2000,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_stderr_limit(mut self, limit: usize) -> Self {
        self.stderr_limit = limit;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run the worker with `input` on stdin and the given extra environment.
    ///
    /// The child is killed if the timeout elapses. A non-zero exit carries
    /// stderr (or stdout when stderr is empty) truncated to the configured
    /// limit.
    pub async fn run(
        &self,
        input: &str,
        env: &[(&str, String)],
    ) -> Result<ProcessOutput, WorkerError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in env {
            cmd.env(key, value);
        }
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| WorkerError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;
        debug!(
            program = %self.program.display(),
            pid = child.id().unwrap_or(0),
            bytes = input.len(),
            "Worker process spawned"
        );

        // Feed stdin from a separate task so a worker that writes before
        // reading cannot deadlock against a full pipe.
        if let Some(mut stdin) = child.stdin.take() {
            let input = input.to_string();
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(input.as_bytes()).await {
                    debug!(error = %e, "Worker closed stdin early");
                }
                let _ = stdin.shutdown().await;
            });
        }

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    program = %self.program.display(),
                    secs = self.timeout.as_secs(),
                    "Worker timed out"
                );
                return Err(WorkerError::Timeout {
                    secs: self.timeout.as_secs(),
                });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            let source = if stderr.trim().is_empty() { &stdout } else { &stderr };
            return Err(WorkerError::NonZeroExit {
                exit_code: output.status.code().unwrap_or(-1),
                diagnostic: truncate_chars(source.trim(), self.stderr_limit),
            });
        }

        Ok(ProcessOutput { stdout, stderr })
    }
}
