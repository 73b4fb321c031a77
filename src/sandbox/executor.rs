//! Process launcher behind [`CodeSandbox`].

use std::io::Write;
use std::process::Stdio;
use std::time::Instant;

use tempfile::{Builder, TempPath};
use tokio::process::Command;
use tracing::{debug, warn};

use super::config::SandboxConfig;
use super::result::ExecutionResult;

/// Infrastructure failures inside the sandbox.
///
/// These never escape [`CodeSandbox::execute`]; they become
/// [`super::ExecutionStatus::SandboxError`] results.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("Failed to write script file: {0}")]
    Materialize(std::io::Error),

    #[error("Failed to launch '{interpreter}': {source}")]
    Spawn {
        interpreter: String,
        source: std::io::Error,
    },

    #[error("Failed to capture process output: {0}")]
    Capture(std::io::Error),
}

/// Runs code as a standalone program in a child process.
#[derive(Debug, Clone)]
pub struct CodeSandbox {
    config: SandboxConfig,
}

impl CodeSandbox {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Executes `code` and classifies the outcome. Never fails: launch and
    /// capture problems come back as a `SandboxError` status.
    pub async fn execute(&self, code: &str) -> ExecutionResult {
        let start = Instant::now();
        match self.run(code, start).await {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Sandbox execution failed");
                ExecutionResult::sandbox_error(e.to_string(), elapsed_ms(start))
            }
        }
    }

    async fn run(&self, code: &str, start: Instant) -> Result<ExecutionResult, SandboxError> {
        // Removed when dropped, whichever way this function returns.
        let script = self.materialize(code)?;

        let child = Command::new(&self.config.interpreter)
            .arg(&*script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SandboxError::Spawn {
                interpreter: self.config.interpreter.display().to_string(),
                source,
            })?;

        debug!(
            script = %script.display(),
            pid = child.id(),
            timeout_ms = self.config.timeout.as_millis() as u64,
            "Sandbox child started"
        );

        // On timeout the wait future, and the child inside it, is dropped,
        // which kills the process.
        match tokio::time::timeout(self.config.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(ExecutionResult::completed(
                output.status.code(),
                String::from_utf8_lossy(&output.stdout).into_owned(),
                String::from_utf8_lossy(&output.stderr).into_owned(),
                elapsed_ms(start),
            )),
            Ok(Err(e)) => Err(SandboxError::Capture(e)),
            Err(_) => {
                warn!(
                    timeout_secs = self.config.timeout.as_secs_f64(),
                    "Sandbox child timed out and was killed"
                );
                Ok(ExecutionResult::timed_out(elapsed_ms(start)))
            }
        }
    }

    fn materialize(&self, code: &str) -> Result<TempPath, SandboxError> {
        let mut builder = Builder::new();
        builder.prefix("patchloop-").suffix(&self.config.file_suffix);

        let mut file = match &self.config.scratch_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(SandboxError::Materialize)?;

        file.write_all(code.as_bytes())
            .and_then(|_| file.flush())
            .map_err(SandboxError::Materialize)?;

        // Close the handle; the path guard keeps ownership of the file.
        Ok(file.into_temp_path())
    }
}

impl Default for CodeSandbox {
    fn default() -> Self {
        Self::new(SandboxConfig::default())
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
