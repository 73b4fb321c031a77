//! Configuration for the code sandbox.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Wall-clock budget for one code execution.
///
/// Shared by the agent's interpreter tool and the final validation run.
pub const CODE_EXECUTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for [`super::CodeSandbox`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// Interpreter invoked as `<interpreter> <script path>`.
    pub interpreter: PathBuf,
    /// Suffix for the temporary script file.
    pub file_suffix: String,
    /// Maximum wall-clock time before the child is killed.
    pub timeout: Duration,
    /// Directory for temporary scripts; the system temp dir when unset.
    pub scratch_dir: Option<PathBuf>,
}

impl SandboxConfig {
    /// Creates a configuration for the given interpreter with Python defaults.
    pub fn new(interpreter: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            file_suffix: ".py".to_string(),
            timeout: CODE_EXECUTION_TIMEOUT,
            scratch_dir: None,
        }
    }

    /// Sets the script file suffix.
    pub fn with_file_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.file_suffix = suffix.into();
        self
    }

    /// Sets the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Places temporary scripts in `dir` instead of the system temp dir.
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self::new("python3")
    }
}
