//! Outcome of a single sandbox execution.

use serde::{Deserialize, Serialize};

/// How a sandboxed run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Exit status 0.
    Success,
    /// Nonzero exit status, or killed by a signal.
    Failure,
    /// Still running when the timeout fired; the child was killed.
    TimedOut,
    /// The sandbox could not launch the child or capture its output.
    SandboxError,
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
            Self::TimedOut => write!(f, "timed_out"),
            Self::SandboxError => write!(f, "sandbox_error"),
        }
    }
}

/// Captured result of one [`super::CodeSandbox::execute`] call.
///
/// For [`ExecutionStatus::SandboxError`] the failure description is carried
/// in `stderr`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub status: ExecutionStatus,
    /// Process exit code, when the process exited normally.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Wall-clock time from spawn to classification.
    pub duration_ms: u64,
}

impl ExecutionResult {
    /// Builds a result from a finished process.
    pub fn completed(exit_code: Option<i32>, stdout: String, stderr: String, duration_ms: u64) -> Self {
        let status = if exit_code == Some(0) {
            ExecutionStatus::Success
        } else {
            ExecutionStatus::Failure
        };
        Self {
            status,
            exit_code,
            stdout,
            stderr,
            duration_ms,
        }
    }

    pub fn timed_out(duration_ms: u64) -> Self {
        Self {
            status: ExecutionStatus::TimedOut,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            duration_ms,
        }
    }

    pub fn sandbox_error(message: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            status: ExecutionStatus::SandboxError,
            exit_code: None,
            stdout: String::new(),
            stderr: message.into(),
            duration_ms,
        }
    }

    /// Returns true if the process exited with status 0.
    pub fn is_success(&self) -> bool {
        self.status == ExecutionStatus::Success
    }

    /// Exit 0 and nothing at all written to stderr.
    pub fn is_clean_success(&self) -> bool {
        self.is_success() && self.stderr.is_empty()
    }
}
