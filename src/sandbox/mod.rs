//! Subprocess sandbox for running untrusted code snippets.
//!
//! Every call to [`CodeSandbox::execute`] follows the same lifecycle:
//!
//! ```text
//! MATERIALIZE (unique temp file) → SPAWN → WAIT ≤ timeout → CLASSIFY → REMOVE FILE
//! ```
//!
//! The temp file is owned by a guard, so it is removed on every exit path,
//! including spawn failures and timeouts. A child that outlives the timeout
//! is killed.
//!
//! This is process isolation only: the child runs with the caller's user,
//! filesystem and network.
//!
//! ```ignore
//! use patchloop::sandbox::{CodeSandbox, SandboxConfig};
//!
//! let sandbox = CodeSandbox::new(SandboxConfig::default());
//! let result = sandbox.execute("print('hello')").await;
//! assert!(result.is_success());
//! ```

pub mod config;
pub mod executor;
pub mod result;

pub use config::{SandboxConfig, CODE_EXECUTION_TIMEOUT};
pub use executor::{CodeSandbox, SandboxError};
pub use result::{ExecutionResult, ExecutionStatus};
