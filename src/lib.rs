//! patchloop: an autonomous code-repair agent and its evaluation harness.
//!
//! The agent loop alternates between model inference and sandboxed code
//! execution until the model returns a fix. The evaluation driver then
//! grades that fix against hidden tests and reports pass@1.

pub mod cli;
pub mod dataset;
pub mod error;
pub mod evaluation;
pub mod llm;
pub mod sandbox;
pub mod scaffold;

// Re-export commonly used types
pub use dataset::Problem;
pub use error::{DatasetError, LlmError};
pub use evaluation::{EvaluationSummary, Evaluator, EvaluatorConfig, ProblemOutcome, ProblemStatus, Verdict};
pub use sandbox::{CodeSandbox, ExecutionResult, ExecutionStatus, SandboxConfig};
pub use scaffold::{AgentConfig, AgentError, AgentLoop, AgentRun, LoopOutcome};
