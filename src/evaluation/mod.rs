//! HumanEvalFix-style evaluation.
//!
//! For each problem the [`Evaluator`] runs the agent once (pass@1), pulls
//! the fix out of the final answer with an [`ArtifactExtractor`], appends
//! the hidden tests and runs the result in the sandbox. A problem passes
//! only when that run exits 0 with an empty stderr.

pub mod driver;
pub mod extract;
pub mod report;

pub use driver::{build_validation_script, Evaluator, EvaluatorConfig};
pub use extract::{ArtifactExtractor, FencedBlockExtractor};
pub use report::{EvaluationSummary, ProblemOutcome, ProblemStatus, Verdict};
