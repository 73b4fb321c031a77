//! Benchmark problems.
//!
//! Problems come either from the HuggingFace datasets server
//! ([`HumanEvalPackLoader`]) or from a local JSON Lines file
//! ([`load_jsonl`]). Both produce the same [`Problem`] records.

pub mod humanevalpack;

pub use humanevalpack::{HumanEvalPackConfig, HumanEvalPackLoader};

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::DatasetError;

/// One repair task: a specification, a faulty implementation and the hidden
/// tests used to grade a fix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub task_id: String,
    /// Function signature and docstring.
    pub prompt: String,
    /// Faulty implementation shown to the model.
    pub buggy_solution: String,
    /// Test program appended to the fix. Never shown to the model.
    pub test: String,
}

/// Reads problems from a JSON Lines file. Blank lines are skipped.
pub fn load_jsonl(path: impl AsRef<Path>) -> Result<Vec<Problem>, DatasetError> {
    let content = std::fs::read_to_string(path.as_ref())?;

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str::<Problem>(line).map_err(|e| DatasetError::InvalidRecord {
                line: idx + 1,
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Keeps the first `n` problems; `0` keeps all of them.
pub fn subsample(mut problems: Vec<Problem>, n: usize) -> Vec<Problem> {
    if n > 0 {
        problems.truncate(n);
    }
    problems
}
