//! Per-problem outcomes and the batch summary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sandbox::ExecutionResult;

/// Pass/fail outcome of validating an artifact against hidden tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub passed: bool,
}

impl Verdict {
    /// Passing requires exit status 0 and an empty stderr. A timeout or a
    /// sandbox failure is a fail.
    pub fn from_execution(result: &ExecutionResult) -> Self {
        Self {
            passed: result.is_clean_success(),
        }
    }
}

/// How one problem ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProblemStatus {
    Passed,
    Failed,
    /// The final answer held no extractable code.
    NoCode,
    /// The agent ran out of turns.
    Exhausted { max_turns: usize },
    /// The agent loop failed. Distinct from a normal fail.
    Error { message: String },
}

impl ProblemStatus {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

impl std::fmt::Display for ProblemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passed => write!(f, "PASSED"),
            Self::Failed => write!(f, "FAILED"),
            Self::NoCode => write!(f, "FAILED (No code output)"),
            Self::Exhausted { max_turns } => {
                write!(f, "FAILED (Turn budget of {} exhausted)", max_turns)
            }
            Self::Error { message } => write!(f, "ERROR ({})", message),
        }
    }
}

/// Record of one evaluated problem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemOutcome {
    pub task_id: String,
    pub status: ProblemStatus,
    /// Present only when a validation run happened.
    pub verdict: Option<Verdict>,
    pub artifact: Option<String>,
    pub validation: Option<ExecutionResult>,
    /// Model calls made by the agent.
    pub turns: usize,
    pub tool_calls: usize,
    pub duration_ms: u64,
}

impl ProblemOutcome {
    pub fn new(task_id: impl Into<String>, status: ProblemStatus) -> Self {
        Self {
            task_id: task_id.into(),
            status,
            verdict: None,
            artifact: None,
            validation: None,
            turns: 0,
            tool_calls: 0,
            duration_ms: 0,
        }
    }

    /// Outcome for a problem whose agent loop failed.
    pub fn error(task_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            task_id,
            ProblemStatus::Error {
                message: message.into(),
            },
        )
    }

    pub fn with_validation(mut self, artifact: String, verdict: Verdict, validation: ExecutionResult) -> Self {
        self.artifact = Some(artifact);
        self.verdict = Some(verdict);
        self.validation = Some(validation);
        self
    }

    pub fn with_agent_stats(mut self, turns: usize, tool_calls: usize) -> Self {
        self.turns = turns;
        self.tool_calls = tool_calls;
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}

/// Aggregate result of a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub no_code: usize,
    pub exhausted: usize,
    pub errors: usize,
    /// `passed / total`, or 0 when nothing was evaluated.
    pub pass_at_1: f64,
    pub outcomes: Vec<ProblemOutcome>,
}

impl EvaluationSummary {
    pub fn from_outcomes(started_at: DateTime<Utc>, outcomes: Vec<ProblemOutcome>) -> Self {
        let mut summary = Self {
            started_at,
            completed_at: Utc::now(),
            total: outcomes.len(),
            passed: 0,
            failed: 0,
            no_code: 0,
            exhausted: 0,
            errors: 0,
            pass_at_1: 0.0,
            outcomes: Vec::new(),
        };

        for outcome in &outcomes {
            match outcome.status {
                ProblemStatus::Passed => summary.passed += 1,
                ProblemStatus::Failed => summary.failed += 1,
                ProblemStatus::NoCode => summary.no_code += 1,
                ProblemStatus::Exhausted { .. } => summary.exhausted += 1,
                ProblemStatus::Error { .. } => summary.errors += 1,
            }
        }

        if summary.total > 0 {
            summary.pass_at_1 = summary.passed as f64 / summary.total as f64;
        }
        summary.outcomes = outcomes;
        summary
    }

    /// Human-readable end-of-run report.
    pub fn render(&self) -> String {
        if self.total == 0 {
            return "No problems were evaluated.".to_string();
        }

        format!(
            "--- Evaluation Complete ---\n\
             Total Problems: {}\n\
             Problems Passed: {}\n\
             pass@1 Score:   {:.4} ({:.2}%)\n\
             Failed: {}  No code: {}  Exhausted: {}  Errors: {}",
            self.total,
            self.passed,
            self.pass_at_1,
            self.pass_at_1 * 100.0,
            self.failed,
            self.no_code,
            self.exhausted,
            self.errors
        )
    }
}
