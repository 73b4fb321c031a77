//! Evaluation driver: runs the agent on each problem and grades the fix.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, warn};

use super::extract::ArtifactExtractor;
use super::report::{EvaluationSummary, ProblemOutcome, ProblemStatus, Verdict};
use crate::dataset::Problem;
use crate::llm::LlmProvider;
use crate::sandbox::{CodeSandbox, ExecutionResult};
use crate::scaffold::{build_task_prompt, AgentConfig, AgentError, AgentLoop, LoopOutcome, ToolRegistry};

/// Configuration for [`Evaluator`].
#[derive(Debug, Clone, Default)]
pub struct EvaluatorConfig {
    /// Settings for the agent run on each problem.
    pub agent: AgentConfig,
}

impl EvaluatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_agent(mut self, agent: AgentConfig) -> Self {
        self.agent = agent;
        self
    }
}

/// Joins an artifact and its hidden tests into one validation program.
pub fn build_validation_script(artifact: &str, hidden_test: &str) -> String {
    format!("{}\n\n{}", artifact, hidden_test)
}

/// Runs problems through the agent and scores the results.
///
/// The agent's interpreter tool and the validation run share one
/// [`CodeSandbox`], so both use the same timeout.
pub struct Evaluator {
    agent: AgentLoop,
    sandbox: Arc<CodeSandbox>,
    extractor: Arc<dyn ArtifactExtractor>,
}

impl Evaluator {
    pub fn new(
        llm_client: Arc<dyn LlmProvider>,
        sandbox: Arc<CodeSandbox>,
        extractor: Arc<dyn ArtifactExtractor>,
        config: EvaluatorConfig,
    ) -> Self {
        let tools = Arc::new(ToolRegistry::with_sandbox(Arc::clone(&sandbox)));
        Self {
            agent: AgentLoop::with_tools(llm_client, config.agent, tools),
            sandbox,
            extractor,
        }
    }

    pub fn sandbox(&self) -> &CodeSandbox {
        &self.sandbox
    }

    /// Runs the artifact followed by the hidden tests.
    pub async fn check_solution(&self, artifact: &str, hidden_test: &str) -> (Verdict, ExecutionResult) {
        let result = self
            .sandbox
            .execute(&build_validation_script(artifact, hidden_test))
            .await;
        (Verdict::from_execution(&result), result)
    }

    /// Evaluates one problem. Loop-level failures are returned as `Err`.
    pub async fn evaluate(&self, problem: &Problem) -> Result<ProblemOutcome, AgentError> {
        let task = build_task_prompt(&problem.prompt, &problem.buggy_solution);
        let run = self.agent.run(&task).await?;

        let final_answer = match &run.outcome {
            LoopOutcome::Completed { final_answer } => final_answer,
            LoopOutcome::Exhausted { max_turns } => {
                return Ok(ProblemOutcome::new(
                    &problem.task_id,
                    ProblemStatus::Exhausted {
                        max_turns: *max_turns,
                    },
                )
                .with_agent_stats(run.turns, run.tool_calls));
            }
        };

        let Some(artifact) = self.extractor.extract_artifact(final_answer) else {
            return Ok(ProblemOutcome::new(&problem.task_id, ProblemStatus::NoCode)
                .with_agent_stats(run.turns, run.tool_calls));
        };

        let (verdict, validation) = self.check_solution(&artifact, &problem.test).await;
        let status = if verdict.passed {
            ProblemStatus::Passed
        } else {
            ProblemStatus::Failed
        };

        Ok(ProblemOutcome::new(&problem.task_id, status)
            .with_validation(artifact, verdict, validation)
            .with_agent_stats(run.turns, run.tool_calls))
    }

    /// Evaluates every problem in order. One problem's failure never stops
    /// the batch.
    pub async fn run(&self, problems: &[Problem]) -> EvaluationSummary {
        let started_at = Utc::now();
        let total = problems.len();
        let mut outcomes = Vec::with_capacity(total);

        info!(total, "Starting evaluation");
        for (idx, problem) in problems.iter().enumerate() {
            let start = Instant::now();
            let outcome = match self.evaluate(problem).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(task_id = %problem.task_id, error = %e, "Agent loop failed");
                    ProblemOutcome::error(&problem.task_id, e.to_string())
                }
            }
            .with_duration_ms(start.elapsed().as_millis() as u64);

            info!(
                task_id = %problem.task_id,
                turns = outcome.turns,
                "Problem {}/{}: {}",
                idx + 1,
                total,
                outcome.status
            );
            outcomes.push(outcome);
        }

        EvaluationSummary::from_outcomes(started_at, outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::evaluation::FencedBlockExtractor;
    use crate::llm::{Choice, GenerationRequest, GenerationResponse, Message, Usage};
    use crate::sandbox::SandboxConfig;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    struct ScriptedLlm {
        responses: Mutex<VecDeque<Result<GenerationResponse, LlmError>>>,
    }

    impl ScriptedLlm {
        fn new(responses: Vec<Result<GenerationResponse, LlmError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        async fn generate(&self, _request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(LlmError::EmptyResponse))
        }
    }

    fn answer(content: &str) -> Result<GenerationResponse, LlmError> {
        Ok(GenerationResponse {
            id: "resp".to_string(),
            model: "scripted".to_string(),
            choices: vec![Choice {
                index: 0,
                message: Message::assistant(content),
                finish_reason: "stop".to_string(),
            }],
            usage: Usage::default(),
        })
    }

    // Shell stands in for the interpreter; "def" lines are shell functions.
    fn evaluator(dir: &TempDir, responses: Vec<Result<GenerationResponse, LlmError>>) -> Evaluator {
        let sandbox = CodeSandbox::new(
            SandboxConfig::new("sh")
                .with_file_suffix(".sh")
                .with_timeout(Duration::from_secs(5))
                .with_scratch_dir(dir.path()),
        );
        Evaluator::new(
            Arc::new(ScriptedLlm::new(responses)),
            Arc::new(sandbox),
            Arc::new(FencedBlockExtractor::new("sh").unwrap()),
            EvaluatorConfig::default(),
        )
    }

    fn problem(id: &str, test: &str) -> Problem {
        Problem {
            task_id: id.to_string(),
            prompt: "answer() {".to_string(),
            buggy_solution: "echo 41; }".to_string(),
            test: test.to_string(),
        }
    }

    #[test]
    fn test_build_validation_script() {
        assert_eq!(
            build_validation_script("def f():\n    return 1", "assert f() == 1"),
            "def f():\n    return 1\n\nassert f() == 1"
        );
    }

    #[tokio::test]
    async fn test_passing_fix() {
        let dir = TempDir::new().unwrap();
        let eval = evaluator(&dir, vec![answer("```sh\nanswer() { echo 42; }\n```")]);

        let outcome = eval
            .evaluate(&problem("p1", "[ \"$(answer)\" = 42 ] || exit 1"))
            .await
            .unwrap();

        assert_eq!(outcome.status, ProblemStatus::Passed);
        assert_eq!(outcome.verdict, Some(Verdict { passed: true }));
        assert_eq!(outcome.artifact.as_deref(), Some("answer() { echo 42; }"));
        assert_eq!(outcome.turns, 1);
    }

    #[tokio::test]
    async fn test_failing_fix() {
        let dir = TempDir::new().unwrap();
        let eval = evaluator(&dir, vec![answer("```sh\nanswer() { echo 41; }\n```")]);

        let outcome = eval
            .evaluate(&problem("p1", "[ \"$(answer)\" = 42 ] || exit 1"))
            .await
            .unwrap();

        assert_eq!(outcome.status, ProblemStatus::Failed);
        assert_eq!(outcome.validation.unwrap().exit_code, Some(1));
    }

    #[tokio::test]
    async fn test_stderr_output_fails_even_with_exit_zero() {
        let dir = TempDir::new().unwrap();
        let eval = evaluator(&dir, vec![answer("```sh\nanswer() { echo 42; }\n```")]);

        let outcome = eval
            .evaluate(&problem("p1", "echo 'warning: deprecated' 1>&2"))
            .await
            .unwrap();

        assert_eq!(outcome.status, ProblemStatus::Failed);
        let validation = outcome.validation.unwrap();
        assert_eq!(validation.exit_code, Some(0));
        assert!(!validation.stderr.is_empty());
    }

    #[tokio::test]
    async fn test_no_code_in_answer() {
        let dir = TempDir::new().unwrap();
        let eval = evaluator(&dir, vec![answer("I am not sure how to fix this.")]);

        let outcome = eval.evaluate(&problem("p1", "exit 0")).await.unwrap();

        assert_eq!(outcome.status, ProblemStatus::NoCode);
        assert!(outcome.validation.is_none());
    }

    #[tokio::test]
    async fn test_batch_continues_after_error() {
        let dir = TempDir::new().unwrap();
        let eval = evaluator(
            &dir,
            vec![
                Err(LlmError::RequestFailed("connection refused".to_string())),
                answer("```sh\nanswer() { echo 42; }\n```"),
            ],
        );

        let problems = vec![
            problem("p1", "exit 0"),
            problem("p2", "[ \"$(answer)\" = 42 ] || exit 1"),
        ];
        let summary = eval.run(&problems).await;

        assert_eq!(summary.total, 2);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.passed, 1);
        assert!(matches!(
            &summary.outcomes[0].status,
            ProblemStatus::Error { message } if message.contains("connection refused")
        ));
        assert!((summary.pass_at_1 - 0.5).abs() < f64::EPSILON);
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let dir = TempDir::new().unwrap();
        let summary = evaluator(&dir, vec![]).run(&[]).await;
        assert_eq!(summary.total, 0);
        assert_eq!(summary.render(), "No problems were evaluated.");
    }
}
