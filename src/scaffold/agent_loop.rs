//! Agent execution loop for the scaffold system.
//!
//! The loop is a three-state machine:
//!
//! ```text
//! Thinking --(model requests tools)--> Acting --(all results appended)--> Thinking
//! Thinking --(plain answer)----------> Done
//! ```
//!
//! Each Thinking→Acting transition spends one unit of the `max_turns`
//! budget. When the budget is spent, the run ends as
//! [`LoopOutcome::Exhausted`] instead of dispatching more tools.

use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::prompts::AGENT_SYSTEM_PROMPT;
use super::tools::{ToolError, ToolRegistry};
use super::transcript::{ModelMessage, ToolRequest, Transcript, TranscriptError};
use crate::error::LlmError;
use crate::llm::{GenerationRequest, LlmProvider};

/// Loop-level failures. Recoverable tool outcomes never show up here.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Model call failed after retries.
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// A tool handler broke while serving a request.
    #[error("Tool '{name}' failed: {source}")]
    Tool {
        name: String,
        #[source]
        source: ToolError,
    },

    /// The request/result pairing rules were broken.
    #[error("Transcript violation: {0}")]
    TranscriptViolation(#[from] TranscriptError),

    /// The whole run took longer than `loop_timeout`.
    #[error("Agent loop timed out after {seconds} seconds")]
    LoopTimeout { seconds: u64 },
}

/// Configuration for the agent loop.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Maximum number of Acting phases per run.
    pub max_turns: usize,
    /// Model to use for LLM requests.
    pub model: String,
    /// Temperature for LLM sampling.
    pub temperature: f64,
    /// Maximum tokens for LLM response.
    pub max_tokens: u32,
    /// Wall-clock limit for one run. `None` disables it.
    pub loop_timeout: Option<Duration>,
    /// System instruction sent ahead of the transcript.
    pub system_prompt: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_turns: 25,
            model: String::new(), // Use LLM provider's default
            temperature: 0.2,
            max_tokens: 4096,
            loop_timeout: Some(Duration::from_secs(600)),
            system_prompt: AGENT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl AgentConfig {
    /// Create a new agent configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the Acting budget.
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// Set the model to use.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the temperature for sampling.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the maximum tokens for responses.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set or clear the wall-clock limit for a run.
    pub fn with_loop_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.loop_timeout = timeout;
        self
    }

    /// Replace the system instruction.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }
}

/// Control state of a run.
#[derive(Debug, Clone, PartialEq)]
enum LoopState {
    /// Waiting on the model.
    Thinking,
    /// Serving the requests of the latest model turn.
    Acting(Vec<ToolRequest>),
    /// The latest model turn is the final answer.
    Done,
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LoopOutcome {
    /// The model answered without requesting tools.
    Completed { final_answer: String },
    /// The model still wanted tools after `max_turns` Acting phases.
    Exhausted { max_turns: usize },
}

/// Result of one agent run.
#[derive(Debug, Clone, Serialize)]
pub struct AgentRun {
    pub outcome: LoopOutcome,
    /// Full history. After exhaustion the last model turn may have
    /// unanswered requests.
    pub transcript: Transcript,
    /// Model calls made.
    pub turns: usize,
    /// Tool requests dispatched.
    pub tool_calls: usize,
}

impl AgentRun {
    /// Final answer text, if the model finished on its own.
    pub fn final_answer(&self) -> Option<&str> {
        match &self.outcome {
            LoopOutcome::Completed { final_answer } => Some(final_answer),
            LoopOutcome::Exhausted { .. } => None,
        }
    }
}

/// Drives a model through propose-test-refine cycles.
pub struct AgentLoop {
    llm_client: Arc<dyn LlmProvider>,
    tool_registry: Arc<ToolRegistry>,
    config: AgentConfig,
}

impl AgentLoop {
    /// Create an agent loop with an empty tool registry.
    pub fn new(llm_client: Arc<dyn LlmProvider>, config: AgentConfig) -> Self {
        Self::with_tools(llm_client, config, Arc::new(ToolRegistry::new()))
    }

    /// Create an agent loop with the given tools.
    pub fn with_tools(
        llm_client: Arc<dyn LlmProvider>,
        config: AgentConfig,
        tool_registry: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            llm_client,
            tool_registry,
            config,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tool_registry
    }

    /// Runs the loop on a task description until the model gives a final
    /// answer or the budget is spent.
    pub async fn run(&self, task: &str) -> Result<AgentRun, AgentError> {
        let transcript = Transcript::new(task);
        match self.config.loop_timeout {
            Some(limit) => tokio::time::timeout(limit, self.drive(transcript))
                .await
                .map_err(|_| AgentError::LoopTimeout {
                    seconds: limit.as_secs(),
                })?,
            None => self.drive(transcript).await,
        }
    }

    async fn drive(&self, mut transcript: Transcript) -> Result<AgentRun, AgentError> {
        let mut state = LoopState::Thinking;
        let mut budget = self.config.max_turns;
        let mut turns = 0;
        let mut tool_calls = 0;

        loop {
            state = match state {
                LoopState::Thinking => {
                    let message = self.infer(&transcript).await?;
                    turns += 1;
                    let requests = message.tool_requests.clone();
                    transcript.push_model(message)?;

                    if requests.is_empty() {
                        LoopState::Done
                    } else if budget == 0 {
                        warn!(
                            max_turns = self.config.max_turns,
                            pending = requests.len(),
                            "Turn budget exhausted"
                        );
                        return Ok(AgentRun {
                            outcome: LoopOutcome::Exhausted {
                                max_turns: self.config.max_turns,
                            },
                            transcript,
                            turns,
                            tool_calls,
                        });
                    } else {
                        budget -= 1;
                        LoopState::Acting(requests)
                    }
                }
                LoopState::Acting(requests) => {
                    // All results of a turn are collected before any is appended.
                    let mut results = Vec::with_capacity(requests.len());
                    for request in &requests {
                        let output = self.tool_registry.dispatch(request).await.map_err(
                            |source| AgentError::Tool {
                                name: request.name.clone(),
                                source,
                            },
                        )?;
                        debug!(
                            turn = turns,
                            tool = %request.name,
                            id = %request.id,
                            output_len = output.len(),
                            "Tool request served"
                        );
                        results.push((request.id.as_str(), output));
                    }
                    for (id, output) in results {
                        transcript.push_tool_result(id, output)?;
                    }
                    tool_calls += requests.len();
                    LoopState::Thinking
                }
                LoopState::Done => break,
            };
        }

        let final_answer = transcript
            .last_model_message()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        info!(turns, tool_calls, "Agent finished");

        Ok(AgentRun {
            outcome: LoopOutcome::Completed { final_answer },
            transcript,
            turns,
            tool_calls,
        })
    }

    /// Asks the model for its next message given the transcript so far.
    pub async fn infer(&self, transcript: &Transcript) -> Result<ModelMessage, AgentError> {
        let messages = transcript.to_llm_messages(&self.config.system_prompt);
        let request = GenerationRequest::new(self.config.model.clone(), messages)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens)
            .with_tools(self.tool_registry.definitions());

        let response = self.llm_client.generate(request).await?;
        let choice = response.first_choice().ok_or(LlmError::EmptyResponse)?;

        let mut seen = HashSet::new();
        let tool_requests: Vec<ToolRequest> = choice
            .message
            .tool_calls
            .iter()
            .flatten()
            .map(|call| {
                let id = if call.id.is_empty() || seen.contains(&call.id) {
                    format!("call_{}", uuid::Uuid::new_v4().simple())
                } else {
                    call.id.clone()
                };
                seen.insert(id.clone());
                ToolRequest::from_raw_arguments(id, call.function.name.clone(), &call.function.arguments)
            })
            .collect();

        debug!(
            tool_requests = tool_requests.len(),
            content_len = choice.message.content.len(),
            "Model turn received"
        );

        Ok(ModelMessage::with_requests(
            choice.message.content.clone(),
            tool_requests,
        ))
    }
}
