//! Ordered message history of one agent run.
//!
//! The transcript enforces the pairing rules between tool requests and
//! their results at append time:
//! - a model turn can only be appended when no request is pending;
//! - a tool result must answer the oldest pending request;
//! - request ids are unique within a turn.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::llm::{FunctionCall, Message as LlmMessage, ToolCallInfo};

/// Violations of the request/result pairing rules.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("cannot append a model turn while {count} tool request(s) are unanswered")]
    PendingRequests { count: usize },

    #[error("tool result for '{got}' does not answer the next pending request ({expected:?})")]
    UnexpectedResult {
        expected: Option<String>,
        got: String,
    },

    #[error("duplicate tool request id '{0}' in one model turn")]
    DuplicateRequestId(String),
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolRequest {
    pub id: String,
    pub name: String,
    /// Decoded argument object. Payloads that were not valid JSON are kept
    /// verbatim as a JSON string.
    pub arguments: Value,
}

impl ToolRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Decodes the raw argument string sent by the model.
    pub fn from_raw_arguments(id: impl Into<String>, name: impl Into<String>, raw: &str) -> Self {
        let arguments = if raw.trim().is_empty() {
            Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
        };
        Self::new(id, name, arguments)
    }

    /// Argument string to echo back to the model. Chat servers expect a JSON
    /// object here, so anything else is sent as `{}`.
    pub fn wire_arguments(&self) -> String {
        match &self.arguments {
            Value::Object(_) => self.arguments.to_string(),
            _ => "{}".to_string(),
        }
    }
}

/// One model reply: text plus zero or more tool requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ModelMessage {
    pub content: String,
    pub tool_requests: Vec<ToolRequest>,
}

impl ModelMessage {
    /// A final answer with no tool requests.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_requests: Vec::new(),
        }
    }

    pub fn with_requests(content: impl Into<String>, tool_requests: Vec<ToolRequest>) -> Self {
        Self {
            content: content.into(),
            tool_requests,
        }
    }

    pub fn has_tool_requests(&self) -> bool {
        !self.tool_requests.is_empty()
    }
}

/// A transcript entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Message {
    User { content: String },
    Model(ModelMessage),
    ToolResult { request_id: String, content: String },
}

/// Append-only message history owned by a single agent run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Transcript {
    messages: Vec<Message>,
    #[serde(skip)]
    pending: VecDeque<String>,
}

impl Transcript {
    /// Starts a transcript with the task description as the only message.
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::User {
                content: task.into(),
            }],
            pending: VecDeque::new(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Ids of requests still waiting for a result, oldest first.
    pub fn pending_requests(&self) -> impl Iterator<Item = &str> {
        self.pending.iter().map(String::as_str)
    }

    /// True when every request has been answered.
    pub fn is_resolved(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn push_model(&mut self, message: ModelMessage) -> Result<(), TranscriptError> {
        if !self.pending.is_empty() {
            return Err(TranscriptError::PendingRequests {
                count: self.pending.len(),
            });
        }

        let mut ids: Vec<&str> = Vec::with_capacity(message.tool_requests.len());
        for request in &message.tool_requests {
            if ids.contains(&request.id.as_str()) {
                return Err(TranscriptError::DuplicateRequestId(request.id.clone()));
            }
            ids.push(&request.id);
        }

        self.pending = message
            .tool_requests
            .iter()
            .map(|r| r.id.clone())
            .collect();
        self.messages.push(Message::Model(message));
        Ok(())
    }

    pub fn push_tool_result(
        &mut self,
        request_id: &str,
        content: impl Into<String>,
    ) -> Result<(), TranscriptError> {
        match self.pending.front() {
            Some(expected) if expected == request_id => {
                self.pending.pop_front();
                self.messages.push(Message::ToolResult {
                    request_id: request_id.to_string(),
                    content: content.into(),
                });
                Ok(())
            }
            expected => Err(TranscriptError::UnexpectedResult {
                expected: expected.cloned(),
                got: request_id.to_string(),
            }),
        }
    }

    pub fn last_model_message(&self) -> Option<&ModelMessage> {
        self.messages.iter().rev().find_map(|m| match m {
            Message::Model(model) => Some(model),
            _ => None,
        })
    }

    /// Renders the transcript as chat messages behind a system instruction.
    pub fn to_llm_messages(&self, system_prompt: &str) -> Vec<LlmMessage> {
        let mut out = Vec::with_capacity(self.messages.len() + 1);
        out.push(LlmMessage::system(system_prompt));

        for message in &self.messages {
            out.push(match message {
                Message::User { content } => LlmMessage::user(content.clone()),
                Message::Model(model) if model.has_tool_requests() => {
                    let calls = model
                        .tool_requests
                        .iter()
                        .map(|r| ToolCallInfo {
                            id: r.id.clone(),
                            call_type: "function".to_string(),
                            function: FunctionCall {
                                name: r.name.clone(),
                                arguments: r.wire_arguments(),
                            },
                        })
                        .collect();
                    LlmMessage::assistant_with_tool_calls(model.content.clone(), calls)
                }
                Message::Model(model) => LlmMessage::assistant(model.content.clone()),
                Message::ToolResult {
                    request_id,
                    content,
                } => LlmMessage::tool_result(request_id.clone(), content.clone()),
            });
        }

        out
    }
}
