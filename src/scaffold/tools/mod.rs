//! Tool definitions and registry for the scaffold system.
//!
//! This module defines the `Tool` trait and a registry that routes the
//! model's tool requests to their handlers by name.

pub mod python;

pub use python::{render_execution, PythonInterpreterTool, PYTHON_INTERPRETER_TOOL};

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

use super::transcript::ToolRequest;
use crate::llm::ToolDefinition;
use crate::sandbox::CodeSandbox;

/// Errors that can occur during tool invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The model supplied arguments the tool cannot use.
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// The tool itself broke. This is a loop-level failure.
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

/// A capability the model can invoke by name.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the unique name of the tool.
    fn name(&self) -> &str;

    /// Returns a description of what the tool does.
    fn description(&self) -> &str;

    /// Returns the JSON schema for the tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Invokes the tool and returns the text fed back to the model.
    async fn invoke(&self, args: Value) -> Result<String, ToolError>;
}

/// Text returned for a request naming a tool that is not registered.
pub fn unknown_tool_message(name: &str) -> String {
    format!("Error: Unknown tool {}", name)
}

/// Registry for managing available tools.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty tool registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Create a registry holding the interpreter tool backed by `sandbox`.
    pub fn with_sandbox(sandbox: Arc<CodeSandbox>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(PythonInterpreterTool::new(sandbox)));
        registry
    }

    /// Register a new tool in the registry.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// List all registered tool names.
    pub fn list_tools(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Get the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Function-calling definitions for every registered tool, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut tools: Vec<&Arc<dyn Tool>> = self.tools.values().collect();
        tools.sort_by(|a, b| a.name().cmp(b.name()));
        tools
            .into_iter()
            .map(|tool| {
                ToolDefinition::function(tool.name(), tool.description(), tool.parameters_schema())
            })
            .collect()
    }

    /// Routes a request to its handler and returns the result text.
    ///
    /// Unknown names and invalid arguments are answered with an error string
    /// for the model. Only `ToolError::ExecutionFailed` is returned as `Err`.
    pub async fn dispatch(&self, request: &ToolRequest) -> Result<String, ToolError> {
        let Some(tool) = self.get(&request.name) else {
            warn!(tool = %request.name, id = %request.id, "Model requested unknown tool");
            return Ok(unknown_tool_message(&request.name));
        };

        debug!(tool = %request.name, id = %request.id, "Dispatching tool request");
        match tool.invoke(request.arguments.clone()).await {
            Ok(output) => Ok(output),
            Err(ToolError::InvalidParameters(reason)) => {
                warn!(tool = %request.name, id = %request.id, %reason, "Invalid tool arguments");
                Ok(format!(
                    "Error: Invalid arguments for tool {}: {}",
                    request.name, reason
                ))
            }
            Err(e) => Err(e),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
