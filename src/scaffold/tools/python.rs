//! Python interpreter tool backed by the code sandbox.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::{Tool, ToolError};
use crate::sandbox::{CodeSandbox, ExecutionResult, ExecutionStatus};

/// Registered name of the interpreter tool.
pub const PYTHON_INTERPRETER_TOOL: &str = "python_interpreter";

/// Runs a code snippet in the sandbox and reports its output.
pub struct PythonInterpreterTool {
    sandbox: Arc<CodeSandbox>,
}

impl PythonInterpreterTool {
    pub fn new(sandbox: Arc<CodeSandbox>) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for PythonInterpreterTool {
    fn name(&self) -> &str {
        PYTHON_INTERPRETER_TOOL
    }

    fn description(&self) -> &str {
        "Executes a Python code snippet as a standalone script and returns its stdout and stderr. \
         Use this to test a candidate fix: include the function definition and assert-based \
         tests or print statements in the same snippet."
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "Complete Python program to execute"
                }
            },
            "required": ["code"]
        })
    }

    async fn invoke(&self, args: Value) -> Result<String, ToolError> {
        let code = match &args {
            Value::Object(map) => map.get("code").and_then(|v| v.as_str()).ok_or_else(|| {
                ToolError::InvalidParameters("'code' must be a string".to_string())
            })?,
            Value::String(raw) => {
                return Err(ToolError::InvalidParameters(format!(
                    "arguments are not valid JSON: {}",
                    raw
                )))
            }
            _ => {
                return Err(ToolError::InvalidParameters(
                    "arguments must be a JSON object with a 'code' field".to_string(),
                ))
            }
        };

        let result = self.sandbox.execute(code).await;
        Ok(render_execution(&result, self.sandbox.config().timeout))
    }
}

/// Formats a sandbox result as the text the model sees.
pub fn render_execution(result: &ExecutionResult, timeout: Duration) -> String {
    match result.status {
        ExecutionStatus::Success => format!(
            "Execution successful:\n[STDOUT]:\n{}\n[STDERR]:\n{}",
            result.stdout, result.stderr
        ),
        ExecutionStatus::Failure => format!(
            "Execution failed with errors:\n[STDOUT]:\n{}\n[STDERR]:\n{}",
            result.stdout, result.stderr
        ),
        ExecutionStatus::TimedOut => {
            format!("Execution timed out after {} seconds.", format_secs(timeout))
        }
        ExecutionStatus::SandboxError => format!(
            "An unexpected error occurred during execution: {}",
            result.stderr
        ),
    }
}

fn format_secs(timeout: Duration) -> String {
    if timeout.subsec_nanos() == 0 {
        timeout.as_secs().to_string()
    } else {
        format!("{:.1}", timeout.as_secs_f64())
    }
}
