//! Scaffold system for agent execution.
//!
//! The scaffold gives the model a code interpreter and drives the repair
//! loop:
//! 1. Ask the model for its next message (Thinking)
//! 2. Serve every tool request of that message (Acting)
//! 3. Append the results in request order
//! 4. Stop when the model answers without requesting tools
//!
//! # Example
//!
//! ```ignore
//! use patchloop::llm::LiteLlmClient;
//! use patchloop::sandbox::CodeSandbox;
//! use patchloop::scaffold::{AgentConfig, AgentLoop, ToolRegistry};
//!
//! let llm_client = Arc::new(LiteLlmClient::from_env()?);
//! let tools = Arc::new(ToolRegistry::with_sandbox(Arc::new(CodeSandbox::default())));
//! let agent = AgentLoop::with_tools(llm_client, AgentConfig::default(), tools);
//! let run = agent.run(&task).await?;
//! ```

pub mod agent_loop;
pub mod prompts;
pub mod tools;
pub mod transcript;

pub use agent_loop::{AgentConfig, AgentError, AgentLoop, AgentRun, LoopOutcome};
pub use prompts::{build_task_prompt, AGENT_SYSTEM_PROMPT};
pub use tools::{
    render_execution, unknown_tool_message, PythonInterpreterTool, Tool, ToolError, ToolRegistry,
    PYTHON_INTERPRETER_TOOL,
};
pub use transcript::{Message, ModelMessage, ToolRequest, Transcript, TranscriptError};
