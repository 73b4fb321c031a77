//! LLM integration for patchloop.
//!
//! The agent loop only depends on the [`LlmProvider`] trait. The bundled
//! [`LiteLlmClient`] speaks the OpenAI chat-completions dialect with
//! function calling, which covers LiteLLM, OpenRouter and Ollama.
//!
//! ```ignore
//! use patchloop::llm::{GenerationRequest, LiteLlmClient, LlmProvider, Message};
//!
//! let client = LiteLlmClient::from_env()?;
//! let request = GenerationRequest::new("", vec![Message::user("Hello")]);
//! let response = client.generate(request).await?;
//! ```

pub mod litellm;

pub use litellm::{
    Choice, FunctionCall, FunctionDefinition, GenerationRequest, GenerationResponse,
    LiteLlmClient, LlmProvider, Message, ToolCallInfo, ToolChoice, ToolDefinition, Usage,
    DEFAULT_API_BASE, DEFAULT_MODEL,
};
