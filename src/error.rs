//! Error types for patchloop operations.
//!
//! Each subsystem that talks to the outside world gets its own enum:
//! - LLM API interactions
//! - Benchmark dataset loading
//!
//! Tool and agent-loop errors live next to the code that raises them
//! (`scaffold::tools::ToolError`, `scaffold::agent_loop::AgentError`).

use thiserror::Error;

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    /// The request never got a response. `retryable` is set for connect
    /// failures and timeouts.
    #[error("HTTP request failed: {message}")]
    Transport { message: String, retryable: bool },

    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Model returned no choices")]
    EmptyResponse,

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },
}

/// Errors that can occur while loading benchmark problems.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Rate limited by dataset server (retry after {retry_after:?}s)")]
    RateLimited { retry_after: Option<u64> },

    #[error("Failed to parse dataset response: {0}")]
    ParseError(String),

    #[error("Invalid record on line {line}: {reason}")]
    InvalidRecord { line: usize, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_error_display() {
        let err = LlmError::ApiError {
            code: 503,
            message: "overloaded".to_string(),
        };
        assert_eq!(err.to_string(), "API error (503): overloaded");

        let err = LlmError::Transport {
            message: "error sending request for url (http://127.0.0.1:1/chat/completions)"
                .to_string(),
            retryable: true,
        };
        assert!(err.to_string().starts_with("HTTP request failed: error sending request"));
    }

    #[test]
    fn test_dataset_error_display() {
        let err = DatasetError::InvalidRecord {
            line: 3,
            reason: "missing field `test`".to_string(),
        };
        assert!(err.to_string().contains("line 3"));
        assert!(err.to_string().contains("missing field"));
    }
}
