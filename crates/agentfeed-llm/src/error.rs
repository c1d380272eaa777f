//! Error types for agentfeed-llm

use std::time::Duration;

use agentfeed_core::ExecutorError;
use thiserror::Error;

/// Errors that can occur talking to a chat-completions backend
#[derive(Error, Debug)]
pub enum LlmError {
    /// No API key configured
    #[error("chat backend is not configured (set AGENTFEED_LLM_API_KEY)")]
    NotConfigured,

    /// Invalid configuration value
    #[error("invalid value for {key}: {value:?}")]
    InvalidConfig { key: String, value: String },

    /// Request exceeded its deadline
    #[error("chat request timed out after {0:?}")]
    Timeout(Duration),

    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(String),

    /// Backend answered with a non-success status
    #[error("backend returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body could not be decoded
    #[error("malformed completion response: {0}")]
    Decode(String),

    /// Completion had no usable text
    #[error("completion contained no text")]
    EmptyCompletion,

    /// Agent is switched off in the registry
    #[error("agent {0} is disabled")]
    AgentDisabled(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LlmError::Decode(err.to_string())
        } else {
            LlmError::Http(err.to_string())
        }
    }
}

impl From<LlmError> for ExecutorError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Timeout(after) => ExecutorError::Timeout(after),
            LlmError::AgentDisabled(handle) => ExecutorError::InvalidAgent(handle),
            other => ExecutorError::Upstream(other.to_string()),
        }
    }
}
