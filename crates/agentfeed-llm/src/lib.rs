//! AgentFeed-LLM: agent executors
//!
//! Implementations of [`agentfeed_core::AgentExecutor`]:
//!
//! - `ChatCompletionsExecutor`: any OpenAI-compatible `/v1/chat/completions`
//!   endpoint (DeepSeek by default)
//! - `CannedExecutor`: deterministic offline replies
//!
//! ## Layer 2 - Integration

use std::sync::Arc;

use agentfeed_core::AgentExecutor;
use tracing::{info, warn};

pub mod canned;
pub mod chat;
pub mod config;
pub mod error;
pub mod prompt;

pub use canned::CannedExecutor;
pub use chat::ChatCompletionsExecutor;
pub use config::ChatConfig;
pub use error::LlmError;
pub use prompt::{build_messages, system_prompt, ChatMessage, ChatRole};

/// Chat backend when an API key is configured, canned replies otherwise.
pub fn select_executor(config: ChatConfig) -> Result<Arc<dyn AgentExecutor>, LlmError> {
    if config.is_enabled() {
        info!(model = %config.model, base_url = %config.base_url, "using chat-completions executor");
        Ok(Arc::new(ChatCompletionsExecutor::new(config)?))
    } else {
        warn!("no chat API key configured; agents will answer with canned replies");
        Ok(Arc::new(CannedExecutor::new()))
    }
}
