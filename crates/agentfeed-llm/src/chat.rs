//! Executor backed by an OpenAI-compatible chat-completions endpoint.

use std::time::Duration;

use agentfeed_core::{AgentDescriptor, AgentExecutor, ExecutorError, InputContext};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::ChatConfig;
use crate::error::LlmError;
use crate::prompt::{build_messages, ChatMessage};

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP client for one chat-completions backend.
pub struct ChatCompletionsExecutor {
    config: ChatConfig,
    http_client: reqwest::Client,
}

impl ChatCompletionsExecutor {
    /// Requires an API key; see [`ChatConfig::is_enabled`].
    pub fn new(config: ChatConfig) -> Result<Self, LlmError> {
        if !config.is_enabled() {
            return Err(LlmError::NotConfigured);
        }
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("agentfeed-llm/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(config.connect_timeout())
            .build()?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn from_env() -> Result<Self, LlmError> {
        Self::new(ChatConfig::from_env()?)
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Send `messages` and return the first choice's text.
    #[instrument(skip(self, messages), fields(model = %self.config.model, messages = messages.len()))]
    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        deadline: Duration,
    ) -> Result<String, LlmError> {
        let body = CompletionRequest {
            model: &self.config.model,
            messages,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let mut request = self
            .http_client
            .post(self.config.completions_url())
            .timeout(deadline)
            .json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(deadline)
            } else {
                LlmError::from(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "chat backend returned an error");
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                LlmError::Timeout(deadline)
            } else {
                LlmError::from(e)
            }
        })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(LlmError::EmptyCompletion)?;

        debug!(chars = text.len(), "completion received");
        Ok(text)
    }
}

#[async_trait]
impl AgentExecutor for ChatCompletionsExecutor {
    async fn execute(
        &self,
        agent: &AgentDescriptor,
        input: &InputContext,
        deadline: Duration,
    ) -> Result<String, ExecutorError> {
        if !agent.enabled {
            return Err(LlmError::AgentDisabled(agent.handle.to_string()).into());
        }
        let messages = build_messages(agent, input);
        Ok(self.complete(&messages, deadline).await?)
    }
}
