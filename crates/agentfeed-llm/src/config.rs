//! Chat backend configuration.

use std::time::Duration;

use crate::error::LlmError;

pub const ENV_BASE_URL: &str = "AGENTFEED_LLM_BASE_URL";
pub const ENV_API_KEY: &str = "AGENTFEED_LLM_API_KEY";
pub const ENV_MODEL: &str = "AGENTFEED_LLM_MODEL";
pub const ENV_TEMPERATURE: &str = "AGENTFEED_LLM_TEMPERATURE";
pub const ENV_MAX_TOKENS: &str = "AGENTFEED_LLM_MAX_TOKENS";

/// Settings for an OpenAI-compatible `/v1/chat/completions` endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Server root, without the `/v1/...` suffix.
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.deepseek.com".to_string(),
            api_key: None,
            model: "deepseek-chat".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
        }
    }
}

impl ChatConfig {
    /// Load from `AGENTFEED_LLM_*` environment variables.
    pub fn from_env() -> Result<Self, LlmError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, LlmError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            config.base_url = url.trim().to_string();
        }
        config.api_key = lookup(ENV_API_KEY).filter(|v| !v.trim().is_empty());
        if let Some(model) = lookup(ENV_MODEL).filter(|v| !v.trim().is_empty()) {
            config.model = model.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_TEMPERATURE) {
            config.temperature = raw
                .trim()
                .parse()
                .map_err(|_| invalid(ENV_TEMPERATURE, &raw))?;
        }
        if let Some(raw) = lookup(ENV_MAX_TOKENS) {
            config.max_tokens = raw.trim().parse().map_err(|_| invalid(ENV_MAX_TOKENS, &raw))?;
        }

        Ok(config)
    }

    /// Create config for a specific server
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            model: model.to_string(),
            ..Self::default()
        }
    }

    /// Set authentication token
    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// Connect timeout for the HTTP client; the per-request deadline comes
    /// from the caller.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(10)
    }
}

fn invalid(key: &str, value: &str) -> LlmError {
    LlmError::InvalidConfig {
        key: key.to_string(),
        value: value.to_string(),
    }
}
