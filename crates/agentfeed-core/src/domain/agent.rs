//! Agent identity and descriptor.

use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// Normalised agent handle: lower-case, no leading `@`, `[a-z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentHandle(String);

impl AgentHandle {
    /// Parse a handle as written in config or post text (`@Grok`, `grok`).
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let trimmed = raw.trim();
        let bare = trimmed.strip_prefix('@').unwrap_or(trimmed);
        let normalised = bare.to_ascii_lowercase();

        let valid = !normalised.is_empty()
            && normalised
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-');
        if !valid {
            return Err(ConfigError::InvalidHandle(raw.to_string()));
        }
        Ok(AgentHandle(normalised))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The handle as it appears in post text.
    pub fn mention(&self) -> String {
        format!("@{}", self.0)
    }
}

impl std::fmt::Display for AgentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Static description of a configured agent.
///
/// Loaded once at startup; the executor receives it as-is and never needs
/// to know which concrete agent it is talking to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub handle: AgentHandle,
    /// Display name ("TL;DR", "FactCheck", ...).
    pub name: String,
    pub role: String,
    /// What the agent may and may not do.
    pub policy: String,
    /// How the agent writes.
    pub style: String,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}
