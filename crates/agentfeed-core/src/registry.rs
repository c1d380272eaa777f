//! Agent registry.
//!
//! Agents are described in TOML and loaded once at startup into an
//! immutable lookup table keyed by handle:
//!
//! ```toml
//! [[agents]]
//! handle = "factcheck"
//! name = "FactCheck"
//! role = "Fact-checker"
//! policy = "Verify claims with sources."
//! style = "Short verdict, then evidence."
//! tools = ["web_search"]
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::domain::{AgentDescriptor, AgentHandle, ConfigError};

/// Registry file bundled with the crate: the eight stock agents.
const BUILTIN_AGENTS: &str = include_str!("../config/agents.toml");

/// Read-only view of configured agents.
pub trait AgentRegistry: Send + Sync {
    /// Handles of agents that may currently be mentioned.
    fn enabled_handles(&self) -> BTreeSet<AgentHandle>;

    /// Full descriptor for `handle`, enabled or not.
    fn describe(&self, handle: &AgentHandle) -> Option<AgentDescriptor>;

    /// Every configured agent, ordered by handle.
    fn list(&self) -> Vec<AgentDescriptor>;
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    agents: Vec<AgentEntry>,
}

#[derive(Debug, Deserialize)]
struct AgentEntry {
    handle: String,
    name: Option<String>,
    role: String,
    #[serde(default)]
    policy: String,
    #[serde(default)]
    style: String,
    #[serde(default)]
    tools: Vec<String>,
    #[serde(default = "default_enabled")]
    enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl AgentEntry {
    fn into_descriptor(self) -> Result<AgentDescriptor, ConfigError> {
        let handle = AgentHandle::parse(&self.handle)?;
        Ok(AgentDescriptor {
            name: self.name.unwrap_or_else(|| handle.as_str().to_string()),
            handle,
            role: self.role,
            policy: self.policy,
            style: self.style,
            tools: self.tools,
            enabled: self.enabled,
        })
    }
}

/// Immutable handle → descriptor table.
#[derive(Debug, Clone, Default)]
pub struct StaticAgentRegistry {
    agents: BTreeMap<AgentHandle, AgentDescriptor>,
}

impl StaticAgentRegistry {
    /// Build from descriptors. Duplicate handles are rejected.
    pub fn new(descriptors: impl IntoIterator<Item = AgentDescriptor>) -> Result<Self, ConfigError> {
        let mut agents = BTreeMap::new();
        for descriptor in descriptors {
            let handle = descriptor.handle.clone();
            if agents.insert(handle.clone(), descriptor).is_some() {
                return Err(ConfigError::DuplicateAgent(handle.to_string()));
            }
        }
        Ok(Self { agents })
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let file: RegistryFile = toml::from_str(raw)?;
        let descriptors = file
            .agents
            .into_iter()
            .map(AgentEntry::into_descriptor)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(descriptors)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let registry = Self::from_toml_str(&raw)?;
        info!(
            path = %path.display(),
            agents = registry.len(),
            enabled = registry.enabled_handles().len(),
            "loaded agent registry"
        );
        Ok(registry)
    }

    /// The stock agents from `config/agents.toml`, compiled into the crate.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_toml_str(BUILTIN_AGENTS)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl AgentRegistry for StaticAgentRegistry {
    fn enabled_handles(&self) -> BTreeSet<AgentHandle> {
        self.agents
            .values()
            .filter(|a| a.enabled)
            .map(|a| a.handle.clone())
            .collect()
    }

    fn describe(&self, handle: &AgentHandle) -> Option<AgentDescriptor> {
        self.agents.get(handle).cloned()
    }

    fn list(&self) -> Vec<AgentDescriptor> {
        self.agents.values().cloned().collect()
    }
}
