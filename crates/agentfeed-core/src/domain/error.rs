//! Domain-level error taxonomy for AgentFeed.

use std::time::Duration;

use feed_state::{PostId, StorageError};

use super::agent::AgentHandle;
use super::run::{RunId, RunStatus};

/// Errors raised by the run lifecycle state machine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("invalid transition for run {run_id}: {from} -> {to}")]
    InvalidTransition {
        run_id: RunId,
        from: RunStatus,
        to: RunStatus,
    },

    #[error("run not found: {0}")]
    RunNotFound(RunId),

    #[error("run {run_id} already exists for agent {agent} on post {trigger_post_id}")]
    DuplicateRun {
        run_id: RunId,
        trigger_post_id: PostId,
        agent: AgentHandle,
    },
}

/// Failure of a single agent invocation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutorError {
    #[error("agent execution timed out after {0:?}")]
    Timeout(Duration),

    #[error("upstream agent backend failed: {0}")]
    Upstream(String),

    #[error("invalid agent: {0}")]
    InvalidAgent(String),
}

/// Errors produced while loading configuration or the agent registry.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("invalid agent handle {0:?}: expected [a-z0-9_-]+")]
    InvalidHandle(String),

    #[error("agent {0} is defined more than once")]
    DuplicateAgent(String),

    #[error("failed to parse agent registry: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// AgentFeed domain errors.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("executor error: {0}")]
    Executor(#[from] ExecutorError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for AgentFeed domain operations.
pub type Result<T> = std::result::Result<T, FeedError>;
