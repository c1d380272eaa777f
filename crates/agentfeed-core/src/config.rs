//! Orchestrator tuning knobs.

use std::time::Duration;

use tokio::sync::Semaphore;

use crate::domain::ConfigError;

pub const ENV_MAX_CONCURRENT_RUNS: &str = "AGENTFEED_MAX_CONCURRENT_RUNS";
pub const ENV_RUN_TIMEOUT_SECS: &str = "AGENTFEED_RUN_TIMEOUT_SECS";
pub const ENV_SUBSCRIBER_QUEUE: &str = "AGENTFEED_SUBSCRIBER_QUEUE";
pub const ENV_CONTEXT_POSTS: &str = "AGENTFEED_CONTEXT_POSTS";

/// Runtime configuration for [`crate::Orchestrator`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Process-wide ceiling on runs in `running` state.
    pub max_concurrent_runs: usize,
    /// Deadline for one run: the executor call plus committing its reply.
    pub run_timeout: Duration,
    /// Events buffered per subscriber before it is dropped.
    pub subscriber_queue_capacity: usize,
    /// Most recent thread posts copied into a run's input context.
    pub context_posts: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_runs: 4,
            run_timeout: Duration::from_secs(30),
            subscriber_queue_capacity: 64,
            context_posts: 5,
        }
    }
}

impl OrchestratorConfig {
    /// Defaults overridden by `AGENTFEED_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_MAX_CONCURRENT_RUNS) {
            config.max_concurrent_runs = parse_count(ENV_MAX_CONCURRENT_RUNS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_RUN_TIMEOUT_SECS) {
            config.run_timeout = Duration::from_secs(parse_count(ENV_RUN_TIMEOUT_SECS, &raw)? as u64);
        }
        if let Some(raw) = lookup(ENV_SUBSCRIBER_QUEUE) {
            config.subscriber_queue_capacity = parse_count(ENV_SUBSCRIBER_QUEUE, &raw)?;
        }
        if let Some(raw) = lookup(ENV_CONTEXT_POSTS) {
            config.context_posts = raw.trim().parse().map_err(|e: std::num::ParseIntError| {
                invalid(ENV_CONTEXT_POSTS, &raw, e.to_string())
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn with_max_concurrent_runs(mut self, n: usize) -> Self {
        self.max_concurrent_runs = n;
        self
    }

    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = timeout;
        self
    }

    pub fn with_subscriber_queue_capacity(mut self, capacity: usize) -> Self {
        self.subscriber_queue_capacity = capacity;
        self
    }

    pub fn with_context_posts(mut self, n: usize) -> Self {
        self.context_posts = n;
        self
    }

    /// Reject settings that would stall the orchestrator.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent_runs == 0 {
            return Err(invalid("max_concurrent_runs", "0", "must be at least 1"));
        }
        if self.max_concurrent_runs > Semaphore::MAX_PERMITS {
            return Err(invalid(
                "max_concurrent_runs",
                &self.max_concurrent_runs.to_string(),
                format!("must be at most {}", Semaphore::MAX_PERMITS),
            ));
        }
        if self.run_timeout.is_zero() {
            return Err(invalid("run_timeout", "0", "must be positive"));
        }
        if self.subscriber_queue_capacity == 0 {
            return Err(invalid("subscriber_queue_capacity", "0", "must be at least 1"));
        }
        Ok(())
    }
}

fn parse_count(key: &str, raw: &str) -> Result<usize, ConfigError> {
    let n: usize = raw
        .trim()
        .parse()
        .map_err(|e: std::num::ParseIntError| invalid(key, raw, e.to_string()))?;
    if n == 0 {
        return Err(invalid(key, raw, "must be at least 1"));
    }
    Ok(n)
}

fn invalid(key: &str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}
