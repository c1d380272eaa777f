//! The agent backend seam.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::{AgentDescriptor, ExecutorError, InputContext};

/// Turns an agent description plus context into reply text.
///
/// The scheduler treats every agent the same way through this trait and
/// enforces `deadline` itself; implementations may use it to size their own
/// transport timeouts. Retries, if any, belong here.
#[async_trait]
pub trait AgentExecutor: Send + Sync {
    async fn execute(
        &self,
        agent: &AgentDescriptor,
        input: &InputContext,
        deadline: Duration,
    ) -> Result<String, ExecutorError>;
}
