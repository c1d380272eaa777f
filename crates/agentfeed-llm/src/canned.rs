//! Offline executor for local runs without a chat backend.

use std::time::Duration;

use agentfeed_core::{AgentDescriptor, AgentExecutor, ExecutorError, InputContext};
use async_trait::async_trait;

/// Characters of the trigger text quoted back in a canned reply.
const TOPIC_CHARS: usize = 60;

/// Produces a deterministic reply built from the agent's descriptor.
///
/// Same agent and same input always give the same text, which keeps demo
/// threads and tests reproducible.
#[derive(Debug, Clone, Default)]
pub struct CannedExecutor {
    latency: Option<Duration>,
}

impl CannedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend each reply takes `latency` to produce.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn reply_for(agent: &AgentDescriptor, input: &InputContext) -> String {
        let topic = topic(&input.trigger_text);
        let mut reply = format!("**{}** ({})\n\n", agent.name, agent.role);
        if topic.is_empty() {
            reply.push_str("You called? Tell me a bit more and I'll dig in.");
        } else {
            reply.push_str(&format!("On \"{topic}\": here is my take."));
        }
        if !agent.tools.is_empty() {
            reply.push_str(&format!("\n\nTools I'd reach for: {}.", agent.tools.join(", ")));
        }
        let earlier = input
            .thread_excerpt
            .iter()
            .filter(|e| e.post_id != input.trigger_post_id)
            .count();
        if earlier > 0 {
            reply.push_str(&format!("\n\n_Read {earlier} earlier post(s) in this thread._"));
        }
        reply
    }
}

/// Trigger text minus mentions, trimmed to a short quote.
fn topic(text: &str) -> String {
    let words: Vec<&str> = text
        .split_whitespace()
        .filter(|w| !w.starts_with('@'))
        .collect();
    let joined = words.join(" ");
    match joined.char_indices().nth(TOPIC_CHARS) {
        Some((cut, _)) => format!("{}...", &joined[..cut]),
        None => joined,
    }
}

#[async_trait]
impl AgentExecutor for CannedExecutor {
    async fn execute(
        &self,
        agent: &AgentDescriptor,
        input: &InputContext,
        _deadline: Duration,
    ) -> Result<String, ExecutorError> {
        if !agent.enabled {
            return Err(ExecutorError::InvalidAgent(agent.handle.to_string()));
        }
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        Ok(Self::reply_for(agent, input))
    }
}
