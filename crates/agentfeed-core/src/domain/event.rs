//! Live thread events.

use feed_state::{Post, ThreadId};
use serde::{Deserialize, Serialize};

use super::run::{AgentRun, RunId};

/// Event published to subscribers of one thread.
///
/// Run events carry the full `AgentRun` snapshot so a client never needs a
/// follow-up read to render the new state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedEvent {
    RunCreated { run: AgentRun },
    RunStatusChanged { run: AgentRun },
    PostAppended { run_id: RunId, post: Post },
}

impl FeedEvent {
    /// Wire name of the event kind.
    pub fn kind(&self) -> &'static str {
        match self {
            FeedEvent::RunCreated { .. } => "run_created",
            FeedEvent::RunStatusChanged { .. } => "run_status_changed",
            FeedEvent::PostAppended { .. } => "post_appended",
        }
    }

    pub fn run_id(&self) -> &RunId {
        match self {
            FeedEvent::RunCreated { run } | FeedEvent::RunStatusChanged { run } => &run.id,
            FeedEvent::PostAppended { run_id, .. } => run_id,
        }
    }

    pub fn thread_id(&self) -> &ThreadId {
        match self {
            FeedEvent::RunCreated { run } | FeedEvent::RunStatusChanged { run } => &run.thread_id,
            FeedEvent::PostAppended { post, .. } => &post.thread_id,
        }
    }

    /// The run snapshot, for run events.
    pub fn run(&self) -> Option<&AgentRun> {
        match self {
            FeedEvent::RunCreated { run } | FeedEvent::RunStatusChanged { run } => Some(run),
            FeedEvent::PostAppended { .. } => None,
        }
    }
}

/// Receiver of lifecycle events. Publishing must never block.
pub trait EventSink: Send + Sync {
    fn publish(&self, thread_id: &ThreadId, event: FeedEvent);
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _thread_id: &ThreadId, _event: FeedEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AgentHandle, InputContext};
    use chrono::Utc;
    use feed_state::{AuthorKind, PostId};

    fn sample_run() -> AgentRun {
        let id = PostId("p-1".to_string());
        let post = Post {
            id: id.clone(),
            thread_id: ThreadId::from(&id),
            parent_id: None,
            author_kind: AuthorKind::Human,
            author_handle: "@me".to_string(),
            text: "@coach help".to_string(),
            created_at: Utc::now(),
        };
        AgentRun::new(
            AgentHandle::parse("coach").unwrap(),
            post.thread_id.clone(),
            InputContext::new(&post, vec![]),
        )
    }

    #[test]
    fn test_event_serde_is_tagged() {
        let event = FeedEvent::RunCreated { run: sample_run() };
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["type"], "run_created");
        assert_eq!(json["run"]["status"], "queued");
        assert_eq!(json["run"]["agent_handle"], "coach");

        let back: FeedEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_event_accessors() {
        let run = sample_run();
        let event = FeedEvent::RunStatusChanged { run: run.clone() };
        assert_eq!(event.kind(), "run_status_changed");
        assert_eq!(event.run_id(), &run.id);
        assert_eq!(event.thread_id().as_str(), "p-1");
        assert!(event.run().is_some());
    }
}
