//! Agent run tracking.

use chrono::{DateTime, Utc};
use feed_state::{AuthorKind, Post, PostId, StorageError, ThreadId};
use serde::{Deserialize, Serialize};

use super::agent::AgentHandle;
use super::error::ExecutorError;

/// Unique identifier for an agent run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new random RunId
    pub fn new() -> Self {
        RunId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Status of a run. Moves forward only: queued → running → done | error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Queued,
    Running,
    Done,
    Error,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Done | RunStatus::Error)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::Running => "running",
            RunStatus::Done => "done",
            RunStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One post from the thread, as handed to the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcerptEntry {
    pub post_id: PostId,
    pub author_handle: String,
    pub author_kind: AuthorKind,
    pub text: String,
}

impl From<&Post> for ExcerptEntry {
    fn from(post: &Post) -> Self {
        Self {
            post_id: post.id.clone(),
            author_handle: post.author_handle.clone(),
            author_kind: post.author_kind,
            text: post.text.clone(),
        }
    }
}

/// Snapshot of everything the executor sees. Captured once at run creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputContext {
    pub trigger_post_id: PostId,
    pub trigger_text: String,
    /// Most recent thread posts, oldest first.
    pub thread_excerpt: Vec<ExcerptEntry>,
}

impl InputContext {
    pub fn new(trigger: &Post, thread_excerpt: Vec<ExcerptEntry>) -> Self {
        Self {
            trigger_post_id: trigger.id.clone(),
            trigger_text: trigger.text.clone(),
            thread_excerpt,
        }
    }
}

/// Why a run ended in `error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCause {
    Timeout,
    Upstream,
    InvalidAgent,
    /// The reply could not be committed to the store.
    Store,
    /// The owning thread was deleted while the run was pending.
    Discarded,
}

/// Structured error detail recorded on a failed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunFailure {
    pub cause: FailureCause,
    pub message: String,
}

impl RunFailure {
    pub fn new(cause: FailureCause, message: impl Into<String>) -> Self {
        Self {
            cause,
            message: message.into(),
        }
    }

    pub fn discarded(thread_id: &ThreadId) -> Self {
        Self::new(
            FailureCause::Discarded,
            format!("thread {thread_id} was deleted"),
        )
    }
}

impl From<&ExecutorError> for RunFailure {
    fn from(err: &ExecutorError) -> Self {
        let cause = match err {
            ExecutorError::Timeout(_) => FailureCause::Timeout,
            ExecutorError::Upstream(_) => FailureCause::Upstream,
            ExecutorError::InvalidAgent(_) => FailureCause::InvalidAgent,
        };
        Self::new(cause, err.to_string())
    }
}

impl From<&StorageError> for RunFailure {
    fn from(err: &StorageError) -> Self {
        Self::new(FailureCause::Store, err.to_string())
    }
}

/// One attempted invocation of one agent against one triggering post.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentRun {
    pub id: RunId,
    pub agent_handle: AgentHandle,
    pub thread_id: ThreadId,
    pub trigger_post_id: PostId,
    pub status: RunStatus,
    /// Number of transitions applied so far (0 while queued).
    pub revision: u32,
    pub created_at: DateTime<Utc>,
    /// Set when the run enters `running`.
    pub started_at: Option<DateTime<Utc>>,
    /// Set when the run reaches a terminal state.
    pub ended_at: Option<DateTime<Utc>>,
    pub input_context: InputContext,
    /// Only set on `done`.
    pub output_post_id: Option<PostId>,
    /// Only set on `error`.
    pub error_detail: Option<RunFailure>,
}

impl AgentRun {
    /// Create a new run in `queued` state.
    pub fn new(agent_handle: AgentHandle, thread_id: ThreadId, input_context: InputContext) -> Self {
        Self {
            id: RunId::new(),
            agent_handle,
            thread_id,
            trigger_post_id: input_context.trigger_post_id.clone(),
            status: RunStatus::Queued,
            revision: 0,
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
            input_context,
            output_post_id: None,
            error_detail: None,
        }
    }

    /// Wall-clock time between entering `running` and finishing.
    pub fn duration_ms(&self) -> Option<u64> {
        let started = self.started_at?;
        let ended = self.ended_at?;
        Some((ended - started).num_milliseconds().max(0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn trigger() -> Post {
        let id = PostId::new();
        Post {
            id: id.clone(),
            thread_id: ThreadId::from(&id),
            parent_id: None,
            author_kind: AuthorKind::Human,
            author_handle: "@me".to_string(),
            text: "hey @grok".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_run_new_defaults() {
        let post = trigger();
        let run = AgentRun::new(
            AgentHandle::parse("grok").unwrap(),
            post.thread_id.clone(),
            InputContext::new(&post, vec![]),
        );

        assert_eq!(run.status, RunStatus::Queued);
        assert_eq!(run.revision, 0);
        assert_eq!(run.trigger_post_id, post.id);
        assert!(run.started_at.is_none());
        assert!(run.ended_at.is_none());
        assert!(run.output_post_id.is_none());
        assert!(run.error_detail.is_none());
        assert_eq!(run.input_context.trigger_text, "hey @grok");
    }

    #[test]
    fn test_run_status_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&RunStatus::Queued).unwrap(),
            "\"queued\""
        );
        assert!(RunStatus::Done.is_terminal());
        assert!(RunStatus::Error.is_terminal());
        assert!(!RunStatus::Running.is_terminal());
    }

    #[test]
    fn test_failure_cause_from_executor_error() {
        let failure = RunFailure::from(&ExecutorError::Timeout(Duration::from_secs(5)));
        assert_eq!(failure.cause, FailureCause::Timeout);

        let failure = RunFailure::from(&ExecutorError::InvalidAgent("ghost".into()));
        assert_eq!(failure.cause, FailureCause::InvalidAgent);

        let failure = RunFailure::from(&StorageError::Backend("down".into()));
        assert_eq!(failure.cause, FailureCause::Store);
        assert!(failure.message.contains("down"));
    }
}
