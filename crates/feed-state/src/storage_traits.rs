//! Storage trait definitions for AgentFeed
//!
//! `PostStore` is the only persistence seam the orchestration layer talks to.
//! It is async and backend-agnostic; an in-memory fake lives in the `fakes`
//! module and a SurrealDB implementation in `surreal_store`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

/// Unique identifier for a post
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub String);

impl PostId {
    /// Generate a new random PostId
    pub fn new() -> Self {
        PostId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PostId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PostId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a thread. A thread is named after its root post.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(pub String);

impl ThreadId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&PostId> for ThreadId {
    fn from(root: &PostId) -> Self {
        ThreadId(root.0.clone())
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Posts and threads
// ---------------------------------------------------------------------------

/// Who wrote a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorKind {
    Human,
    Agent,
}

impl AuthorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthorKind::Human => "human",
            AuthorKind::Agent => "agent",
        }
    }
}

/// A persisted post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub thread_id: ThreadId,
    pub parent_id: Option<PostId>,
    pub author_kind: AuthorKind,
    pub author_handle: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl Post {
    /// True when this post starts its own thread.
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Input for creating a human-authored post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPost {
    pub author_handle: String,
    pub text: String,
    /// Reply target; `None` starts a new thread.
    pub parent_id: Option<PostId>,
}

impl NewPost {
    pub fn root(author_handle: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            author_handle: author_handle.into(),
            text: text.into(),
            parent_id: None,
        }
    }

    pub fn reply(
        author_handle: impl Into<String>,
        text: impl Into<String>,
        parent_id: PostId,
    ) -> Self {
        Self {
            author_handle: author_handle.into(),
            text: text.into(),
            parent_id: Some(parent_id),
        }
    }
}

/// Point-in-time view of a thread, used by clients for the polling fallback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadSnapshot {
    pub root: Post,
    /// Replies in creation order
    pub replies: Vec<Post>,
}

impl ThreadSnapshot {
    /// Root followed by every reply, oldest first.
    pub fn posts(&self) -> impl Iterator<Item = &Post> {
        std::iter::once(&self.root).chain(self.replies.iter())
    }

    /// The `n` most recent posts, oldest first.
    pub fn tail(&self, n: usize) -> Vec<&Post> {
        let all: Vec<&Post> = self.posts().collect();
        let skip = all.len().saturating_sub(n);
        all.into_iter().skip(skip).collect()
    }
}

// ---------------------------------------------------------------------------
// PostStore
// ---------------------------------------------------------------------------

/// Durable storage of posts and threads.
///
/// Guarantees:
/// - `append_reply` is atomic per thread: either the reply is committed and
///   returned, or an error is returned and nothing is visible.
/// - `get_thread` returns replies ordered by creation time.
/// - A deleted thread reports `ThreadNotFound` for reads and appends.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Create a human-authored post. A reply inherits its parent's thread.
    async fn create_post(&self, post: NewPost) -> StorageResult<Post>;

    /// Retrieve a single post.
    async fn get_post(&self, post_id: &PostId) -> StorageResult<Post>;

    /// Append an agent-authored reply to `trigger_post_id` within `thread_id`.
    async fn append_reply(
        &self,
        thread_id: &ThreadId,
        trigger_post_id: &PostId,
        agent_handle: &str,
        text: &str,
    ) -> StorageResult<Post>;

    /// Retrieve a thread snapshot.
    async fn get_thread(&self, thread_id: &ThreadId) -> StorageResult<ThreadSnapshot>;

    /// Delete a thread with all of its replies.
    async fn delete_thread(&self, thread_id: &ThreadId) -> StorageResult<()>;
}
