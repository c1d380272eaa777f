//! Schema definitions for AgentFeed SurrealDB tables
//!
//! Tables:
//! - posts: Human and agent posts, grouped by thread id

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StorageError;
use crate::storage_traits::{AuthorKind, Post, PostId, StorageResult, ThreadId};

/// Module for serializing chrono DateTime to SurrealDB datetime format
mod surreal_datetime {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};
    use surrealdb::sql::Datetime as SurrealDatetime;

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let sd = SurrealDatetime::from(*date);
        serde::Serialize::serialize(&sd, serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let sd = SurrealDatetime::deserialize(deserializer)?;
        Ok(DateTime::from(sd))
    }
}

/// Post row as stored in the `posts` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRecord {
    /// SurrealDB record ID
    pub id: Option<surrealdb::sql::Thing>,
    /// Unique post ID (UUID string)
    pub post_id: String,
    /// Thread this post belongs to (the root post's ID)
    pub thread_id: String,
    /// Reply target, if any
    pub parent_id: Option<String>,
    /// "human" | "agent"
    pub author_kind: String,
    /// Author handle (`@me`, `grok`, ...)
    pub author_handle: String,
    /// Post body
    pub text: String,
    /// Creation timestamp
    #[serde(with = "surreal_datetime")]
    pub created_at: DateTime<Utc>,
}

impl PostRecord {
    /// Build a row for a freshly created post
    pub fn new(
        post_id: &PostId,
        thread_id: &ThreadId,
        parent_id: Option<&PostId>,
        author_kind: AuthorKind,
        author_handle: &str,
        text: &str,
    ) -> Self {
        PostRecord {
            id: None,
            post_id: post_id.0.clone(),
            thread_id: thread_id.0.clone(),
            parent_id: parent_id.map(|p| p.0.clone()),
            author_kind: author_kind.as_str().to_string(),
            author_handle: author_handle.to_string(),
            text: text.to_string(),
            created_at: Utc::now(),
        }
    }

    /// Convert a DB row into the domain `Post`
    pub fn into_post(self) -> StorageResult<Post> {
        let author_kind = match self.author_kind.as_str() {
            "human" => AuthorKind::Human,
            "agent" => AuthorKind::Agent,
            other => {
                return Err(StorageError::Serialization(format!(
                    "unknown author kind: {other}"
                )))
            }
        };

        Ok(Post {
            id: PostId(self.post_id),
            thread_id: ThreadId(self.thread_id),
            parent_id: self.parent_id.map(PostId),
            author_kind,
            author_handle: self.author_handle,
            text: self.text,
            created_at: self.created_at,
        })
    }
}
