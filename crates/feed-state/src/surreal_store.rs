//! SurrealDB-backed PostStore implementation
//!
//! Uses `schema::PostRecord` for persistence, converting to/from
//! `storage_traits` types at the boundary.

use async_trait::async_trait;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info, instrument};

use crate::error::{StateError, StorageError};
use crate::migrations;
use crate::schema::PostRecord;
use crate::storage_traits::{
    AuthorKind, NewPost, Post, PostId, PostStore, StorageResult, ThreadId, ThreadSnapshot,
};

const NAMESPACE: &str = "agentfeed";
const DATABASE: &str = "main";

/// SurrealDB-backed implementation of [`PostStore`].
#[derive(Clone)]
pub struct SurrealPostStore {
    db: Surreal<Any>,
}

impl SurrealPostStore {
    /// Create an in-memory instance for testing.
    ///
    /// Connects to `mem://`, selects `agentfeed/main`, and runs `init_schema`.
    pub async fn in_memory() -> crate::Result<Self> {
        Self::connect("mem://").await
    }

    /// Connect to any SurrealDB endpoint understood by the `any` engine
    /// (`mem://`, `surrealkv://path`, `ws://host:port`).
    #[instrument(skip_all, fields(url = %url))]
    pub async fn connect(url: &str) -> crate::Result<Self> {
        if let Some(path) = url.strip_prefix("surrealkv://") {
            std::fs::create_dir_all(path).map_err(|e| {
                StateError::Connection(format!(
                    "Failed to create database directory {}: {}",
                    path, e
                ))
            })?;
        }

        let db = surrealdb::engine::any::connect(url)
            .await
            .map_err(|e| StateError::Connection(format!("Failed to connect to {}: {}", url, e)))?;

        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| StateError::Connection(e.to_string()))?;

        migrations::init_schema(&db).await?;

        info!("SurrealPostStore connected ({})", url);
        Ok(Self { db })
    }

    // -- private helpers -----------------------------------------------------

    async fn fetch_post(&self, post_id: &str) -> StorageResult<Option<PostRecord>> {
        let pid_owned = post_id.to_string();
        let mut res = self
            .db
            .query("SELECT * FROM posts WHERE post_id = $pid")
            .bind(("pid", pid_owned))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let rows: Vec<PostRecord> = res
            .take(0)
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        Ok(rows.into_iter().next())
    }

    /// A thread exists as long as its root post exists.
    async fn ensure_thread(&self, thread_id: &ThreadId) -> StorageResult<()> {
        match self.fetch_post(thread_id.as_str()).await? {
            Some(_) => Ok(()),
            None => Err(StorageError::ThreadNotFound {
                thread_id: thread_id.0.clone(),
            }),
        }
    }

    async fn insert(&self, row: PostRecord) -> StorageResult<Post> {
        let _created: Option<PostRecord> = self
            .db
            .create("posts")
            .content(row.clone())
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        row.into_post()
    }
}

#[async_trait]
impl PostStore for SurrealPostStore {
    async fn create_post(&self, post: NewPost) -> StorageResult<Post> {
        let post_id = PostId::new();

        let thread_id = match &post.parent_id {
            Some(parent) => {
                let parent_row = self.fetch_post(parent.as_str()).await?.ok_or_else(|| {
                    StorageError::PostNotFound {
                        post_id: parent.0.clone(),
                    }
                })?;
                ThreadId(parent_row.thread_id)
            }
            None => ThreadId::from(&post_id),
        };

        debug!(post_id = %post_id, thread_id = %thread_id, "creating post");

        let row = PostRecord::new(
            &post_id,
            &thread_id,
            post.parent_id.as_ref(),
            AuthorKind::Human,
            &post.author_handle,
            &post.text,
        );
        self.insert(row).await
    }

    async fn get_post(&self, post_id: &PostId) -> StorageResult<Post> {
        self.fetch_post(post_id.as_str())
            .await?
            .ok_or_else(|| StorageError::PostNotFound {
                post_id: post_id.0.clone(),
            })?
            .into_post()
    }

    async fn append_reply(
        &self,
        thread_id: &ThreadId,
        trigger_post_id: &PostId,
        agent_handle: &str,
        text: &str,
    ) -> StorageResult<Post> {
        self.ensure_thread(thread_id).await?;

        let post_id = PostId::new();
        debug!(post_id = %post_id, thread_id = %thread_id, agent = %agent_handle, "appending reply");

        let row = PostRecord::new(
            &post_id,
            thread_id,
            Some(trigger_post_id),
            AuthorKind::Agent,
            agent_handle,
            text,
        );
        self.insert(row).await
    }

    async fn get_thread(&self, thread_id: &ThreadId) -> StorageResult<ThreadSnapshot> {
        let tid_owned = thread_id.0.clone();
        let mut res = self
            .db
            .query("SELECT * FROM posts WHERE thread_id = $tid ORDER BY created_at ASC")
            .bind(("tid", tid_owned))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let rows: Vec<PostRecord> = res
            .take(0)
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let mut root = None;
        let mut replies = Vec::with_capacity(rows.len());
        for row in rows {
            let post = row.into_post()?;
            if post.id.as_str() == thread_id.as_str() {
                root = Some(post);
            } else {
                replies.push(post);
            }
        }

        let root = root.ok_or_else(|| StorageError::ThreadNotFound {
            thread_id: thread_id.0.clone(),
        })?;

        Ok(ThreadSnapshot { root, replies })
    }

    async fn delete_thread(&self, thread_id: &ThreadId) -> StorageResult<()> {
        self.ensure_thread(thread_id).await?;

        let tid_owned = thread_id.0.clone();
        self.db
            .query("DELETE posts WHERE thread_id = $tid")
            .bind(("tid", tid_owned))
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        info!(thread_id = %thread_id, "thread deleted");
        Ok(())
    }
}
