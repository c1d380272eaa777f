//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryPostStore`, which satisfies the `PostStore` contract
//! without any external dependencies.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::StorageError;
use crate::storage_traits::*;

// ---------------------------------------------------------------------------
// MemoryPostStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Inner {
    posts: HashMap<String, Post>,
    /// Post ids per thread in insertion order; the first entry is the root.
    threads: HashMap<String, Vec<PostId>>,
}

/// In-memory post store backed by a `HashMap<PostId, Post>`.
#[derive(Debug, Default)]
pub struct MemoryPostStore {
    inner: Mutex<Inner>,
}

impl MemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored posts across all threads.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PostStore for MemoryPostStore {
    async fn create_post(&self, post: NewPost) -> StorageResult<Post> {
        let mut inner = self.inner.lock().unwrap();
        let id = PostId::new();

        let thread_id = match &post.parent_id {
            Some(parent) => inner
                .posts
                .get(parent.as_str())
                .map(|p| p.thread_id.clone())
                .ok_or_else(|| StorageError::PostNotFound {
                    post_id: parent.0.clone(),
                })?,
            None => ThreadId::from(&id),
        };

        let record = Post {
            id: id.clone(),
            thread_id: thread_id.clone(),
            parent_id: post.parent_id,
            author_kind: AuthorKind::Human,
            author_handle: post.author_handle,
            text: post.text,
            created_at: Utc::now(),
        };

        inner.posts.insert(id.0.clone(), record.clone());
        inner.threads.entry(thread_id.0).or_default().push(id);
        Ok(record)
    }

    async fn get_post(&self, post_id: &PostId) -> StorageResult<Post> {
        let inner = self.inner.lock().unwrap();
        inner
            .posts
            .get(post_id.as_str())
            .cloned()
            .ok_or_else(|| StorageError::PostNotFound {
                post_id: post_id.0.clone(),
            })
    }

    async fn append_reply(
        &self,
        thread_id: &ThreadId,
        trigger_post_id: &PostId,
        agent_handle: &str,
        text: &str,
    ) -> StorageResult<Post> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.threads.contains_key(thread_id.as_str()) {
            return Err(StorageError::ThreadNotFound {
                thread_id: thread_id.0.clone(),
            });
        }

        let id = PostId::new();
        let record = Post {
            id: id.clone(),
            thread_id: thread_id.clone(),
            parent_id: Some(trigger_post_id.clone()),
            author_kind: AuthorKind::Agent,
            author_handle: agent_handle.to_string(),
            text: text.to_string(),
            created_at: Utc::now(),
        };

        inner.posts.insert(id.0.clone(), record.clone());
        if let Some(ids) = inner.threads.get_mut(thread_id.as_str()) {
            ids.push(id);
        }
        Ok(record)
    }

    async fn get_thread(&self, thread_id: &ThreadId) -> StorageResult<ThreadSnapshot> {
        let inner = self.inner.lock().unwrap();
        let ids = inner
            .threads
            .get(thread_id.as_str())
            .ok_or_else(|| StorageError::ThreadNotFound {
                thread_id: thread_id.0.clone(),
            })?;

        let mut posts = ids
            .iter()
            .filter_map(|id| inner.posts.get(id.as_str()).cloned())
            .collect::<Vec<_>>()
            .into_iter();

        let root = posts.next().ok_or_else(|| StorageError::ThreadNotFound {
            thread_id: thread_id.0.clone(),
        })?;

        Ok(ThreadSnapshot {
            root,
            replies: posts.collect(),
        })
    }

    async fn delete_thread(&self, thread_id: &ThreadId) -> StorageResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let ids = inner
            .threads
            .remove(thread_id.as_str())
            .ok_or_else(|| StorageError::ThreadNotFound {
                thread_id: thread_id.0.clone(),
            })?;
        for id in ids {
            inner.posts.remove(id.as_str());
        }
        Ok(())
    }
}
