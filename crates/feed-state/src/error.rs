//! Error types for feed-state

use thiserror::Error;

/// Errors raised while connecting to or preparing the backing database
#[derive(Error, Debug)]
pub enum StateError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Database query error
    #[error("Database query failed: {0}")]
    Query(String),

    /// Schema setup error
    #[error("Schema setup failed: {0}")]
    SchemaSetup(String),
}

impl From<surrealdb::Error> for StateError {
    fn from(err: surrealdb::Error) -> Self {
        StateError::Query(err.to_string())
    }
}

/// Errors returned by [`crate::PostStore`] operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// No post with the given id
    #[error("post not found: {post_id}")]
    PostNotFound { post_id: String },

    /// No thread with the given id (or it was deleted)
    #[error("thread not found: {thread_id}")]
    ThreadNotFound { thread_id: String },

    /// Backend failure (database unreachable, query rejected, ...)
    #[error("storage backend error: {0}")]
    Backend(String),

    /// Row could not be encoded or decoded
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl From<StateError> for StorageError {
    fn from(err: StateError) -> Self {
        StorageError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}
