//! Feed-State: Post and Thread Persistence for AgentFeed
//!
//! This crate provides the Store collaborator used by the orchestration
//! layer. Orchestration code only ever sees the [`PostStore`] trait; the
//! concrete backend is chosen by the service at startup.
//!
//! ## Layer 0 - Data/Persistence
//!
//! ## Key Components
//!
//! - `PostStore`: create/read posts, append agent replies, read/delete threads
//! - `MemoryPostStore`: in-memory fake for tests
//! - `SurrealPostStore`: SurrealDB backend (`mem://`, `surrealkv://`, `ws://`)

mod error;
pub mod fakes;
mod migrations;
mod schema;
pub mod storage_traits;
pub mod surreal_store;

pub use error::{StateError, StorageError};
pub use schema::PostRecord;
pub use storage_traits::{
    AuthorKind, NewPost, Post, PostId, PostStore, StorageResult, ThreadId, ThreadSnapshot,
};
pub use surreal_store::SurrealPostStore;

/// Result type for feed-state setup operations
pub type Result<T> = std::result::Result<T, StateError>;
