//! AgentFeed daemon
//!
//! HTTP surface over [`agentfeed_core::Orchestrator`]: post submission,
//! thread snapshots, run status polling and a per-thread SSE feed.
//!
//! ## Layer 3 - Service

pub mod app;
pub mod error;
pub mod routes;
pub mod stream;

pub use app::{router, AppState};
pub use error::ApiError;
