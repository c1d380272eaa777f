//! Domain models for AgentFeed orchestration.
//!
//! - `AgentHandle` / `AgentDescriptor`: configured agent identity
//! - `AgentRun`: one agent's attempt to answer one post
//! - `FeedEvent`: what thread subscribers receive

pub mod agent;
pub mod error;
pub mod event;
pub mod run;

pub use agent::{AgentDescriptor, AgentHandle};
pub use error::{ConfigError, ExecutorError, FeedError, LifecycleError, Result};
pub use event::{EventSink, FeedEvent, NullSink};
pub use run::{AgentRun, ExcerptEntry, FailureCause, InputContext, RunFailure, RunId, RunStatus};
