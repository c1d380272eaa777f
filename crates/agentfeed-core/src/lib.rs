//! AgentFeed Core Library
//!
//! Mention orchestration and live delivery: given a freshly stored post,
//! work out which agents were mentioned, run each one as an independent,
//! tracked unit of work, commit their replies, and stream every state
//! change to whoever is watching the thread.
//!
//! ## Layer 1 - Orchestration
//!
//! Data flow:
//!
//! ```text
//! post ─▶ mention ─▶ lifecycle (queued) ─▶ scheduler ─▶ executor ─▶ store
//!                        │                     │                     │
//!                        └──── hub ◀───────────┴─────────────────────┘
//! ```

pub mod config;
pub mod domain;
pub mod executor;
pub mod hooks;
pub mod hub;
pub mod lifecycle;
pub mod mention;
pub mod metrics;
pub mod obs;
pub mod orchestrator;
pub mod registry;
pub mod scheduler;
pub mod telemetry;

pub use config::OrchestratorConfig;
pub use domain::{
    AgentDescriptor, AgentHandle, AgentRun, ConfigError, EventSink, ExcerptEntry, ExecutorError,
    FailureCause, FeedError, FeedEvent, InputContext, LifecycleError, NullSink, Result, RunFailure,
    RunId, RunStatus,
};
pub use executor::AgentExecutor;
pub use hooks::{FeedHook, HookRegistry, TracingHook};
pub use hub::{EventHub, Subscription};
pub use lifecycle::RunLifecycle;
pub use mention::{resolve_handles, resolve_mentions, Mention};
pub use metrics::METRICS;
pub use obs::{
    emit_post_appended, emit_run_created, emit_run_finished, emit_run_started,
    emit_subscriber_dropped, RunSpan,
};
pub use orchestrator::{Orchestrator, OrchestratorBuilder, Submission};
pub use registry::{AgentRegistry, StaticAgentRegistry};
pub use scheduler::{DispatchHandle, Scheduler, SchedulerParts, Tombstones};
pub use telemetry::init_tracing;

pub use feed_state::{
    AuthorKind, NewPost, Post, PostId, PostStore, StorageError, ThreadId, ThreadSnapshot,
};
