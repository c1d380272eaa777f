//! Structured observability hooks for the agent run lifecycle.
//!
//! This module provides:
//! - `RunSpan`, the span every per-run task executes inside
//! - Emission functions for lifecycle milestones: created, started, reply
//!   appended, finished, subscriber dropped
//!
//! Events are emitted at `info!` level unless noted. Filter with `RUST_LOG`.

use std::future::Future;

use tracing::instrument::Instrumented;
use tracing::{info, warn, Instrument};

/// Span carrying `run_id` and `agent` for everything a run logs.
///
/// Created in the caller's context, so it nests under whatever span
/// dispatched the run.
///
/// # Example
///
/// ```ignore
/// let span = RunSpan::new("run-12345", "grok");
/// tokio::spawn(span.instrument(async { /* ... */ }));
/// ```
#[derive(Debug, Clone)]
pub struct RunSpan {
    span: tracing::Span,
}

impl RunSpan {
    pub fn new(run_id: &str, agent: &str) -> Self {
        Self {
            span: tracing::info_span!("agentfeed.run", run_id = %run_id, agent = %agent),
        }
    }

    /// Enter the span on the current thread until the guard drops.
    /// Not for use across `.await`; see [`instrument`](Self::instrument).
    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }

    /// Run `fut` inside the span.
    pub fn instrument<F: Future>(&self, fut: F) -> Instrumented<F> {
        fut.instrument(self.span.clone())
    }
}

/// Emit event: run created for a mention.
pub fn emit_run_created(run_id: &str, agent: &str, thread_id: &str, trigger_post_id: &str) {
    info!(
        event = "run.created",
        run_id = %run_id,
        agent = %agent,
        thread_id = %thread_id,
        trigger_post_id = %trigger_post_id,
    );
}

/// Emit event: run admitted past the concurrency gate.
pub fn emit_run_started(run_id: &str, agent: &str) {
    info!(event = "run.started", run_id = %run_id, agent = %agent);
}

/// Emit event: agent reply committed to the store.
pub fn emit_post_appended(run_id: &str, post_id: &str, thread_id: &str) {
    info!(
        event = "post.appended",
        run_id = %run_id,
        post_id = %post_id,
        thread_id = %thread_id,
    );
}

/// Emit event: run reached a terminal state.
///
/// `cause` is `None` on success.
pub fn emit_run_finished(run_id: &str, duration_ms: u64, success: bool, cause: Option<&str>) {
    if success {
        info!(
            event = "run.finished",
            run_id = %run_id,
            duration_ms = duration_ms,
            success = true,
        );
    } else {
        warn!(
            event = "run.finished",
            run_id = %run_id,
            duration_ms = duration_ms,
            success = false,
            cause = cause.unwrap_or("unknown"),
        );
    }
}

/// Emit event: a slow subscriber was dropped (warning level).
pub fn emit_subscriber_dropped(thread_id: &str, capacity: usize) {
    warn!(
        event = "subscriber.dropped",
        thread_id = %thread_id,
        capacity = capacity,
        "subscriber queue overflowed; feed closed"
    );
}
