//! Global atomic counters for AgentFeed observability.
//!
//! Counters are incremented silently at the call site. Call
//! [`Metrics::flush`] to emit current values as a single
//! `tracing::info!` event (e.g. on shutdown).

use std::sync::atomic::{AtomicU64, Ordering};

/// Global metrics singleton.
pub static METRICS: Metrics = Metrics::new();

pub struct Metrics {
    runs_created: AtomicU64,
    runs_succeeded: AtomicU64,
    runs_failed: AtomicU64,
    events_published: AtomicU64,
    subscribers_dropped: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub const fn new() -> Self {
        Self {
            runs_created: AtomicU64::new(0),
            runs_succeeded: AtomicU64::new(0),
            runs_failed: AtomicU64::new(0),
            events_published: AtomicU64::new(0),
            subscribers_dropped: AtomicU64::new(0),
        }
    }

    pub fn inc_runs_created(&self) {
        self.runs_created.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "runs_created", "counter incremented");
    }

    pub fn inc_runs_succeeded(&self) {
        self.runs_succeeded.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "runs_succeeded", "counter incremented");
    }

    pub fn inc_runs_failed(&self) {
        self.runs_failed.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "runs_failed", "counter incremented");
    }

    /// Counts one event handed to the hub, regardless of subscriber count.
    pub fn inc_events_published(&self) {
        self.events_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_subscribers_dropped(&self) {
        self.subscribers_dropped.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(metric = "subscribers_dropped", "counter incremented");
    }

    /// Emit all current counter values as a single `info!` event.
    pub fn flush(&self) {
        tracing::info!(
            metric = "flush",
            runs_created = self.runs_created(),
            runs_succeeded = self.runs_succeeded(),
            runs_failed = self.runs_failed(),
            events_published = self.events_published(),
            subscribers_dropped = self.subscribers_dropped(),
        );
    }

    pub fn runs_created(&self) -> u64 {
        self.runs_created.load(Ordering::Relaxed)
    }

    pub fn runs_succeeded(&self) -> u64 {
        self.runs_succeeded.load(Ordering::Relaxed)
    }

    pub fn runs_failed(&self) -> u64 {
        self.runs_failed.load(Ordering::Relaxed)
    }

    pub fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }

    pub fn subscribers_dropped(&self) -> u64 {
        self.subscribers_dropped.load(Ordering::Relaxed)
    }

    /// Reset all counters to zero (useful in tests).
    pub fn reset(&self) {
        self.runs_created.store(0, Ordering::Relaxed);
        self.runs_succeeded.store(0, Ordering::Relaxed);
        self.runs_failed.store(0, Ordering::Relaxed);
        self.events_published.store(0, Ordering::Relaxed);
        self.subscribers_dropped.store(0, Ordering::Relaxed);
    }
}
