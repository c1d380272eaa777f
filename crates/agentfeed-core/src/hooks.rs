//! Extension points around post creation and run completion.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use feed_state::Post;
use tracing::{info, warn};

use crate::domain::AgentRun;

/// Callback invoked synchronously by the orchestrator.
///
/// Hooks observe; they cannot veto or fail the flow. Keep them fast: they
/// run on the task that triggered them.
pub trait FeedHook: Send + Sync {
    fn name(&self) -> &str;

    /// After a post has been processed and its runs created.
    fn on_post_created(&self, _post: &Post, _runs: &[AgentRun]) {}

    /// After a run reached `done` or `error`.
    fn on_run_finished(&self, _run: &AgentRun) {}
}

/// Ordered list of hooks. Invoked in registration order.
#[derive(Clone, Default)]
pub struct HookRegistry {
    hooks: Vec<Arc<dyn FeedHook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hook: Arc<dyn FeedHook>) {
        info!(hook = hook.name(), "hook registered");
        self.hooks.push(hook);
    }

    pub fn with(mut self, hook: Arc<dyn FeedHook>) -> Self {
        self.register(hook);
        self
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn post_created(&self, post: &Post, runs: &[AgentRun]) {
        for hook in &self.hooks {
            guarded(hook.name(), "on_post_created", || hook.on_post_created(post, runs));
        }
    }

    pub fn run_finished(&self, run: &AgentRun) {
        for hook in &self.hooks {
            guarded(hook.name(), "on_run_finished", || hook.on_run_finished(run));
        }
    }
}

fn guarded(hook: &str, point: &str, f: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        warn!(hook = hook, point = point, "hook panicked; continuing");
    }
}

/// Logs both extension points.
#[derive(Debug, Default)]
pub struct TracingHook;

impl FeedHook for TracingHook {
    fn name(&self) -> &str {
        "tracing"
    }

    fn on_post_created(&self, post: &Post, runs: &[AgentRun]) {
        let agents: Vec<&str> = runs.iter().map(|r| r.agent_handle.as_str()).collect();
        info!(
            hook = "tracing",
            post_id = %post.id,
            thread_id = %post.thread_id,
            agents = ?agents,
            "post created"
        );
    }

    fn on_run_finished(&self, run: &AgentRun) {
        info!(
            hook = "tracing",
            run_id = %run.id,
            agent = %run.agent_handle,
            status = %run.status,
            "run finished"
        );
    }
}
