//! Orchestration facade: the one entry point the post path calls.
//!
//! ```ignore
//! let orchestrator = Orchestrator::builder(registry, store, executor)
//!     .config(OrchestratorConfig::from_env()?)
//!     .hook(Arc::new(TracingHook))
//!     .build()?;
//!
//! let post = store.create_post(NewPost::root("@me", "hey @grok")).await?;
//! let runs = orchestrator.handle_new_post(&post).await;
//! ```

use std::sync::Arc;

use feed_state::{AuthorKind, Post, PostStore, ThreadId};
use tracing::{debug, info, instrument, warn};

use crate::config::OrchestratorConfig;
use crate::domain::{
    AgentRun, ConfigError, EventSink, ExcerptEntry, FeedError, FeedEvent, InputContext,
    LifecycleError, RunId,
};
use crate::executor::AgentExecutor;
use crate::hooks::{FeedHook, HookRegistry};
use crate::hub::{EventHub, Subscription};
use crate::lifecycle::RunLifecycle;
use crate::mention::resolve_mentions;
use crate::metrics::METRICS;
use crate::obs;
use crate::registry::AgentRegistry;
use crate::scheduler::{DispatchHandle, Scheduler, SchedulerParts, Tombstones};

/// Runs created for one post plus a handle on their completion.
#[derive(Debug)]
pub struct Submission {
    /// Snapshots taken at creation; all `queued`.
    pub runs: Vec<AgentRun>,
    pub handle: DispatchHandle,
}

pub struct OrchestratorBuilder {
    registry: Arc<dyn AgentRegistry>,
    store: Arc<dyn PostStore>,
    executor: Arc<dyn AgentExecutor>,
    config: OrchestratorConfig,
    hooks: HookRegistry,
    hub: Option<EventHub>,
}

impl OrchestratorBuilder {
    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn hook(mut self, hook: Arc<dyn FeedHook>) -> Self {
        self.hooks.register(hook);
        self
    }

    /// Share an existing hub instead of creating one from the config.
    pub fn hub(mut self, hub: EventHub) -> Self {
        self.hub = Some(hub);
        self
    }

    pub fn build(self) -> Result<Orchestrator, ConfigError> {
        self.config.validate()?;

        let hub = self
            .hub
            .unwrap_or_else(|| EventHub::new(self.config.subscriber_queue_capacity));
        let sink: Arc<dyn EventSink> = Arc::new(hub.clone());
        let lifecycle = Arc::new(RunLifecycle::new(Arc::clone(&sink)));
        let tombstones = Arc::new(Tombstones::default());

        let scheduler = Arc::new(Scheduler::new(
            SchedulerParts {
                lifecycle: Arc::clone(&lifecycle),
                store: Arc::clone(&self.store),
                executor: self.executor,
                registry: Arc::clone(&self.registry),
                sink: Arc::clone(&sink),
                hooks: self.hooks.clone(),
                tombstones: Arc::clone(&tombstones),
            },
            self.config.max_concurrent_runs,
            self.config.run_timeout,
        ));

        info!(
            max_concurrent_runs = self.config.max_concurrent_runs,
            run_timeout_ms = self.config.run_timeout.as_millis() as u64,
            subscriber_queue = hub.capacity(),
            hooks = self.hooks.len(),
            "orchestrator ready"
        );

        Ok(Orchestrator {
            config: self.config,
            registry: self.registry,
            store: self.store,
            lifecycle,
            hub,
            sink,
            hooks: self.hooks,
            scheduler,
            tombstones,
        })
    }
}

/// Wires mention resolution, run lifecycle, scheduling and live events.
pub struct Orchestrator {
    config: OrchestratorConfig,
    registry: Arc<dyn AgentRegistry>,
    store: Arc<dyn PostStore>,
    lifecycle: Arc<RunLifecycle>,
    hub: EventHub,
    sink: Arc<dyn EventSink>,
    hooks: HookRegistry,
    scheduler: Arc<Scheduler>,
    tombstones: Arc<Tombstones>,
}

impl Orchestrator {
    pub fn builder(
        registry: Arc<dyn AgentRegistry>,
        store: Arc<dyn PostStore>,
        executor: Arc<dyn AgentExecutor>,
    ) -> OrchestratorBuilder {
        OrchestratorBuilder {
            registry,
            store,
            executor,
            config: OrchestratorConfig::default(),
            hooks: HookRegistry::new(),
            hub: None,
        }
    }

    /// Trigger every enabled agent mentioned in `post`.
    ///
    /// Returns the created runs, still `queued`, without waiting for them.
    /// Zero mentions is an empty list, not an error.
    pub async fn handle_new_post(&self, post: &Post) -> Vec<AgentRun> {
        self.submit(post).await.runs
    }

    /// [`handle_new_post`](Self::handle_new_post) plus a [`DispatchHandle`].
    #[instrument(skip_all, fields(post_id = %post.id, thread_id = %post.thread_id))]
    pub async fn submit(&self, post: &Post) -> Submission {
        // agent replies never trigger further agents
        if post.author_kind == AuthorKind::Agent {
            debug!("agent-authored post; skipping mention resolution");
            return Submission {
                runs: Vec::new(),
                handle: DispatchHandle::empty(),
            };
        }

        let mentions = resolve_mentions(&post.text, &self.registry.enabled_handles());
        if mentions.is_empty() {
            return Submission {
                runs: Vec::new(),
                handle: DispatchHandle::empty(),
            };
        }

        let input_context = InputContext::new(post, self.thread_excerpt(&post.thread_id).await);

        let mut created = Vec::with_capacity(mentions.len());
        let mut runs = Vec::with_capacity(mentions.len());
        for mention in mentions {
            match self.lifecycle.create(
                mention.agent_handle,
                post.thread_id.clone(),
                input_context.clone(),
            ) {
                Ok(run) => {
                    METRICS.inc_runs_created();
                    obs::emit_run_created(
                        run.id.as_str(),
                        run.agent_handle.as_str(),
                        run.thread_id.as_str(),
                        run.trigger_post_id.as_str(),
                    );
                    self.sink
                        .publish(&run.thread_id, FeedEvent::RunCreated { run: run.clone() });
                    created.push(run.clone());
                    runs.push(run);
                }
                Err(LifecycleError::DuplicateRun { run_id, agent, .. }) => {
                    // resubmitted post: report the existing run, do not redispatch
                    debug!(run_id = %run_id, agent = %agent, "run already exists");
                    if let Some(existing) = self.lifecycle.get(&run_id) {
                        runs.push(existing);
                    }
                }
                Err(e) => warn!(error = %e, "failed to create run"),
            }
        }

        self.hooks.post_created(post, &runs);
        let handle = self.scheduler.dispatch(created);
        Submission { runs, handle }
    }

    /// Discard a thread's pending results, then delete it from the store.
    ///
    /// The tombstone goes in first so a reply racing the delete ends in
    /// `error(discarded)`. It stays even if the store delete fails.
    pub async fn delete_thread(&self, thread_id: &ThreadId) -> Result<(), FeedError> {
        self.discard_thread(thread_id);
        self.store.delete_thread(thread_id).await?;
        Ok(())
    }

    /// Mark `thread_id` as gone. Runs not yet at the executor end in
    /// `error(discarded)` without calling it; runs already executing finish
    /// but their reply is not appended.
    pub fn discard_thread(&self, thread_id: &ThreadId) {
        if self.tombstones.insert(thread_id.clone()) {
            info!(thread_id = %thread_id, active_runs = self.active_runs(thread_id).len(), "thread discarded");
        }
    }

    pub fn is_discarded(&self, thread_id: &ThreadId) -> bool {
        self.tombstones.contains(thread_id)
    }

    /// Every run of a thread, in creation order.
    pub fn list_runs(&self, thread_id: &ThreadId) -> Vec<AgentRun> {
        self.lifecycle.list_for_thread(thread_id)
    }

    /// Runs still `queued` or `running`.
    pub fn active_runs(&self, thread_id: &ThreadId) -> Vec<AgentRun> {
        self.lifecycle.active_for_thread(thread_id)
    }

    pub fn get_run(&self, run_id: &RunId) -> Option<AgentRun> {
        self.lifecycle.get(run_id)
    }

    pub fn subscribe(&self, thread_id: &ThreadId) -> Subscription {
        self.hub.subscribe(thread_id)
    }

    pub fn hub(&self) -> &EventHub {
        &self.hub
    }

    pub fn store(&self) -> &Arc<dyn PostStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<dyn AgentRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Runs currently holding an execution slot.
    pub fn runs_in_flight(&self) -> usize {
        self.scheduler.in_flight()
    }

    async fn thread_excerpt(&self, thread_id: &ThreadId) -> Vec<ExcerptEntry> {
        if self.config.context_posts == 0 {
            return Vec::new();
        }
        match self.store.get_thread(thread_id).await {
            Ok(thread) => thread
                .tail(self.config.context_posts)
                .into_iter()
                .map(ExcerptEntry::from)
                .collect(),
            Err(e) => {
                warn!(thread_id = %thread_id, error = %e, "thread unreadable; empty context");
                Vec::new()
            }
        }
    }
}
