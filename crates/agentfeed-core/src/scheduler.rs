//! Bounded, failure-isolated execution of agent runs.
//!
//! Each run is its own tokio task. A process-wide semaphore caps how many
//! runs may be `running` at once; the rest wait in `queued`. A run's outcome
//! never touches its siblings: executor errors, timeouts, panics and store
//! failures all end that one run in `error`. The run deadline covers the
//! executor call and the reply commit together, so a stalled store cannot
//! pin a slot.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use feed_state::{PostId, PostStore, StorageError, ThreadId};
use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};
use tracing::warn;

use crate::domain::{
    AgentRun, EventSink, ExecutorError, FailureCause, FeedEvent, RunFailure, RunStatus,
};
use crate::executor::AgentExecutor;
use crate::hooks::HookRegistry;
use crate::lifecycle::RunLifecycle;
use crate::metrics::METRICS;
use crate::obs;
use crate::registry::AgentRegistry;

/// Threads whose pending results must be thrown away.
#[derive(Debug, Default)]
pub struct Tombstones {
    threads: RwLock<HashSet<ThreadId>>,
}

impl Tombstones {
    pub fn insert(&self, thread_id: ThreadId) -> bool {
        self.threads
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(thread_id)
    }

    pub fn contains(&self, thread_id: &ThreadId) -> bool {
        self.threads
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(thread_id)
    }
}

/// Collaborators a scheduler needs.
pub struct SchedulerParts {
    pub lifecycle: Arc<RunLifecycle>,
    pub store: Arc<dyn PostStore>,
    pub executor: Arc<dyn AgentExecutor>,
    pub registry: Arc<dyn AgentRegistry>,
    pub sink: Arc<dyn EventSink>,
    pub hooks: HookRegistry,
    pub tombstones: Arc<Tombstones>,
}

pub struct Scheduler {
    parts: SchedulerParts,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
    run_timeout: Duration,
}

impl Scheduler {
    pub fn new(parts: SchedulerParts, max_concurrent: usize, run_timeout: Duration) -> Self {
        let max_concurrent = max_concurrent.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            parts,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            run_timeout,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Number of runs currently holding an execution slot.
    pub fn in_flight(&self) -> usize {
        self.max_concurrent - self.permits.available_permits()
    }

    /// Spawn one task per run and return immediately.
    pub fn dispatch(self: &Arc<Self>, runs: Vec<AgentRun>) -> DispatchHandle {
        let tasks = runs
            .into_iter()
            .map(|run| {
                let scheduler = Arc::clone(self);
                let span = obs::RunSpan::new(run.id.as_str(), run.agent_handle.as_str());
                tokio::spawn(span.instrument(async move { scheduler.execute_run(run).await }))
            })
            .collect();
        DispatchHandle { tasks }
    }

    /// Drive one run from `queued` to a terminal state.
    ///
    /// Returns `None` only if the run could not be started (already
    /// dispatched elsewhere, or the scheduler is shutting down).
    async fn execute_run(&self, run: AgentRun) -> Option<AgentRun> {
        let _permit = match Arc::clone(&self.permits).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                warn!("execution slots closed; run left queued");
                return None;
            }
        };

        let running = match self.parts.lifecycle.mark_running(&run.id) {
            Ok(running) => running,
            Err(e) => {
                warn!(error = %e, "run not started");
                return None;
            }
        };
        obs::emit_run_started(running.id.as_str(), running.agent_handle.as_str());

        let finished = match self.attempt(&running).await {
            Ok(post_id) => self.parts.lifecycle.mark_done(&running.id, post_id),
            Err(failure) => self.parts.lifecycle.mark_error(&running.id, failure),
        };
        let finished = match finished {
            Ok(run) => run,
            Err(e) => {
                warn!(error = %e, "failed to record run outcome");
                return self.parts.lifecycle.get(&running.id);
            }
        };

        let success = finished.status == RunStatus::Done;
        if success {
            METRICS.inc_runs_succeeded();
        } else {
            METRICS.inc_runs_failed();
        }
        let cause = finished
            .error_detail
            .as_ref()
            .map(|f| cause_name(f.cause));
        obs::emit_run_finished(
            finished.id.as_str(),
            finished.duration_ms().unwrap_or(0),
            success,
            cause,
        );
        self.parts.hooks.run_finished(&finished);

        Some(finished)
    }

    /// Executor call plus reply commit. `Ok` carries the new reply's id.
    ///
    /// Both share one deadline of `run_timeout`, measured from here.
    async fn attempt(&self, run: &AgentRun) -> Result<PostId, RunFailure> {
        let started = Instant::now();
        let remaining = || self.run_timeout.saturating_sub(started.elapsed());
        let timed_out = || RunFailure::from(&ExecutorError::Timeout(self.run_timeout));
        let discarded = || RunFailure::discarded(&run.thread_id);
        if self.parts.tombstones.contains(&run.thread_id) {
            return Err(discarded());
        }

        let descriptor = self
            .parts
            .registry
            .describe(&run.agent_handle)
            .ok_or_else(|| {
                RunFailure::from(&ExecutorError::InvalidAgent(run.agent_handle.to_string()))
            })?;

        let call = self
            .parts
            .executor
            .execute(&descriptor, &run.input_context, remaining());
        let text = match timeout(remaining(), AssertUnwindSafe(call).catch_unwind()).await {
            Ok(Ok(Ok(text))) => text,
            Ok(Ok(Err(e))) => return Err(RunFailure::from(&e)),
            Ok(Err(_panic)) => {
                return Err(RunFailure::from(&ExecutorError::Upstream(
                    "executor panicked".to_string(),
                )))
            }
            Err(_elapsed) => return Err(timed_out()),
        };

        if text.trim().is_empty() {
            return Err(RunFailure::from(&ExecutorError::Upstream(
                "executor returned an empty reply".to_string(),
            )));
        }
        if self.parts.tombstones.contains(&run.thread_id) {
            return Err(discarded());
        }

        let append = self.parts.store.append_reply(
            &run.thread_id,
            &run.trigger_post_id,
            run.agent_handle.as_str(),
            &text,
        );
        let committed = match timeout(remaining(), append).await {
            Ok(committed) => committed,
            Err(_elapsed) => {
                warn!(thread_id = %run.thread_id, "store did not confirm the reply before the run deadline");
                return Err(timed_out());
            }
        };
        let post = match committed {
            Ok(post) => post,
            Err(StorageError::ThreadNotFound { .. })
                if self.parts.tombstones.contains(&run.thread_id) =>
            {
                return Err(discarded())
            }
            Err(e) => return Err(RunFailure::from(&e)),
        };

        obs::emit_post_appended(run.id.as_str(), post.id.as_str(), post.thread_id.as_str());
        let post_id = post.id.clone();
        self.parts.sink.publish(
            &run.thread_id,
            FeedEvent::PostAppended {
                run_id: run.id.clone(),
                post,
            },
        );
        Ok(post_id)
    }
}

fn cause_name(cause: FailureCause) -> &'static str {
    match cause {
        FailureCause::Timeout => "timeout",
        FailureCause::Upstream => "upstream",
        FailureCause::InvalidAgent => "invalid_agent",
        FailureCause::Store => "store",
        FailureCause::Discarded => "discarded",
    }
}

/// Join handle over every run dispatched for one post.
#[derive(Debug)]
pub struct DispatchHandle {
    tasks: Vec<JoinHandle<Option<AgentRun>>>,
}

impl DispatchHandle {
    pub fn empty() -> Self {
        Self { tasks: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for every run to finish; returns their final snapshots.
    pub async fn join(self) -> Vec<AgentRun> {
        let mut finished = Vec::with_capacity(self.tasks.len());
        for task in self.tasks {
            match task.await {
                Ok(Some(run)) => finished.push(run),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "run task aborted"),
            }
        }
        finished
    }
}
