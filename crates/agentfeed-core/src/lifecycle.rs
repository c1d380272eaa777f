//! Agent run state machine.
//!
//! [`RunLifecycle`] is the only writer of `AgentRun` status. Transitions on
//! one run are serialised by a per-run lock and the resulting event is
//! published while that lock is held, so subscribers see a run's events in
//! the order they were applied.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::Utc;
use feed_state::{PostId, ThreadId};
use tracing::{debug, warn};

use crate::domain::{
    AgentHandle, AgentRun, EventSink, FeedEvent, InputContext, LifecycleError, RunFailure, RunId,
    RunStatus,
};

type RunCell = Arc<Mutex<AgentRun>>;

#[derive(Default)]
struct Index {
    runs: HashMap<RunId, RunCell>,
    by_trigger: HashMap<(PostId, AgentHandle), RunId>,
    /// Run ids per thread, in creation order.
    by_thread: HashMap<ThreadId, Vec<RunId>>,
}

/// Owner of every `AgentRun` in the process.
pub struct RunLifecycle {
    index: RwLock<Index>,
    sink: Arc<dyn EventSink>,
}

fn lock_run(cell: &RunCell) -> MutexGuard<'_, AgentRun> {
    cell.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RunLifecycle {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            index: RwLock::new(Index::default()),
            sink,
        }
    }

    /// Register a new `queued` run.
    ///
    /// The trigger post is taken from `input_context`. At most one run may
    /// exist per (trigger post, agent); a second attempt fails with
    /// [`LifecycleError::DuplicateRun`] naming the existing run.
    pub fn create(
        &self,
        agent_handle: AgentHandle,
        thread_id: ThreadId,
        input_context: InputContext,
    ) -> Result<AgentRun, LifecycleError> {
        let mut index = self.index.write().unwrap_or_else(PoisonError::into_inner);

        let key = (input_context.trigger_post_id.clone(), agent_handle.clone());
        if let Some(existing) = index.by_trigger.get(&key) {
            return Err(LifecycleError::DuplicateRun {
                run_id: existing.clone(),
                trigger_post_id: key.0,
                agent: key.1,
            });
        }

        let run = AgentRun::new(agent_handle, thread_id, input_context);
        index.by_trigger.insert(key, run.id.clone());
        index
            .by_thread
            .entry(run.thread_id.clone())
            .or_default()
            .push(run.id.clone());
        index
            .runs
            .insert(run.id.clone(), Arc::new(Mutex::new(run.clone())));

        debug!(run_id = %run.id, agent = %run.agent_handle, "run registered");
        Ok(run)
    }

    /// `queued → running`. Fails if the run was already dispatched.
    pub fn mark_running(&self, run_id: &RunId) -> Result<AgentRun, LifecycleError> {
        self.transition(run_id, RunStatus::Running, |run| {
            if run.status != RunStatus::Queued {
                return Step::Reject;
            }
            run.status = RunStatus::Running;
            run.started_at = Some(Utc::now());
            Step::Applied
        })
    }

    /// `running → done`. Repeating the same call is a no-op.
    pub fn mark_done(
        &self,
        run_id: &RunId,
        output_post_id: PostId,
    ) -> Result<AgentRun, LifecycleError> {
        self.transition(run_id, RunStatus::Done, |run| match run.status {
            RunStatus::Done if run.output_post_id.as_ref() == Some(&output_post_id) => Step::Unchanged,
            RunStatus::Running => {
                run.status = RunStatus::Done;
                run.ended_at = Some(Utc::now());
                run.output_post_id = Some(output_post_id);
                Step::Applied
            }
            _ => Step::Reject,
        })
    }

    /// `running → error`. Repeating the same call is a no-op.
    pub fn mark_error(
        &self,
        run_id: &RunId,
        failure: RunFailure,
    ) -> Result<AgentRun, LifecycleError> {
        self.transition(run_id, RunStatus::Error, |run| match run.status {
            RunStatus::Error if run.error_detail.as_ref() == Some(&failure) => Step::Unchanged,
            RunStatus::Running => {
                run.status = RunStatus::Error;
                run.ended_at = Some(Utc::now());
                run.error_detail = Some(failure);
                Step::Applied
            }
            _ => Step::Reject,
        })
    }

    pub fn get(&self, run_id: &RunId) -> Option<AgentRun> {
        let cell = self.cell(run_id)?;
        let run = lock_run(&cell).clone();
        Some(run)
    }

    /// Run created for `agent` by `trigger_post_id`, if any.
    pub fn find(&self, trigger_post_id: &PostId, agent: &AgentHandle) -> Option<AgentRun> {
        let run_id = {
            let index = self.index.read().unwrap_or_else(PoisonError::into_inner);
            index
                .by_trigger
                .get(&(trigger_post_id.clone(), agent.clone()))
                .cloned()?
        };
        self.get(&run_id)
    }

    /// All runs of a thread, in creation order.
    pub fn list_for_thread(&self, thread_id: &ThreadId) -> Vec<AgentRun> {
        let cells: Vec<RunCell> = {
            let index = self.index.read().unwrap_or_else(PoisonError::into_inner);
            index
                .by_thread
                .get(thread_id)
                .map(|ids| ids.iter().filter_map(|id| index.runs.get(id).cloned()).collect())
                .unwrap_or_default()
        };
        cells.iter().map(|cell| lock_run(cell).clone()).collect()
    }

    /// Runs of a thread still `queued` or `running`.
    pub fn active_for_thread(&self, thread_id: &ThreadId) -> Vec<AgentRun> {
        self.list_for_thread(thread_id)
            .into_iter()
            .filter(|run| !run.status.is_terminal())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .runs
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cell(&self, run_id: &RunId) -> Option<RunCell> {
        self.index
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .runs
            .get(run_id)
            .cloned()
    }

    fn transition<F>(&self, run_id: &RunId, to: RunStatus, apply: F) -> Result<AgentRun, LifecycleError>
    where
        F: FnOnce(&mut AgentRun) -> Step,
    {
        let cell = self
            .cell(run_id)
            .ok_or_else(|| LifecycleError::RunNotFound(run_id.clone()))?;

        let mut run = lock_run(&cell);
        let from = run.status;
        match apply(&mut run) {
            Step::Applied => {
                run.revision += 1;
                let snapshot = run.clone();
                self.sink.publish(
                    &snapshot.thread_id,
                    FeedEvent::RunStatusChanged {
                        run: snapshot.clone(),
                    },
                );
                debug!(run_id = %run_id, %from, %to, revision = snapshot.revision, "run transitioned");
                Ok(snapshot)
            }
            Step::Unchanged => Ok(run.clone()),
            Step::Reject => {
                warn!(run_id = %run_id, %from, %to, "rejected run transition");
                Err(LifecycleError::InvalidTransition {
                    run_id: run_id.clone(),
                    from,
                    to,
                })
            }
        }
    }
}

enum Step {
    Applied,
    Unchanged,
    Reject,
}
