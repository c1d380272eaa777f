//! Concurrency ceiling and per-run isolation.

mod common;

use std::sync::Arc;
use std::time::Duration;

use agentfeed_core::{FailureCause, FeedEvent, OrchestratorConfig, RunStatus};
use common::{drain, Harness, Script, ScriptedExecutor, StallingStore};

const AGENTS: [&str; 6] = ["a1", "a2", "a3", "a4", "a5", "a6"];

fn ceiling(n: usize) -> OrchestratorConfig {
    OrchestratorConfig::default().with_max_concurrent_runs(n)
}

/// Replays run events and returns the highest number of runs that were
/// `running` at the same time.
fn peak_running(events: &[FeedEvent]) -> usize {
    let mut running = 0usize;
    let mut peak = 0usize;
    for event in events {
        if let FeedEvent::RunStatusChanged { run } = event {
            match run.status {
                RunStatus::Running => {
                    running += 1;
                    peak = peak.max(running);
                }
                RunStatus::Done | RunStatus::Error => running -= 1,
                RunStatus::Queued => {}
            }
        }
    }
    peak
}

#[tokio::test(start_paused = true)]
async fn ceiling_bounds_running_runs() {
    let executor = ScriptedExecutor::new().with_delay(Duration::from_millis(100));
    let h = Harness::with_config(&AGENTS, executor, ceiling(2));
    let post = h.post("@a1 @a2 @a3 @a4 @a5 @a6").await;
    let mut feed = h.orchestrator.subscribe(&post.thread_id);

    let submission = h.orchestrator.submit(&post).await;
    assert_eq!(submission.runs.len(), 6);

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(h.orchestrator.runs_in_flight(), 2);
    let active = h.orchestrator.active_runs(&post.thread_id);
    assert_eq!(active.iter().filter(|r| r.status == RunStatus::Running).count(), 2);
    assert_eq!(active.iter().filter(|r| r.status == RunStatus::Queued).count(), 4);

    let finished = submission.handle.join().await;
    assert!(finished.iter().all(|r| r.status == RunStatus::Done));
    assert_eq!(h.executor.peak_concurrency(), 2);
    assert_eq!(peak_running(&drain(&mut feed)), 2);
    assert_eq!(h.orchestrator.runs_in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn ceiling_is_process_wide_across_posts() {
    let executor = ScriptedExecutor::new().with_delay(Duration::from_millis(100));
    let h = Harness::with_config(&AGENTS, executor, ceiling(2));

    let first = h.post("@a1 @a2 @a3").await;
    let second = h.post("@a4 @a5 @a6").await;

    let one = h.orchestrator.submit(&first).await;
    let two = h.orchestrator.submit(&second).await;

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(h.orchestrator.runs_in_flight(), 2);

    let mut finished = one.handle.join().await;
    finished.extend(two.handle.join().await);

    assert_eq!(finished.len(), 6);
    assert_eq!(h.executor.peak_concurrency(), 2);
}

#[tokio::test]
async fn ceiling_of_one_serialises_runs() {
    let executor = ScriptedExecutor::new().with_delay(Duration::from_millis(5));
    let h = Harness::with_config(&AGENTS[..3], executor, ceiling(1));
    let post = h.post("@a1 @a2 @a3").await;

    let finished = h.orchestrator.submit(&post).await.handle.join().await;

    assert_eq!(finished.len(), 3);
    assert_eq!(h.executor.peak_concurrency(), 1);
}

#[tokio::test(start_paused = true)]
async fn slow_run_does_not_hold_back_siblings() {
    let executor = ScriptedExecutor::new()
        .with("a1", Script::Slow(Duration::from_secs(20), "late".into()));
    let h = Harness::with_config(&AGENTS[..3], executor, ceiling(4));
    let post = h.post("@a1 @a2 @a3").await;

    let submission = h.orchestrator.submit(&post).await;
    tokio::time::sleep(Duration::from_secs(1)).await;

    let runs = h.orchestrator.list_runs(&post.thread_id);
    let status_of = |handle: &str| {
        runs.iter()
            .find(|r| r.agent_handle.as_str() == handle)
            .map(|r| r.status)
    };
    assert_eq!(status_of("a1"), Some(RunStatus::Running));
    assert_eq!(status_of("a2"), Some(RunStatus::Done));
    assert_eq!(status_of("a3"), Some(RunStatus::Done));

    let finished = submission.handle.join().await;
    assert!(finished.iter().all(|r| r.status == RunStatus::Done));
}

#[tokio::test(start_paused = true)]
async fn timeout_releases_the_slot() {
    let executor = ScriptedExecutor::new()
        .with("a1", Script::Slow(Duration::from_secs(600), "never".into()));
    let config = ceiling(1).with_run_timeout(Duration::from_secs(2));
    let h = Harness::with_config(&AGENTS[..2], executor, config);
    let post = h.post("@a1 @a2").await;

    let finished = h.orchestrator.submit(&post).await.handle.join().await;

    assert_eq!(finished[0].status, RunStatus::Error);
    assert_eq!(finished[1].status, RunStatus::Done);
    assert_eq!(h.orchestrator.runs_in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn unanswered_append_times_out_and_frees_the_slot() {
    let store = Arc::new(StallingStore::new().hanging_appends(&["a1"]));
    let config = ceiling(1).with_run_timeout(Duration::from_secs(2));
    let h = Harness::with_store(&AGENTS[..2], ScriptedExecutor::new(), store, config);
    let post = h.post("@a1 @a2").await;

    let submission = h.orchestrator.submit(&post).await;
    tokio::time::sleep(Duration::from_secs(3600)).await;

    let runs = h.orchestrator.list_runs(&post.thread_id);
    assert_eq!(runs[0].status, RunStatus::Error);
    assert_eq!(
        runs[0].error_detail.as_ref().unwrap().cause,
        FailureCause::Timeout
    );
    assert!(runs[0].output_post_id.is_none());
    assert_eq!(runs[1].status, RunStatus::Done);
    assert!(h.orchestrator.active_runs(&post.thread_id).is_empty());
    assert_eq!(h.orchestrator.runs_in_flight(), 0);

    let finished = submission.handle.join().await;
    assert_eq!(finished.len(), 2);
    let thread = h.store.get_thread(&post.thread_id).await.unwrap();
    assert_eq!(thread.replies.len(), 1);
    assert_eq!(thread.replies[0].author_handle, "a2");
}

#[tokio::test(start_paused = true)]
async fn executor_and_append_share_one_deadline() {
    // 1.5s in the executor leaves 0.5s for an append that never comes
    let executor =
        ScriptedExecutor::new().with("a1", Script::Slow(Duration::from_millis(1500), "ok".into()));
    let store = Arc::new(StallingStore::new().hanging_appends(&["a1"]));
    let config = ceiling(1).with_run_timeout(Duration::from_secs(2));
    let h = Harness::with_store(&AGENTS[..1], executor, store, config);
    let post = h.post("@a1").await;

    let started = tokio::time::Instant::now();
    let finished = h.orchestrator.submit(&post).await.handle.join().await;

    assert_eq!(finished[0].status, RunStatus::Error);
    assert_eq!(
        finished[0].error_detail.as_ref().unwrap().cause,
        FailureCause::Timeout
    );
    assert!(started.elapsed() < Duration::from_millis(2100));
}
