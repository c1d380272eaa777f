//! Per-thread SSE feed.
//!
//! GET /threads/{id}/stream
//!
//! Emits `connected`, then one event per hub event named after its `type`
//! (`run_created`, `run_status_changed`, `post_appended`) with the event as
//! JSON data. A subscriber that falls behind is dropped by the hub; the
//! stream then ends with a `resync` event telling the client to reload the
//! thread and poll `/threads/{id}/runs`.

use std::convert::Infallible;

use agentfeed_core::{FeedEvent, Subscription, ThreadId};
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream};
use serde_json::json;
use tokio_stream::StreamExt;
use tracing::debug;

use crate::app::AppState;

pub async fn thread_stream(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let thread_id = ThreadId(id);
    let subscription = state.orchestrator.subscribe(&thread_id);
    debug!(thread_id = %thread_id, "stream opened");

    let connected =
        stream::once(async { Ok::<_, Infallible>(Event::default().event("connected").data("ok")) });

    Sse::new(connected.chain(feed(subscription))).keep_alive(KeepAlive::default())
}

/// Hub events as SSE, closed by `resync` if the hub gave up on us.
fn feed(subscription: Subscription) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(Some(subscription), |state| async move {
        let mut subscription = state?;
        match subscription.recv().await {
            Some(event) => Some((Ok(to_sse(&event)), Some(subscription))),
            None if subscription.was_dropped_for_overflow() => {
                debug!(thread_id = %subscription.thread_id(), "stream fell behind; asking client to resync");
                Some((Ok(resync_event(subscription.thread_id())), None))
            }
            None => None,
        }
    })
}

pub fn to_sse(event: &FeedEvent) -> Event {
    let data = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    Event::default().event(event.kind()).data(data)
}

fn resync_event(thread_id: &ThreadId) -> Event {
    let payload = json!({
        "reason": "overflow",
        "thread_url": format!("/threads/{thread_id}"),
        "runs_url": format!("/threads/{thread_id}/runs"),
    });
    Event::default().event("resync").data(payload.to_string())
}
