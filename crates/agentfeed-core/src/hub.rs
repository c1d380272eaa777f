//! Per-thread publish/subscribe for live run events.
//!
//! Every subscriber owns a bounded queue. Publishing is a non-blocking
//! `try_send` into each queue of the thread; a subscriber whose queue is
//! full is dropped on the spot (its feed ends after the buffered events) and
//! is expected to re-fetch the thread instead.
//!
//! # Usage
//!
//! ```ignore
//! let hub = EventHub::new(64);
//! let mut feed = hub.subscribe(&thread_id);
//! while let Some(event) = feed.recv().await { ... }
//! if feed.was_dropped_for_overflow() { /* tell the client to poll */ }
//! ```

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::task::{Context, Poll};

use feed_state::ThreadId;
use futures::Stream;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::trace;

use crate::domain::{EventSink, FeedEvent};
use crate::metrics::METRICS;
use crate::obs;

struct Slot {
    id: u64,
    tx: mpsc::Sender<FeedEvent>,
    overflowed: Arc<AtomicBool>,
}

struct HubInner {
    capacity: usize,
    next_id: AtomicU64,
    threads: Mutex<HashMap<ThreadId, Vec<Slot>>>,
}

impl HubInner {
    fn unsubscribe(&self, thread_id: &ThreadId, id: u64) {
        let mut threads = self.threads.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slots) = threads.get_mut(thread_id) {
            slots.retain(|slot| slot.id != id);
            if slots.is_empty() {
                threads.remove(thread_id);
            }
        }
    }
}

/// Thread-keyed fan-out registry. Cheap to clone.
#[derive(Clone)]
pub struct EventHub {
    inner: Arc<HubInner>,
}

impl EventHub {
    /// `capacity` is the per-subscriber queue bound (minimum 1).
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(HubInner {
                capacity: capacity.max(1),
                next_id: AtomicU64::new(0),
                threads: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Open a live feed for `thread_id`. Dropping it unsubscribes.
    pub fn subscribe(&self, thread_id: &ThreadId) -> Subscription {
        let (tx, rx) = mpsc::channel(self.inner.capacity);
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let overflowed = Arc::new(AtomicBool::new(false));

        self.inner
            .threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(thread_id.clone())
            .or_default()
            .push(Slot {
                id,
                tx,
                overflowed: Arc::clone(&overflowed),
            });

        trace!(thread_id = %thread_id, subscriber = id, "subscriber attached");
        Subscription {
            thread_id: thread_id.clone(),
            id,
            rx,
            overflowed,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver `event` to every current subscriber of `thread_id`.
    ///
    /// Never blocks and never fails. Full subscribers are dropped.
    pub fn publish(&self, thread_id: &ThreadId, event: FeedEvent) {
        METRICS.inc_events_published();

        let mut threads = self
            .inner
            .threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(slots) = threads.get_mut(thread_id) else {
            return;
        };

        let capacity = self.inner.capacity;
        slots.retain(|slot| match slot.tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                slot.overflowed.store(true, Ordering::Release);
                METRICS.inc_subscribers_dropped();
                obs::emit_subscriber_dropped(thread_id.as_str(), capacity);
                false
            }
            Err(TrySendError::Closed(_)) => false,
        });

        if slots.is_empty() {
            threads.remove(thread_id);
        }
    }

    pub fn subscriber_count(&self, thread_id: &ThreadId) -> usize {
        self.inner
            .threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(thread_id)
            .map_or(0, Vec::len)
    }

    /// Number of threads with at least one subscriber.
    pub fn thread_count(&self) -> usize {
        self.inner
            .threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(64)
    }
}

impl EventSink for EventHub {
    fn publish(&self, thread_id: &ThreadId, event: FeedEvent) {
        EventHub::publish(self, thread_id, event);
    }
}

/// A live, cancellable feed of one thread's events.
pub struct Subscription {
    thread_id: ThreadId,
    id: u64,
    rx: mpsc::Receiver<FeedEvent>,
    overflowed: Arc<AtomicBool>,
    hub: Weak<HubInner>,
}

impl Subscription {
    pub fn thread_id(&self) -> &ThreadId {
        &self.thread_id
    }

    /// Next event, or `None` once the feed is closed.
    pub async fn recv(&mut self) -> Option<FeedEvent> {
        self.rx.recv().await
    }

    /// Next event if one is already buffered.
    pub fn try_recv(&mut self) -> Option<FeedEvent> {
        self.rx.try_recv().ok()
    }

    /// True if the hub closed this feed because its queue overflowed.
    pub fn was_dropped_for_overflow(&self) -> bool {
        self.overflowed.load(Ordering::Acquire)
    }
}

impl Stream for Subscription {
    type Item = FeedEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.unsubscribe(&self.thread_id, self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RunId;
    use chrono::Utc;
    use feed_state::{AuthorKind, Post, PostId};

    fn thread(name: &str) -> ThreadId {
        ThreadId(name.to_string())
    }

    fn appended(thread_id: &ThreadId, n: usize) -> FeedEvent {
        FeedEvent::PostAppended {
            run_id: RunId(format!("run-{n}")),
            post: Post {
                id: PostId(format!("post-{n}")),
                thread_id: thread_id.clone(),
                parent_id: None,
                author_kind: AuthorKind::Agent,
                author_handle: "grok".to_string(),
                text: format!("reply {n}"),
                created_at: Utc::now(),
            },
        }
    }

    #[tokio::test]
    async fn test_publish_subscribe_roundtrip() {
        let hub = EventHub::new(8);
        let t = thread("t1");
        let mut feed = hub.subscribe(&t);

        hub.publish(&t, appended(&t, 1));
        let got = feed.recv().await.unwrap();
        assert_eq!(got.run_id().as_str(), "run-1");
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let hub = EventHub::new(8);
        let t = thread("nobody");
        hub.publish(&t, appended(&t, 1));
        assert_eq!(hub.subscriber_count(&t), 0);
        assert_eq!(hub.thread_count(), 0);
    }

    #[tokio::test]
    async fn test_threads_are_isolated() {
        let hub = EventHub::new(8);
        let a = thread("a");
        let b = thread("b");
        let mut feed_a = hub.subscribe(&a);
        let mut feed_b = hub.subscribe(&b);

        hub.publish(&a, appended(&a, 1));

        assert!(feed_a.try_recv().is_some());
        assert!(feed_b.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_multiple_subscribers_each_get_every_event() {
        let hub = EventHub::new(8);
        let t = thread("t");
        let mut one = hub.subscribe(&t);
        let mut two = hub.subscribe(&t);

        for n in 0..3 {
            hub.publish(&t, appended(&t, n));
        }

        for feed in [&mut one, &mut two] {
            let ids: Vec<String> = (0..3)
                .map(|_| feed.try_recv().unwrap().run_id().to_string())
                .collect();
            assert_eq!(ids, vec!["run-0", "run-1", "run-2"]);
        }
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let hub = EventHub::new(8);
        let t = thread("t");
        let feed = hub.subscribe(&t);
        assert_eq!(hub.subscriber_count(&t), 1);

        drop(feed);
        assert_eq!(hub.subscriber_count(&t), 0);
        assert_eq!(hub.thread_count(), 0);
    }

    #[tokio::test]
    async fn test_overflow_drops_only_the_slow_subscriber() {
        let hub = EventHub::new(2);
        let t = thread("t");
        let mut slow = hub.subscribe(&t);
        let mut fast = hub.subscribe(&t);

        hub.publish(&t, appended(&t, 0));
        hub.publish(&t, appended(&t, 1));
        assert!(fast.try_recv().is_some());
        assert!(fast.try_recv().is_some());

        // slow still holds two unread events; the third overflows it
        hub.publish(&t, appended(&t, 2));
        assert_eq!(hub.subscriber_count(&t), 1);
        assert!(fast.try_recv().is_some());
        assert!(!fast.was_dropped_for_overflow());

        assert!(slow.was_dropped_for_overflow());
        assert!(slow.recv().await.is_some());
        assert!(slow.recv().await.is_some());
        assert!(slow.recv().await.is_none());
    }
}
