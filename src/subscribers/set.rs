//! # SubscriberSet: fan-out of lifecycle events
//!
//! [`SubscriberSet`] hands each [`Event`] to every subscriber's own queue and
//! returns without waiting for any of them.
//!
//! ```text
//!    emit(&Event) ──► Arc<Event>
//!        ├──► [queue "log"]     ─► worker ─► on_event()
//!        └──► [queue "metrics"] ─► worker ─► on_event()
//! ```
//!
//! - Order is FIFO per subscriber; there is no order across subscribers.
//! - A full or closed queue drops the event for that subscriber only and bumps
//!   its drop counter (see [`SubscriberSet::dropped`]).
//! - A panicking `on_event` is caught; the worker keeps going with the next event.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::Event;

use super::Subscribe;

/// Sending side of one subscriber's queue.
struct Queue {
    name: &'static str,
    tx: mpsc::Sender<Arc<Event>>,
    dropped: AtomicU64,
}

/// Per-subscriber bounded queues and their worker tasks.
pub struct SubscriberSet {
    queues: Vec<Queue>,
    workers: Vec<JoinHandle<()>>,
}

impl SubscriberSet {
    /// Spawns one worker per subscriber.
    ///
    /// Must be called within a tokio runtime unless `subs` is empty.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>) -> Self {
        let (queues, workers) = subs
            .into_iter()
            .map(|sub| {
                let (tx, rx) = mpsc::channel(sub.queue_capacity().max(1));
                let queue = Queue {
                    name: sub.name(),
                    tx,
                    dropped: AtomicU64::new(0),
                };
                (queue, tokio::spawn(work(sub, rx)))
            })
            .unzip();
        Self { queues, workers }
    }

    /// Queues `event` for every subscriber without waiting.
    pub fn emit(&self, event: &Event) {
        let ev = Arc::new(event.clone());
        for q in &self.queues {
            if let Err(e) = q.tx.try_send(Arc::clone(&ev)) {
                let why = match e {
                    mpsc::error::TrySendError::Full(_) => "queue full",
                    mpsc::error::TrySendError::Closed(_) => "worker gone",
                };
                q.dropped.fetch_add(1, Ordering::Relaxed);
                eprintln!("[jobvisor] subscriber '{}' dropped event: {why}", q.name);
            }
        }
    }

    /// Number of events dropped so far for the subscriber called `name`.
    pub fn dropped(&self, name: &str) -> Option<u64> {
        self.queues
            .iter()
            .find(|q| q.name == name)
            .map(|q| q.dropped.load(Ordering::Relaxed))
    }

    /// Closes every queue and waits until the workers have drained them.
    pub async fn shutdown(self) {
        drop(self.queues);
        for w in self.workers {
            let _ = w.await;
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queues.len()
    }
}

async fn work(sub: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<Event>>) {
    while let Some(ev) = rx.recv().await {
        let handled = std::panic::AssertUnwindSafe(sub.on_event(&ev))
            .catch_unwind()
            .await;
        if handled.is_err() {
            eprintln!(
                "[jobvisor] subscriber '{}' panicked on {:?}",
                sub.name(),
                ev.kind
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tokio::sync::Semaphore;

    #[derive(Default)]
    struct Recorder {
        kinds: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, event: &Event) {
            self.kinds.lock().unwrap().push(event.kind);
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    struct Panicker;

    #[async_trait]
    impl Subscribe for Panicker {
        async fn on_event(&self, _event: &Event) {
            panic!("subscriber bug");
        }
    }

    /// Blocks on its first event until a permit is added.
    struct Stalled {
        gate: Arc<Semaphore>,
    }

    #[async_trait]
    impl Subscribe for Stalled {
        async fn on_event(&self, _event: &Event) {
            let _ = self.gate.acquire().await;
        }

        fn name(&self) -> &'static str {
            "stalled"
        }

        fn queue_capacity(&self) -> usize {
            1
        }
    }

    #[tokio::test]
    async fn test_fan_out_keeps_order_and_isolates_panics() {
        let rec = Arc::new(Recorder::default());
        let set = SubscriberSet::new(vec![rec.clone() as Arc<dyn Subscribe>, Arc::new(Panicker)]);
        assert_eq!(set.len(), 2);

        set.emit(&Event::new(EventKind::JobStarting));
        set.emit(&Event::new(EventKind::CloseRequested));
        set.emit(&Event::new(EventKind::CloseAcknowledged));
        set.shutdown().await;

        assert_eq!(
            *rec.kinds.lock().unwrap(),
            vec![
                EventKind::JobStarting,
                EventKind::CloseRequested,
                EventKind::CloseAcknowledged
            ]
        );
    }

    #[tokio::test]
    async fn test_overflow_counts_drops() {
        let gate = Arc::new(Semaphore::new(0));
        let set = SubscriberSet::new(vec![Arc::new(Stalled {
            gate: Arc::clone(&gate),
        }) as Arc<dyn Subscribe>]);

        // first event is taken by the worker, second fills the queue
        set.emit(&Event::new(EventKind::JobStarting));
        tokio::task::yield_now().await;
        set.emit(&Event::new(EventKind::RunStopped));
        set.emit(&Event::new(EventKind::CloseRequested));
        set.emit(&Event::new(EventKind::CloseAcknowledged));

        assert_eq!(set.dropped("stalled"), Some(2));
        assert_eq!(set.dropped("missing"), None);

        gate.add_permits(16);
        set.shutdown().await;
    }

    #[tokio::test]
    async fn test_empty_set() {
        let set = SubscriberSet::new(Vec::new());
        assert!(set.is_empty());
        set.emit(&Event::new(EventKind::RunStopped));
    }
}
