//! Subscription fan-out.
//!
//! The broadcaster keeps a registry of live subscribers, indexed by stream
//! name so additional streams can share it later. Each subscriber is a
//! bounded queue drained by its own socket-writer task; a full queue means
//! the consumer is too slow and it is evicted rather than stalling the
//! sequencer or its peers.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio::sync::{Mutex, MutexGuard};

/// Stream name for label messages.
pub const LABELS_STREAM: &str = "labels";

/// Frames buffered per subscriber before eviction.
pub const SUBSCRIBER_QUEUE: usize = 512;

struct Subscriber {
    id: u64,
    tx: mpsc::Sender<Vec<u8>>,
}

/// The live subscriber set. Only ever touched through the broadcaster's
/// mutex; the same mutex is what serializes appends with enqueues.
#[derive(Default)]
pub struct Registry {
    streams: HashMap<String, Vec<Subscriber>>,
    next_id: u64,
}

impl Registry {
    /// Register a new subscriber on `stream`. Returns its id and the
    /// receiving end of its frame queue.
    pub fn subscribe(&mut self, stream: &str) -> (u64, mpsc::Receiver<Vec<u8>>) {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_QUEUE);
        self.next_id += 1;
        let id = self.next_id;
        self.streams
            .entry(stream.to_string())
            .or_default()
            .push(Subscriber { id, tx });
        (id, rx)
    }

    /// Remove a subscriber. Dropping its sender ends the writer's queue.
    pub fn unsubscribe(&mut self, stream: &str, id: u64) {
        if let Some(subs) = self.streams.get_mut(stream) {
            subs.retain(|s| s.id != id);
        }
    }

    /// Enqueue an encoded frame to every subscriber of `stream`.
    ///
    /// A subscriber whose queue is full (or whose receiver is gone) is
    /// removed; delivery to the others is unaffected. Per-subscriber order
    /// follows enqueue order, which the caller serializes with appends.
    pub fn publish(&mut self, stream: &str, frame: &[u8]) {
        let Some(subs) = self.streams.get_mut(stream) else {
            return;
        };
        subs.retain(|sub| match sub.tx.try_send(frame.to_vec()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(stream = %stream, subscriber = sub.id, "evicting slow subscriber");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        });
    }

    /// Number of live subscribers on `stream`.
    pub fn len(&self, stream: &str) -> usize {
        self.streams.get(stream).map_or(0, Vec::len)
    }
}

/// Shared handle around the registry.
pub struct Broadcaster {
    registry: Mutex<Registry>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
        }
    }

    /// Lock the registry. The sequencer holds this guard across
    /// append + publish so id order and delivery order cannot diverge, and
    /// joins use it to pair registration with an observed max id.
    pub async fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().await
    }

    /// Remove a subscriber outside the join path.
    pub async fn unsubscribe(&self, stream: &str, id: u64) {
        self.registry.lock().await.unsubscribe(stream, id);
    }

    /// Number of live subscribers on `stream`.
    pub async fn subscriber_count(&self, stream: &str) -> usize {
        self.registry.lock().await.len(stream)
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_reaches_all_subscribers() {
        let broadcaster = Broadcaster::new();
        let (id_a, mut rx_a) = broadcaster.lock().await.subscribe(LABELS_STREAM);
        let (_id_b, mut rx_b) = broadcaster.lock().await.subscribe(LABELS_STREAM);
        assert_ne!(id_a, _id_b);

        broadcaster.lock().await.publish(LABELS_STREAM, b"frame-1");
        assert_eq!(rx_a.recv().await.unwrap(), b"frame-1");
        assert_eq!(rx_b.recv().await.unwrap(), b"frame-1");
    }

    #[tokio::test]
    async fn per_subscriber_order_is_publish_order() {
        let broadcaster = Broadcaster::new();
        let (_id, mut rx) = broadcaster.lock().await.subscribe(LABELS_STREAM);

        for i in 0..10u8 {
            broadcaster.lock().await.publish(LABELS_STREAM, &[i]);
        }
        for i in 0..10u8 {
            assert_eq!(rx.recv().await.unwrap(), vec![i]);
        }
    }

    #[tokio::test]
    async fn slow_subscriber_evicted_without_affecting_peers() {
        let broadcaster = Broadcaster::new();
        let (_slow, slow_rx) = broadcaster.lock().await.subscribe(LABELS_STREAM);
        let (_ok, mut ok_rx) = broadcaster.lock().await.subscribe(LABELS_STREAM);

        // Never drain slow_rx; overflow its queue.
        for i in 0..(SUBSCRIBER_QUEUE + 1) {
            broadcaster
                .lock()
                .await
                .publish(LABELS_STREAM, &(i as u32).to_be_bytes());
        }

        assert_eq!(broadcaster.subscriber_count(LABELS_STREAM).await, 1);

        // The healthy subscriber saw every frame in order.
        let mut ok_rx_frames = 0;
        while let Ok(frame) = ok_rx.try_recv() {
            assert_eq!(frame, (ok_rx_frames as u32).to_be_bytes());
            ok_rx_frames += 1;
        }
        assert_eq!(ok_rx_frames, SUBSCRIBER_QUEUE + 1);

        // The evicted queue still drains what fit, then closes.
        let mut slow_rx = slow_rx;
        let mut drained = 0;
        while slow_rx.try_recv().is_ok() {
            drained += 1;
        }
        assert_eq!(drained, SUBSCRIBER_QUEUE);
        assert!(slow_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn closed_receiver_is_pruned_on_next_publish() {
        let broadcaster = Broadcaster::new();
        let (_id, rx) = broadcaster.lock().await.subscribe(LABELS_STREAM);
        drop(rx);

        broadcaster.lock().await.publish(LABELS_STREAM, b"x");
        assert_eq!(broadcaster.subscriber_count(LABELS_STREAM).await, 0);
    }

    #[tokio::test]
    async fn unsubscribe_removes_only_the_target() {
        let broadcaster = Broadcaster::new();
        let (id_a, _rx_a) = broadcaster.lock().await.subscribe(LABELS_STREAM);
        let (_id_b, _rx_b) = broadcaster.lock().await.subscribe(LABELS_STREAM);

        broadcaster.unsubscribe(LABELS_STREAM, id_a).await;
        assert_eq!(broadcaster.subscriber_count(LABELS_STREAM).await, 1);
    }
}
