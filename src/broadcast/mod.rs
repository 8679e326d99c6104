//! Decision fan-out
//!
//! Pushes completed decisions to subscribers over bounded channels without
//! ever blocking the decision path. A subscriber that cannot keep up or has
//! gone away is dropped, not waited on.

use crate::decision::Decision;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Anything that accepts published decisions
pub trait DecisionPublisher: Send + Sync {
    fn publish(&self, decision: &Decision);
}

/// Subscriber role, used for reporting and log context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriberClass {
    Dashboard,
    Execution,
}

struct Subscriber {
    id: Uuid,
    class: SubscriberClass,
    tx: mpsc::Sender<Decision>,
}

/// Fan-out statistics
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BroadcastStats {
    pub published: u64,
    pub dropped_subscribers: u64,
}

/// Bounded fan-out over per-subscriber channels.
///
/// `publish` uses `try_send` only: a full or closed channel removes the
/// subscriber. The publisher never applies backpressure to the caller.
pub struct Broadcaster {
    queue_capacity: usize,
    subscribers: RwLock<Vec<Subscriber>>,
    published: AtomicU64,
    dropped: AtomicU64,
}

impl Broadcaster {
    pub fn new(queue_capacity: usize) -> Self {
        Self {
            queue_capacity,
            subscribers: RwLock::new(Vec::new()),
            published: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Register a subscriber and return its id plus the receiving end
    pub fn subscribe(&self, class: SubscriberClass) -> (Uuid, mpsc::Receiver<Decision>) {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let id = Uuid::new_v4();
        if let Ok(mut subs) = self.subscribers.write() {
            subs.push(Subscriber { id, class, tx });
            tracing::info!(%id, ?class, total = subs.len(), "Subscriber registered");
        }
        (id, rx)
    }

    /// Remove a subscriber by id. Unknown ids are a no-op.
    pub fn unsubscribe(&self, id: Uuid) {
        if let Ok(mut subs) = self.subscribers.write() {
            let before = subs.len();
            subs.retain(|s| s.id != id);
            if subs.len() < before {
                tracing::info!(%id, "Subscriber removed");
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn stats(&self) -> BroadcastStats {
        BroadcastStats {
            published: self.published.load(Ordering::Relaxed),
            dropped_subscribers: self.dropped.load(Ordering::Relaxed),
        }
    }
}

impl DecisionPublisher for Broadcaster {
    fn publish(&self, decision: &Decision) {
        self.published.fetch_add(1, Ordering::Relaxed);
        let Ok(mut subs) = self.subscribers.write() else {
            return;
        };
        subs.retain(|sub| match sub.tx.try_send(decision.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(id = %sub.id, class = ?sub.class, "Subscriber queue full, dropping subscriber");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(id = %sub.id, class = ?sub.class, "Subscriber gone, dropping subscriber");
                false
            }
        });
        metrics::counter!("guardian_decisions_published_total").increment(1);
        metrics::gauge!("guardian_subscribers").set(subs.len() as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::Decision;
    use chrono::Utc;

    fn decision() -> Decision {
        Decision::no_trade("NQ", Utc::now(), vec!["test".to_string()])
    }

    #[tokio::test]
    async fn test_publish_reaches_all_subscribers() {
        let b = Broadcaster::new(8);
        let (_, mut dash) = b.subscribe(SubscriberClass::Dashboard);
        let (_, mut exec) = b.subscribe(SubscriberClass::Execution);

        let d = decision();
        b.publish(&d);

        assert_eq!(dash.recv().await.unwrap().id, d.id);
        assert_eq!(exec.recv().await.unwrap().id, d.id);
    }

    #[tokio::test]
    async fn test_full_queue_drops_subscriber_not_publisher() {
        let b = Broadcaster::new(1);
        let (_, mut slow_rx) = b.subscribe(SubscriberClass::Dashboard);
        let (_, mut ok_rx) = b.subscribe(SubscriberClass::Execution);

        b.publish(&decision());
        // Slow subscriber never drains; second publish overflows its queue
        b.publish(&decision());

        assert_eq!(b.subscriber_count(), 1);
        assert_eq!(b.stats().dropped_subscribers, 1);

        // Healthy subscriber got both
        assert!(ok_rx.recv().await.is_some());
        assert!(ok_rx.recv().await.is_some());
        // Slow one still holds its first message
        assert!(slow_rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_closed_receiver_is_removed() {
        let b = Broadcaster::new(4);
        let (_, rx) = b.subscribe(SubscriberClass::Dashboard);
        drop(rx);
        b.publish(&decision());
        assert_eq!(b.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let b = Broadcaster::new(4);
        let (id, _rx) = b.subscribe(SubscriberClass::Dashboard);
        assert_eq!(b.subscriber_count(), 1);
        b.unsubscribe(id);
        assert_eq!(b.subscriber_count(), 0);
    }

    #[test]
    fn test_publish_with_no_subscribers() {
        let b = Broadcaster::new(4);
        b.publish(&decision());
        assert_eq!(b.stats().published, 1);
    }
}
