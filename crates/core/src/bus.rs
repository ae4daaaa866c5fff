//! Best-effort, bounded, many-subscriber event fan-out used by the approval
//! and audit surfaces. See SPEC_FULL.md §4.6.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::mpsc;

const SUBSCRIBER_CAPACITY: usize = 64;

struct Subscriber<E> {
    id: u64,
    tx: mpsc::Sender<E>,
}

/// Single-publisher, many-subscriber fan-out. `publish` never blocks: a
/// subscriber whose channel is full silently drops the event. Persistent
/// delivery is the audit store's job, not the bus's.
pub struct EventBus<E: Clone> {
    subscribers: RwLock<Vec<Subscriber<E>>>,
    next_id: AtomicU64,
}

pub struct Subscription<E> {
    id: u64,
    pub rx: mpsc::Receiver<E>,
}

impl<E: Clone> EventBus<E> {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> Subscription<E> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
        self.subscribers.write().push(Subscriber { id, tx });
        Subscription { id, rx }
    }

    pub fn unsubscribe(&self, subscription: Subscription<E>) {
        self.subscribers.write().retain(|s| s.id != subscription.id);
        drop(subscription);
    }

    /// Iterates subscribers under a read lock; a full channel drops this
    /// event for that subscriber only.
    pub fn publish(&self, event: E) {
        let subscribers = self.subscribers.read();
        for subscriber in subscribers.iter() {
            let _ = subscriber.tx.try_send(event.clone());
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl<E: Clone> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}
