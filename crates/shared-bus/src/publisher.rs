//! # Change Publisher
//!
//! Publishing side of the change bus. Store backends publish one
//! [`ChangeEvent`] per successful mutation.

use crate::events::{ChangeEvent, ChangeFilter};
use crate::subscriber::Subscription;
use crate::DEFAULT_CHANNEL_CAPACITY;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Sink for store change notifications.
pub trait ChangePublisher: Send + Sync {
    /// Publish an event, returning how many subscribers received it.
    fn publish(&self, event: ChangeEvent) -> usize;

    /// Total number of events published.
    fn events_published(&self) -> u64;
}

/// In-process change bus.
///
/// Uses `tokio::sync::broadcast` for multi-consumer fan-out. A subscriber that
/// falls more than `capacity` events behind loses the oldest events; feeds
/// recover those records from their prefeed on the next start.
pub struct ChangeBus {
    sender: broadcast::Sender<ChangeEvent>,
    events_published: AtomicU64,
    capacity: usize,
}

impl ChangeBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            events_published: AtomicU64::new(0),
            capacity,
        }
    }

    /// Subscribe to events matching `filter`.
    ///
    /// Only events published after this call are delivered.
    #[must_use]
    pub fn subscribe(&self, filter: ChangeFilter) -> Subscription {
        debug!(
            collection = %filter.collection,
            ops = ?filter.ops,
            "New change subscription"
        );
        Subscription::new(self.sender.subscribe(), filter)
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangePublisher for ChangeBus {
    fn publish(&self, event: ChangeEvent) -> usize {
        let collection = event.collection;
        let op = event.op();
        self.events_published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(event) {
            Ok(receivers) => {
                trace!(%collection, ?op, receivers, "Change published");
                receivers
            }
            // No subscribers is normal: nothing watches this collection yet.
            Err(_) => 0,
        }
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}
