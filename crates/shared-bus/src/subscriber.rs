//! # Change Subscription
//!
//! Receiving side of the change bus.

use crate::events::{ChangeEvent, ChangeFilter};
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

/// A live subscription to one collection.
pub struct Subscription {
    id: Uuid,
    receiver: broadcast::Receiver<ChangeEvent>,
    filter: ChangeFilter,
}

impl Subscription {
    pub(crate) fn new(receiver: broadcast::Receiver<ChangeEvent>, filter: ChangeFilter) -> Self {
        Self {
            id: Uuid::new_v4(),
            receiver,
            filter,
        }
    }

    /// Receive the next matching event.
    ///
    /// # Returns
    ///
    /// - `Some(event)` - The next matching event
    /// - `None` - The bus was dropped
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        loop {
            let event = match self.receiver.recv().await {
                Ok(e) => e,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(
                        subscription = %self.id,
                        collection = %self.filter.collection,
                        lagged = count,
                        "Change subscriber lagged, events dropped"
                    );
                    continue;
                }
            };

            if self.filter.matches(&event) {
                return Some(event);
            }
        }
    }

    #[must_use]
    pub fn filter(&self) -> &ChangeFilter {
        &self.filter
    }

}

impl Drop for Subscription {
    fn drop(&mut self) {
        debug!(subscription = %self.id, collection = %self.filter.collection, "Subscription dropped");
    }
}
