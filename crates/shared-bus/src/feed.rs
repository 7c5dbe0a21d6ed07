//! # Change Feed
//!
//! A pull interface that first drains a snapshot of existing records (the
//! prefeed) and then follows live change events.
//!
//! ```text
//!   prefeed: [r1, r2, r3]          live subscription
//!        │                                │
//!        └──► next() ─► r1, r2, r3 ──► e1, e2, ... (blocks)
//! ```
//!
//! Delivery is at-least-once: the subscription is opened before the snapshot
//! is read, so a record written in between can appear in both.

use crate::events::{ChangeEvent, ChangeOp};
use crate::subscriber::Subscription;
use shared_types::entities::Document;
use std::collections::VecDeque;

/// A record produced by the feed.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedItem {
    /// Prefeed record, inserted record, or last known state of a deleted record.
    Record(Document),
    /// Both sides of an update.
    Changed { old: Document, new: Document },
}

impl FeedItem {
    /// Current state of the record: the new side of an update.
    pub fn into_current(self) -> Document {
        match self {
            FeedItem::Record(doc) => doc,
            FeedItem::Changed { new, .. } => new,
        }
    }

    fn from_event(event: ChangeEvent) -> Option<Self> {
        match (event.op(), event.old_val, event.new_val) {
            (ChangeOp::Insert, _, Some(new)) => Some(FeedItem::Record(new)),
            (ChangeOp::Delete, Some(old), _) => Some(FeedItem::Record(old)),
            (ChangeOp::Update, Some(old), Some(new)) => Some(FeedItem::Changed { old, new }),
            _ => None,
        }
    }
}

/// Prefeed-then-live change feed over one collection.
pub struct ChangeFeed {
    prefeed: VecDeque<Document>,
    subscription: Subscription,
}

impl ChangeFeed {
    /// Feed with no snapshot.
    pub fn live(subscription: Subscription) -> Self {
        Self::with_prefeed(subscription, Vec::new())
    }

    /// Feed that yields `prefeed` in order before any live event.
    pub fn with_prefeed(subscription: Subscription, prefeed: Vec<Document>) -> Self {
        Self {
            prefeed: prefeed.into(),
            subscription,
        }
    }

    /// Records left in the snapshot.
    pub fn prefeed_remaining(&self) -> usize {
        self.prefeed.len()
    }

    /// Next record, blocking on the live subscription once the prefeed is empty.
    ///
    /// Returns `None` when the underlying bus is gone.
    pub async fn next(&mut self) -> Option<FeedItem> {
        if let Some(doc) = self.prefeed.pop_front() {
            return Some(FeedItem::Record(doc));
        }
        loop {
            let event = self.subscription.recv().await?;
            if let Some(item) = FeedItem::from_event(event) {
                return Some(item);
            }
        }
    }
}
