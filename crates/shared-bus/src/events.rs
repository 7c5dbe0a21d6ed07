//! # Change Events
//!
//! Every successful store mutation is published as a [`ChangeEvent`]:
//!
//! | Operation | `old_val` | `new_val` |
//! |-----------|-----------|-----------|
//! | insert    | `None`    | `Some`    |
//! | delete    | `Some`    | `None`    |
//! | update    | `Some`    | `Some`    |

use serde::{Deserialize, Serialize};
use shared_types::entities::Document;
use std::fmt;

/// Store collections that emit change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    /// Pending transactions awaiting a block.
    Backlog,
    /// Written blocks.
    Bigchain,
    /// Votes on blocks.
    Votes,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Collection::Backlog, Collection::Bigchain, Collection::Votes];

    pub fn name(self) -> &'static str {
        match self {
            Collection::Backlog => "backlog",
            Collection::Bigchain => "bigchain",
            Collection::Votes => "votes",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of mutation carried by a change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    Insert,
    Delete,
    Update,
}

/// A single document mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub collection: Collection,
    pub old_val: Option<Document>,
    pub new_val: Option<Document>,
}

impl ChangeEvent {
    pub fn insert(collection: Collection, doc: Document) -> Self {
        Self {
            collection,
            old_val: None,
            new_val: Some(doc),
        }
    }

    pub fn delete(collection: Collection, doc: Document) -> Self {
        Self {
            collection,
            old_val: Some(doc),
            new_val: None,
        }
    }

    pub fn update(collection: Collection, old: Document, new: Document) -> Self {
        Self {
            collection,
            old_val: Some(old),
            new_val: Some(new),
        }
    }

    /// Operation implied by which sides are present.
    ///
    /// An event with neither side is treated as an update and never matches
    /// insert or delete filters.
    pub fn op(&self) -> ChangeOp {
        match (&self.old_val, &self.new_val) {
            (None, Some(_)) => ChangeOp::Insert,
            (Some(_), None) => ChangeOp::Delete,
            _ => ChangeOp::Update,
        }
    }
}

/// Filter over collection and operation kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeFilter {
    pub collection: Collection,
    pub ops: Vec<ChangeOp>,
}

impl ChangeFilter {
    pub fn new(collection: Collection, ops: impl Into<Vec<ChangeOp>>) -> Self {
        Self {
            collection,
            ops: ops.into(),
        }
    }

    pub fn inserts(collection: Collection) -> Self {
        Self::new(collection, vec![ChangeOp::Insert])
    }

    pub fn deletes(collection: Collection) -> Self {
        Self::new(collection, vec![ChangeOp::Delete])
    }

    #[must_use]
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        event.collection == self.collection && self.ops.contains(&event.op())
    }
}
