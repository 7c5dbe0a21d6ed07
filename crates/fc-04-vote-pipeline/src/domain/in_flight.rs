//! Blocks between the feed and a stored vote.

use parking_lot::Mutex;
use shared_types::entities::BlockId;
use std::collections::HashSet;
use std::sync::Arc;

/// Block ids handed downstream whose vote is not in the store yet.
///
/// The feed claims an id before ungrouping its block and the vote writer
/// releases it once the vote is stored. From then on the store's own
/// `vote_by_node` lookup catches redeliveries, so the set only ever holds
/// blocks still moving through the pipeline.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    ids: Arc<Mutex<HashSet<BlockId>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if `block_id` is already claimed.
    pub fn claim(&self, block_id: &str) -> bool {
        self.ids.lock().insert(block_id.to_string())
    }

    pub fn release(&self, block_id: &str) {
        self.ids.lock().remove(block_id);
    }

    pub fn contains(&self, block_id: &str) -> bool {
        self.ids.lock().contains(block_id)
    }

    /// Drop from `ids` every block that is no longer claimed.
    pub fn retain_claimed(&self, ids: &mut HashSet<BlockId>) {
        let claimed = self.ids.lock();
        ids.retain(|id| claimed.contains(id));
    }

    pub fn len(&self) -> usize {
        self.ids.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
