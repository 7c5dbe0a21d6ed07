//! Vote writer: persists votes, treating an existing (block, node) vote as
//! already cast.

use crate::metrics::VotePipelineMetrics;
use fc_01_store::{ignore_duplicate, DocumentStore};
use fc_03_block_pipeline::Result;
use shared_types::entities::VoteRecord;
use std::sync::Arc;
use tracing::{debug, info};

pub struct VoteWriter {
    store: Arc<dyn DocumentStore>,
    metrics: Arc<VotePipelineMetrics>,
}

impl VoteWriter {
    pub fn new(store: Arc<dyn DocumentStore>, metrics: Arc<VotePipelineMetrics>) -> Self {
        Self { store, metrics }
    }

    /// Returns whether the vote was newly written.
    pub async fn write(&self, vote: VoteRecord) -> Result<bool> {
        let block_id = vote.vote.voting_for_block.clone();
        let valid = vote.vote.is_block_valid;

        let written = ignore_duplicate(self.store.put_vote(vote).await)?;
        if written {
            self.metrics.record_vote(valid);
            info!(block_id = %block_id, valid, "[fc-04] Vote cast");
        } else {
            self.metrics.record_duplicate_vote();
            debug!(block_id = %block_id, "[fc-04] Vote already recorded");
        }
        Ok(written)
    }
}
