//! # Block Writer
//!
//! Persists assembled blocks and clears their transactions from the backlog.

use crate::error::Result;
use crate::metrics::BlockPipelineMetrics;
use fc_01_store::{ignore_duplicate, DocumentStore};
use shared_types::entities::{BlockRecord, TxId};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What happened to a block handed to the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    AlreadyPresent,
}

pub struct BlockWriter {
    store: Arc<dyn DocumentStore>,
    metrics: Arc<BlockPipelineMetrics>,
}

impl BlockWriter {
    pub fn new(store: Arc<dyn DocumentStore>, metrics: Arc<BlockPipelineMetrics>) -> Self {
        Self { store, metrics }
    }

    /// Write `block`, then delete its transactions from the backlog.
    ///
    /// A block that already exists counts as written. Backlog deletion
    /// failures are logged and left for the next pass; the validator will
    /// see those transactions as duplicates.
    pub async fn write(&self, block: BlockRecord) -> Result<WriteOutcome> {
        let tx_ids: Vec<TxId> = block.transaction_ids().map(str::to_string).collect();
        let block_id = block.id.clone();
        let block_number = block.block.block_number;

        let outcome = if ignore_duplicate(self.store.put_block(block).await)? {
            self.metrics.record_block_written(tx_ids.len());
            info!(
                block_id = %block_id,
                block_number,
                count = tx_ids.len(),
                "[fc-03] Block written"
            );
            WriteOutcome::Written
        } else {
            self.metrics.record_duplicate_block();
            debug!(block_id = %block_id, "[fc-03] Block already present");
            WriteOutcome::AlreadyPresent
        };

        match self.store.delete_pending(&tx_ids).await {
            Ok(removed) => debug!(block_id = %block_id, removed, "[fc-03] Backlog cleared"),
            Err(e) => warn!(
                block_id = %block_id,
                "[fc-03] Failed to clear backlog for block: {}", e
            ),
        }
        Ok(outcome)
    }
}
