//! Ungrouping: a block becomes one validation job per transaction, each
//! carrying the block context needed to fold the result back.

use shared_types::entities::{BlockId, BlockRecord, Transaction};

/// One transaction of a block under vote.
#[derive(Debug, Clone, PartialEq)]
pub struct Ungrouped {
    pub tx: Transaction,
    pub block_id: BlockId,
    /// Transactions in the block, so the tally knows when it is complete.
    pub total: usize,
}

/// Validation result for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checked {
    pub block_id: BlockId,
    pub total: usize,
    pub valid: bool,
    pub reason: Option<String>,
}

impl Checked {
    /// A whole-block verdict that completes the tally in one step.
    pub fn whole_block(block_id: BlockId, reason: impl Into<String>) -> Self {
        Self {
            block_id,
            total: 1,
            valid: false,
            reason: Some(reason.into()),
        }
    }
}

/// Lazily split `block` into per-transaction jobs.
pub fn ungroup(block: BlockRecord) -> impl Iterator<Item = Ungrouped> {
    let total = block.len();
    let block_id = block.id;
    block
        .block
        .transactions
        .into_iter()
        .map(move |tx| Ungrouped {
            tx,
            block_id: block_id.clone(),
            total,
        })
}
