//! Metrics collection for the block pipeline

use fc_02_validation::{ValidationMetrics, ValidationSnapshot};
use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector for block production
#[derive(Debug, Default)]
pub struct BlockPipelineMetrics {
    /// Validation outcomes for backlog transactions
    pub validation: ValidationMetrics,

    /// Blocks persisted by this node
    pub blocks_written: AtomicU64,

    /// Blocks found already persisted
    pub duplicate_blocks: AtomicU64,

    /// Transactions carried by persisted blocks
    pub transactions_written: AtomicU64,

    /// Rejected transactions removed from the backlog
    pub rejected_removed: AtomicU64,
}

/// Point-in-time copy of [`BlockPipelineMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockPipelineSnapshot {
    pub validation: ValidationSnapshot,
    pub blocks_written: u64,
    pub duplicate_blocks: u64,
    pub transactions_written: u64,
    pub rejected_removed: u64,
}

impl BlockPipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a persisted block
    pub fn record_block_written(&self, tx_count: usize) {
        self.blocks_written.fetch_add(1, Ordering::Relaxed);
        self.transactions_written
            .fetch_add(tx_count as u64, Ordering::Relaxed);
    }

    pub fn record_duplicate_block(&self) {
        self.duplicate_blocks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_removed(&self, count: usize) {
        self.rejected_removed
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn get_blocks_written(&self) -> u64 {
        self.blocks_written.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> BlockPipelineSnapshot {
        BlockPipelineSnapshot {
            validation: self.validation.snapshot(),
            blocks_written: self.blocks_written.load(Ordering::Relaxed),
            duplicate_blocks: self.duplicate_blocks.load(Ordering::Relaxed),
            transactions_written: self.transactions_written.load(Ordering::Relaxed),
            rejected_removed: self.rejected_removed.load(Ordering::Relaxed),
        }
    }
}
