//! Metrics collection for the vote pipeline

use fc_02_validation::{ValidationMetrics, ValidationSnapshot};
use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics collector for voting
#[derive(Debug, Default)]
pub struct VotePipelineMetrics {
    /// Validation outcomes for transactions inside blocks
    pub validation: ValidationMetrics,

    /// Votes persisted, valid verdict
    pub votes_valid: AtomicU64,

    /// Votes persisted, invalid verdict
    pub votes_invalid: AtomicU64,

    /// Votes found already persisted
    pub duplicate_votes: AtomicU64,

    /// Blocks skipped (already voted, not eligible, genesis)
    pub blocks_skipped: AtomicU64,
}

/// Point-in-time copy of [`VotePipelineMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VotePipelineSnapshot {
    pub validation: ValidationSnapshot,
    pub votes_valid: u64,
    pub votes_invalid: u64,
    pub duplicate_votes: u64,
    pub blocks_skipped: u64,
}

impl VotePipelineSnapshot {
    pub fn votes_cast(&self) -> u64 {
        self.votes_valid + self.votes_invalid
    }
}

impl VotePipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_vote(&self, is_block_valid: bool) {
        let counter = if is_block_valid {
            &self.votes_valid
        } else {
            &self.votes_invalid
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate_vote(&self) {
        self.duplicate_votes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_skipped(&self) {
        self.blocks_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_votes_cast(&self) -> u64 {
        self.votes_valid.load(Ordering::Relaxed) + self.votes_invalid.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> VotePipelineSnapshot {
        VotePipelineSnapshot {
            validation: self.validation.snapshot(),
            votes_valid: self.votes_valid.load(Ordering::Relaxed),
            votes_invalid: self.votes_invalid.load(Ordering::Relaxed),
            duplicate_votes: self.duplicate_votes.load(Ordering::Relaxed),
            blocks_skipped: self.blocks_skipped.load(Ordering::Relaxed),
        }
    }
}
