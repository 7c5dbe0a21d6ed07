//! Metrics collection for the watchers

use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct WatcherMetrics {
    /// Deleted blocks written back
    pub reverts: AtomicU64,

    /// Stale backlog records moved to another node
    pub reassignments: AtomicU64,

    /// Blocks whose election concluded invalid
    pub invalid_blocks: AtomicU64,

    /// Transactions put back into the backlog from invalid blocks
    pub requeues: AtomicU64,
}

/// Point-in-time copy of [`WatcherMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatcherSnapshot {
    pub reverts: u64,
    pub reassignments: u64,
    pub invalid_blocks: u64,
    pub requeues: u64,
}

impl WatcherMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_revert(&self) {
        self.reverts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reassignments(&self, count: usize) {
        self.reassignments
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_invalid_block(&self, requeued: usize) {
        self.invalid_blocks.fetch_add(1, Ordering::Relaxed);
        self.requeues.fetch_add(requeued as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> WatcherSnapshot {
        WatcherSnapshot {
            reverts: self.reverts.load(Ordering::Relaxed),
            reassignments: self.reassignments.load(Ordering::Relaxed),
            invalid_blocks: self.invalid_blocks.load(Ordering::Relaxed),
            requeues: self.requeues.load(Ordering::Relaxed),
        }
    }
}
