//! Metrics collection for transaction validation

use crate::domain::errors::RejectionKind;
use std::sync::atomic::{AtomicU64, Ordering};

/// Validation counters, shared by every worker of a stage.
#[derive(Debug, Default)]
pub struct ValidationMetrics {
    /// Transactions that passed
    pub accepted: AtomicU64,

    /// Rejections, indexed by [`RejectionKind`]
    rejected: [AtomicU64; RejectionKind::ALL.len()],
}

/// Point-in-time copy of [`ValidationMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationSnapshot {
    pub accepted: u64,
    pub rejected: Vec<(RejectionKind, u64)>,
}

impl ValidationSnapshot {
    pub fn rejected_total(&self) -> u64 {
        self.rejected.iter().map(|(_, n)| n).sum()
    }

    pub fn rejected(&self, kind: RejectionKind) -> u64 {
        self.rejected
            .iter()
            .find(|(k, _)| *k == kind)
            .map_or(0, |(_, n)| *n)
    }
}

impl ValidationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self, kind: RejectionKind) {
        self.rejected[kind.index()].fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_accepted(&self) -> u64 {
        self.accepted.load(Ordering::Relaxed)
    }

    pub fn get_rejected(&self, kind: RejectionKind) -> u64 {
        self.rejected[kind.index()].load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> ValidationSnapshot {
        ValidationSnapshot {
            accepted: self.get_accepted(),
            rejected: RejectionKind::ALL
                .iter()
                .map(|k| (*k, self.get_rejected(*k)))
                .collect(),
        }
    }
}
