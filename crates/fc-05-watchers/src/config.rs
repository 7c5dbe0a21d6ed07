//! Watcher timing.

use std::time::Duration;

/// Backlog age after which a record is handed to the next node.
pub const DEFAULT_BACKLOG_REASSIGN_DELAY_SECS: u64 = 120;

/// Pause between stale-backlog scans.
pub const DEFAULT_STALE_CHECK_INTERVAL_SECS: u64 = 5;

#[derive(Clone, Debug)]
pub struct WatcherConfig {
    /// Staleness threshold (seconds)
    pub backlog_reassign_delay_secs: u64,

    /// Scan period (seconds)
    pub stale_check_interval_secs: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            backlog_reassign_delay_secs: DEFAULT_BACKLOG_REASSIGN_DELAY_SECS,
            stale_check_interval_secs: DEFAULT_STALE_CHECK_INTERVAL_SECS,
        }
    }
}

impl WatcherConfig {
    pub fn reassign_delay(&self) -> Duration {
        Duration::from_secs(self.backlog_reassign_delay_secs)
    }

    /// Scan period, at least one second.
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.stale_check_interval_secs.max(1))
    }
}
