//! Configuration for block production and vote pipelines

use std::time::Duration;

/// Transactions per block before a size flush.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Idle time after which a partial block is flushed.
pub const DEFAULT_FLUSH_TIMEOUT_MS: u64 = 1000;

/// Items buffered between two stages.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Pipeline tuning shared by the block and vote pipelines.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    /// Maximum transactions per block
    pub batch_size: usize,

    /// Assembler idle timeout (milliseconds)
    pub flush_timeout_ms: u64,

    /// Bounded channel size between stages
    pub channel_capacity: usize,

    /// Parallel validation workers
    pub validation_workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            flush_timeout_ms: DEFAULT_FLUSH_TIMEOUT_MS,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            validation_workers: num_cpus::get(),
        }
    }
}

impl PipelineConfig {
    pub fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.flush_timeout_ms)
    }

    /// Worker count, never zero.
    pub fn workers(&self) -> usize {
        self.validation_workers.max(1)
    }

    /// Channel capacity, never zero.
    pub fn capacity(&self) -> usize {
        self.channel_capacity.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.flush_timeout(), Duration::from_secs(1));
        assert!(config.workers() >= 1);
    }

    #[test]
    fn test_zero_values_are_clamped() {
        let config = PipelineConfig {
            channel_capacity: 0,
            validation_workers: 0,
            ..Default::default()
        };
        assert_eq!(config.capacity(), 1);
        assert_eq!(config.workers(), 1);
    }
}
