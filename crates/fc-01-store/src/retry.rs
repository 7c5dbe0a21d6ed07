//! # Connection Retry
//!
//! Engine calls that fail with an I/O error are retried with exponential
//! backoff: the `n`-th retry waits `base_delay * 2^n`. After `max_tries`
//! attempts the failure surfaces as [`StoreError::Connection`].

use crate::domain::errors::{KVStoreError, StoreError};
use std::time::Duration;
use tracing::warn;

/// Default attempt ceiling.
pub const DEFAULT_MAX_TRIES: u32 = 3;

/// Default base backoff.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Backoff policy for engine calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Zero is treated as one.
    pub max_tries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_tries: DEFAULT_MAX_TRIES,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_tries: u32, base_delay: Duration) -> Self {
        Self {
            max_tries,
            base_delay,
        }
    }

    /// Delay before retry number `attempt` (zero based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << attempt.min(16))
    }

    /// Run `op` until it succeeds, fails permanently, or the budget runs out.
    pub async fn run<T, F>(&self, operation: &str, mut op: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Result<T, KVStoreError>,
    {
        let max_tries = self.max_tries.max(1);
        let mut attempt = 0;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(KVStoreError::CorruptionError { message }) => {
                    return Err(StoreError::Corrupted(message));
                }
                Err(KVStoreError::IOError { message }) => {
                    attempt += 1;
                    if attempt >= max_tries {
                        return Err(StoreError::Connection {
                            attempts: attempt,
                            message,
                        });
                    }
                    let delay = self.delay_for(attempt - 1);
                    warn!(
                        operation,
                        attempt,
                        max_tries,
                        delay_ms = delay.as_millis() as u64,
                        error = %message,
                        "Store call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
