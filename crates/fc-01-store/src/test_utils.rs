//! # Test Utilities
//!
//! Engines for exercising connectivity failures. Enable with the
//! `test-utils` feature flag.

use crate::adapters::memory::InMemoryKVStore;
use crate::domain::errors::KVStoreError;
use crate::ports::outbound::{BatchOperation, KeyValueStore};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Engine that fails with I/O errors a set number of times before delegating.
///
/// Clones share data and failure budget, so a test can keep one clone to
/// take the engine down after handing the other to a store.
#[derive(Clone)]
pub struct FlakyKv {
    inner: Arc<InMemoryKVStore>,
    failures_left: Arc<AtomicU32>,
    pub calls: Arc<AtomicU32>,
}

impl FlakyKv {
    pub fn failing(times: u32) -> Self {
        Self {
            inner: Arc::new(InMemoryKVStore::new()),
            failures_left: Arc::new(AtomicU32::new(times)),
            calls: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn fail_next(&self, times: u32) {
        self.failures_left.store(times, Ordering::SeqCst);
    }

    /// Fail every call from now on.
    pub fn go_down(&self) {
        self.fail_next(u32::MAX);
    }

    fn trip(&self) -> Result<(), KVStoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let tripped = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if tripped {
            return Err(KVStoreError::IOError {
                message: "connection refused".into(),
            });
        }
        Ok(())
    }
}

impl KeyValueStore for FlakyKv {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        self.trip()?;
        self.inner.get(key)
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        self.trip()?;
        self.inner.put(key, value)
    }

    fn delete(&self, key: &[u8]) -> Result<(), KVStoreError> {
        self.trip()?;
        self.inner.delete(key)
    }

    fn atomic_batch_write(&self, operations: Vec<BatchOperation>) -> Result<(), KVStoreError> {
        self.trip()?;
        self.inner.atomic_batch_write(operations)
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, KVStoreError> {
        self.trip()?;
        self.inner.prefix_scan(prefix)
    }
}
