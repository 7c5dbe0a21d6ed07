//! Key-value engine implementations.

pub mod lock;
pub mod memory;
#[cfg(feature = "rocksdb")]
pub mod rocksdb;

pub use lock::{DatabaseLock, LockError};
pub use memory::InMemoryKVStore;
#[cfg(feature = "rocksdb")]
pub use self::rocksdb::{RocksDbConfig, RocksDbKVStore};
