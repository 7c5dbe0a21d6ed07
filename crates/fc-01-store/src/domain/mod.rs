//! Store domain: errors and the key layout that implements the indexes.

pub mod errors;
pub mod keys;

pub use errors::{KVStoreError, Result, StoreError};
