//! # Document Store (fc-01)
//!
//! Persistence for the three federation collections, with the indexes the
//! pipelines query and a change notification for every mutation.
//!
//! ## Collections and Indexes
//!
//! | Collection | Unique key                  | Secondary indexes                                   |
//! |------------|-----------------------------|-----------------------------------------------------|
//! | backlog    | transaction id              | (assignee, assignment time), assignment time        |
//! | bigchain   | block id                    | transaction id, spent output, timestamp, number     |
//! | votes      | (block id, voter)           | voter                                               |
//!
//! ## Error Taxonomy
//!
//! | Error          | Meaning                               | Caller reaction         |
//! |----------------|---------------------------------------|-------------------------|
//! | `Connection`   | engine unreachable, retries exhausted | stop the stage          |
//! | `DuplicateKey` | record already present                | treat as applied        |
//! | `NotFound`     | update target missing                 | skip the record         |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Errors and the key layout
//! - `ports/` - `DocumentStore` (inbound) and `KeyValueStore` (outbound)
//! - `adapters/` - In-memory and RocksDB engines, data directory lock
//! - `service.rs` - `KvDocumentStore`, the document store over an engine
//! - `retry.rs` - Exponential backoff for engine calls
//! - `config.rs` - Backend selection
//! - `test_utils.rs` - Failure-injecting engine (`test-utils` feature)

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod retry;
pub mod service;

/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{StoreBackend, StoreConfig, StoreHandle};
pub use domain::errors::{KVStoreError, Result, StoreError};
pub use ports::inbound::{chain_head, ignore_duplicate, DocumentStore, Spender};
pub use ports::outbound::{BatchOperation, KeyValueStore};
pub use retry::RetryPolicy;
pub use service::KvDocumentStore;
