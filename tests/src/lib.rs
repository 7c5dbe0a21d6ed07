//! # Federation-Chain Test Suite
//!
//! Cross-crate flows run against the in-memory store with real validators,
//! real pipelines and real watchers.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── fixtures.rs          # Federation harness, transaction builders
//!     ├── block_flow.rs        # backlog ─► block
//!     ├── vote_flow.rs         # block ─► vote chain
//!     ├── double_spend.rs      # spent outputs stay spent
//!     ├── watcher_flow.rs      # reverter, stale reassignment
//!     └── federation_flow.rs   # multi-node elections and requeue
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p fc-tests
//! cargo test -p fc-tests integration::vote_flow::
//! ```

#![allow(dead_code)]

pub mod integration;
