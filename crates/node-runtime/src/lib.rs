//! # Node Runtime Library
//!
//! Building blocks of the `fc-node` binary, exposed for integration tests.
//!
//! - `config.rs` - `NodeConfig` and its environment loader
//! - `genesis.rs` - Genesis block creation
//! - `runtime.rs` - Startup, supervision and shutdown

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod genesis;
pub mod runtime;

pub use config::{ConfigError, IdentityConfig, NodeConfig};
pub use genesis::{create_genesis_block, ensure_genesis, GenesisError};
pub use runtime::{stop_on, NodeMetrics, NodeRuntime, NodeSnapshot, RunningNode, SHUTDOWN_GRACE};
