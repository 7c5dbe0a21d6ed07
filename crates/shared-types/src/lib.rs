//! # Shared Types Crate
//!
//! Document model and identity primitives shared by every Federation-Chain
//! subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Every record persisted in the store
//!   (pending transactions, blocks, votes) is defined here.
//! - **Content Addressing**: Transaction and block ids are SHA3-256 digests of
//!   their canonical JSON body, so any node can recompute and check them.
//! - **Explicit Context**: The node's identity travels as a [`NodeIdentity`]
//!   value handed to each stage, never as process-global state.
//!
//! ## Record Overview
//!
//! ```text
//! PendingTransaction ──(assembled)──→ BlockRecord ──(voted)──→ VoteRecord
//!   transaction + assignee              id, block, signature      node_pubkey, vote
//! ```

pub mod crypto;
pub mod election;
pub mod entities;
pub mod errors;
pub mod identity;
pub mod time;

pub use crypto::{sha3_256_hex, verify_signature, NodeKeypair};
pub use election::{block_status, ElectionStatus, VoteTally};
pub use entities::*;
pub use errors::*;
pub use identity::NodeIdentity;
pub use time::{ManualTimeSource, SystemTimeSource, TimeSource};
