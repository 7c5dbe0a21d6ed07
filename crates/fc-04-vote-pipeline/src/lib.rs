//! # Vote Pipeline (fc-04)
//!
//! Casts this node's vote on every block it is an eligible voter for.
//!
//! ## Stages
//!
//! | Stage    | Workers | Input               | Output                       |
//! |----------|---------|---------------------|------------------------------|
//! | feed     | 1       | block change feed   | per-transaction jobs         |
//! | validate | N cores | job                 | (block id, total, valid)     |
//! | tally    | 1       | validation result   | signed vote                  |
//! | write    | 1       | signed vote         | vote in store                |
//!
//! ## Guarantees
//!
//! - One vote per (block, node): checked against the blocks still in flight
//!   and against the store before a block is ungrouped, against the voter's
//!   own record before each tally, and by the store's unique index on write.
//! - Guard state is bounded: a block leaves the in-flight set, and the
//!   voter's record, once its vote is stored.
//! - Votes chain through `previous_block`, starting at genesis.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod domain;
pub mod metrics;
pub mod pipeline;
pub mod writer;

pub use domain::{ungroup, Checked, InFlight, Ungrouped, Voter};
pub use metrics::{VotePipelineMetrics, VotePipelineSnapshot};
pub use pipeline::spawn_vote_pipeline;
pub use writer::VoteWriter;
