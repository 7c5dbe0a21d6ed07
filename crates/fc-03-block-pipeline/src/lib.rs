//! # Block Pipeline (fc-03)
//!
//! Builds blocks from the transactions assigned to this node.
//!
//! ## Stages
//!
//! | Stage      | Workers | Input                 | Output                  |
//! |------------|---------|-----------------------|-------------------------|
//! | feed       | 1       | backlog change feed   | transactions for `me`   |
//! | validate   | N cores | transaction           | valid transaction       |
//! | assemble   | 1       | valid transaction     | signed block            |
//! | write      | 1       | signed block          | block in store          |
//!
//! ## Stage Runtime
//!
//! The crate also provides what every pipeline in the node runs on:
//! [`NodeContext`], the watch-based shutdown signal, [`StageSet`] for
//! supervision and [`stage::spawn_workers`] for parallel stateless stages.
//!
//! ## Crate Structure
//!
//! - `domain/` - Assignment filter and block assembler
//! - `writer.rs` - Block writer
//! - `pipeline.rs` - Stage wiring
//! - `stage.rs` - Stage runtime
//! - `context.rs` - Node context and shutdown signal
//! - `config.rs` - Batch size, timeouts, channel sizes
//! - `metrics.rs` - Block production counters

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod context;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod stage;
pub mod writer;

pub use config::PipelineConfig;
pub use context::{shutdown_channel, NodeContext, ShutdownRx, ShutdownTx};
pub use domain::{filter_assigned, BlockAssembler};
pub use error::{PipelineError, Result};
pub use metrics::{BlockPipelineMetrics, BlockPipelineSnapshot};
pub use pipeline::spawn_block_pipeline;
pub use stage::StageSet;
pub use writer::{BlockWriter, WriteOutcome};
