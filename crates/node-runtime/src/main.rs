//! # Federation-Chain Node
//!
//! ```text
//!                      ┌──────────────── store ────────────────┐
//!                      │  backlog        bigchain       votes  │
//!                      └────┬───────────────┬──────────────┬───┘
//!                           │ changes       │ changes      │ changes
//!   block pipeline (fc-03) ─┘               │              │
//!     assign ─► validate ─► assemble ─► write block        │
//!                                           │              │
//!   vote pipeline (fc-04) ──────────────────┘              │
//!     ungroup ─► validate ─► tally ─► write vote           │
//!                                                          │
//!   watchers (fc-05): reverter, stale reassigner, election ┘
//! ```
//!
//! Runs until Ctrl-C or until a stage fails.

use anyhow::{Context, Result};
use fc_telemetry::init_logging;
use node_runtime::{stop_on, NodeConfig, NodeRuntime};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = NodeConfig::from_env().context("Failed to load configuration")?;
    init_logging(&config.telemetry).context("Failed to initialize logging")?;

    let runtime = NodeRuntime::new(config)?;
    let node = runtime.start().await?;

    info!("[fc-node] Node is running. Press Ctrl+C to stop.");
    node.supervise(stop_on(tokio::signal::ctrl_c()))
        .await
        .context("Node stopped on a stage failure")?;
    Ok(())
}
