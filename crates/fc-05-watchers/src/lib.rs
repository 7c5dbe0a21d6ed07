//! # Watchers (fc-05)
//!
//! Background tasks that keep the chain and the backlog healthy.
//!
//! | Watcher               | Trigger                 | Action                                   |
//! |-----------------------|-------------------------|------------------------------------------|
//! | block-delete reverter | block delete            | write the block back                     |
//! | stale reassigner      | timer                   | move old backlog records to the next node |
//! | election watcher      | vote insert             | requeue transactions of invalid blocks   |
//!
//! All three are source stages: they stop on the shutdown signal.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod election;
pub mod metrics;
pub mod reverter;
pub mod stale;

pub use config::WatcherConfig;
pub use election::{run_election_watcher, ElectionWatcher};
pub use metrics::{WatcherMetrics, WatcherSnapshot};
pub use reverter::{run_reverter, BlockDeleteReverter};
pub use stale::{run_reassigner, StaleReassigner};

use fc_03_block_pipeline::{NodeContext, StageSet};
use std::sync::Arc;
use tracing::info;

/// Spawn every watcher into `stages`.
pub fn spawn_watchers(
    ctx: &NodeContext,
    config: &WatcherConfig,
    stages: &mut StageSet,
) -> Arc<WatcherMetrics> {
    let metrics = Arc::new(WatcherMetrics::new());

    let reverter = BlockDeleteReverter::new(Arc::clone(&ctx.store), Arc::clone(&metrics));
    stages.spawn("fc-05/reverter", run_reverter(ctx.clone(), reverter));

    let reassigner = StaleReassigner::new(ctx, config.reassign_delay(), Arc::clone(&metrics));
    stages.spawn(
        "fc-05/stale",
        run_reassigner(ctx.clone(), reassigner, config.check_interval()),
    );

    let watcher = ElectionWatcher::new(ctx.clone(), Arc::clone(&metrics));
    stages.spawn("fc-05/election", run_election_watcher(watcher));

    info!(
        reassign_delay_secs = config.backlog_reassign_delay_secs,
        "[fc-05] Watchers started"
    );
    metrics
}
