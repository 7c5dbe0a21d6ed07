//! # Block-Delete Reverter
//!
//! Blocks are append-only. Any delete on the bigchain collection is undone
//! by writing the deleted record back verbatim.

use crate::metrics::WatcherMetrics;
use fc_01_store::{ignore_duplicate, DocumentStore};
use fc_03_block_pipeline::stage::shutdown_signalled;
use fc_03_block_pipeline::{NodeContext, Result};
use shared_bus::{ChangeFeed, ChangeOp, Collection};
use shared_types::entities::BlockRecord;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct BlockDeleteReverter {
    store: Arc<dyn DocumentStore>,
    metrics: Arc<WatcherMetrics>,
}

impl BlockDeleteReverter {
    pub fn new(store: Arc<dyn DocumentStore>, metrics: Arc<WatcherMetrics>) -> Self {
        Self { store, metrics }
    }

    /// Re-persist `block`. Returns false if another node already restored it.
    pub async fn revert(&self, block: BlockRecord) -> Result<bool> {
        let block_id = block.id.clone();
        let restored = ignore_duplicate(self.store.put_block(block).await)?;
        if restored {
            self.metrics.record_revert();
            warn!(block_id = %block_id, "[fc-05] Deleted block restored");
        } else {
            debug!(block_id = %block_id, "[fc-05] Deleted block already restored");
        }
        Ok(restored)
    }
}

/// Watch block deletes until shutdown.
pub async fn run_reverter(ctx: NodeContext, reverter: BlockDeleteReverter) -> Result<()> {
    let mut shutdown = ctx.shutdown();
    let mut feed = ChangeFeed::live(ctx.store.subscribe(Collection::Bigchain, &[ChangeOp::Delete]));
    info!("[fc-05] Block-delete reverter started");

    loop {
        let item = tokio::select! {
            item = feed.next() => item,
            _ = shutdown_signalled(&mut shutdown) => break,
        };
        let Some(item) = item else {
            break;
        };
        if let Some(block) = item.into_current().into_block() {
            reverter.revert(block).await?;
        }
    }
    info!("[fc-05] Block-delete reverter stopped");
    Ok(())
}
