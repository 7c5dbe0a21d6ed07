//! # Election Watcher
//!
//! Follows incoming votes. Once a block's election concludes invalid, its
//! transactions go back into the backlog so that valid ones among them get
//! another chance in a later block.
//!
//! A transaction is not requeued if it is already pending or if another
//! live block already carries it.
//!
//! An invalid block stays tracked only until its last eligible voter has
//! voted. No further votes can arrive for it after that.

use crate::metrics::WatcherMetrics;
use fc_01_store::{ignore_duplicate, DocumentStore};
use fc_02_validation::election_status;
use fc_03_block_pipeline::stage::shutdown_signalled;
use fc_03_block_pipeline::{NodeContext, Result};
use shared_bus::{ChangeFeed, ChangeOp, Collection};
use shared_types::election::ElectionStatus;
use shared_types::entities::{BlockId, BlockRecord, PendingTransaction, Transaction, VoteRecord};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct ElectionWatcher {
    ctx: NodeContext,
    metrics: Arc<WatcherMetrics>,
    /// Requeued invalid blocks, with the voters still to vote on them.
    handled: HashMap<BlockId, HashSet<String>>,
}

impl ElectionWatcher {
    pub fn new(ctx: NodeContext, metrics: Arc<WatcherMetrics>) -> Self {
        Self {
            ctx,
            metrics,
            handled: HashMap::new(),
        }
    }

    /// Re-evaluate the block `vote` is for.
    ///
    /// Returns the number of transactions put back into the backlog.
    pub async fn on_vote(&mut self, vote: &VoteRecord) -> Result<usize> {
        let block_id = &vote.vote.voting_for_block;
        if let Some(waiting) = self.handled.get_mut(block_id) {
            waiting.remove(&vote.node_pubkey);
            if waiting.is_empty() {
                self.handled.remove(block_id);
            }
            return Ok(0);
        }
        let Some(block) = self.ctx.store.get_block(block_id).await? else {
            debug!(block_id = %block_id, "[fc-05] Vote for unknown block");
            return Ok(0);
        };

        let status = election_status(self.ctx.store.as_ref(), &block).await?;
        if status != ElectionStatus::Invalid {
            return Ok(0);
        }
        let votes = self.ctx.store.votes_for_block(&block.id).await?;
        let waiting: HashSet<String> = block
            .block
            .voters
            .iter()
            .filter(|voter| !votes.iter().any(|v| &v.node_pubkey == *voter))
            .cloned()
            .collect();
        if !waiting.is_empty() {
            self.handled.insert(block.id.clone(), waiting);
        }

        let requeued = self.requeue_block(&block).await?;
        self.metrics.record_invalid_block(requeued);
        warn!(
            block_id = %block.id,
            requeued,
            "[fc-05] Block elected invalid, transactions requeued"
        );
        Ok(requeued)
    }

    /// Invalid blocks whose election is still open.
    pub fn tracked_blocks(&self) -> usize {
        self.handled.len()
    }

    async fn requeue_block(&self, block: &BlockRecord) -> Result<usize> {
        let mut requeued = 0;
        for tx in &block.block.transactions {
            if self.requeue(tx, &block.id).await? {
                requeued += 1;
            }
        }
        Ok(requeued)
    }

    async fn requeue(&self, tx: &Transaction, invalid_block: &str) -> Result<bool> {
        let store = self.ctx.store.as_ref();
        if store.get_pending(&tx.id).await?.is_some() {
            return Ok(false);
        }
        for other in store.blocks_containing_transaction(&tx.id).await? {
            if other.id != invalid_block && election_status(store, &other).await?.is_live() {
                return Ok(false);
            }
        }

        let assignee = self.ctx.identity.random_member().to_string();
        let pending = PendingTransaction::new(tx.clone(), assignee, self.ctx.clock.now());
        Ok(ignore_duplicate(store.put_pending(pending).await)?)
    }
}

/// Follow vote inserts until shutdown.
pub async fn run_election_watcher(mut watcher: ElectionWatcher) -> Result<()> {
    let mut shutdown = watcher.ctx.shutdown();
    let mut feed = ChangeFeed::live(
        watcher
            .ctx
            .store
            .subscribe(Collection::Votes, &[ChangeOp::Insert]),
    );
    info!("[fc-05] Election watcher started");

    loop {
        let item = tokio::select! {
            item = feed.next() => item,
            _ = shutdown_signalled(&mut shutdown) => break,
        };
        let Some(item) = item else {
            break;
        };
        if let Some(vote) = item.into_current().into_vote() {
            watcher.on_vote(&vote).await?;
        }
    }
    info!("[fc-05] Election watcher stopped");
    Ok(())
}
