//! # Inbound Port (Document Store API)
//!
//! The persistence interface every pipeline stage programs against. One
//! implementation per backend; the node picks one at startup.
//!
//! ## Write semantics
//!
//! - Inserts on a unique index return [`StoreError::DuplicateKey`] when the
//!   record is already present. Callers treat that as "already applied".
//! - Every successful mutation publishes one change event on the store's bus.
//! - Connectivity failures are retried internally and surface as
//!   [`StoreError::Connection`] once the retry budget is spent.

use crate::domain::errors::{Result, StoreError};
use async_trait::async_trait;
use shared_bus::{ChangeOp, Collection, Subscription};
use shared_types::entities::{
    BlockId, BlockRecord, OutputLink, PendingTransaction, Timestamp, TxId, VoteRecord,
};
use std::collections::HashMap;

/// A transaction recorded in a block as spending some output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spender {
    pub transaction_id: TxId,
    pub block_id: BlockId,
}

/// Document store API.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    // -------------------------------------------------------------------------
    // Pending set (backlog)
    // -------------------------------------------------------------------------

    /// Insert a pending transaction. Duplicate ids are rejected.
    async fn put_pending(&self, tx: PendingTransaction) -> Result<()>;

    async fn get_pending(&self, id: &str) -> Result<Option<PendingTransaction>>;

    /// Delete pending records, returning how many existed.
    async fn delete_pending(&self, ids: &[TxId]) -> Result<usize>;

    /// Records assigned to `node`, ascending by assignment time.
    async fn range_by_assignee(&self, node: &str) -> Result<Vec<PendingTransaction>>;

    /// Move a pending record to `node`, stamping `timestamp`.
    async fn update_assignment(
        &self,
        id: &str,
        node: &str,
        timestamp: Timestamp,
    ) -> Result<PendingTransaction>;

    /// Records assigned strictly before `older_than`, oldest first.
    async fn stale_pending(&self, older_than: Timestamp) -> Result<Vec<PendingTransaction>>;

    // -------------------------------------------------------------------------
    // Blocks (bigchain)
    // -------------------------------------------------------------------------

    /// Insert a block. Duplicate block ids are rejected.
    async fn put_block(&self, block: BlockRecord) -> Result<()>;

    async fn get_block(&self, id: &str) -> Result<Option<BlockRecord>>;

    async fn block_exists(&self, id: &str) -> Result<bool>;

    /// Remove a block, returning it if it existed.
    async fn delete_block(&self, id: &str) -> Result<Option<BlockRecord>>;

    /// Every written block whose transaction list contains `tx_id`.
    async fn blocks_containing_transaction(&self, tx_id: &str) -> Result<Vec<BlockRecord>>;

    /// Transactions in written blocks that spend `link`.
    async fn spenders_of(&self, link: &OutputLink) -> Result<Vec<Spender>>;

    /// Non-genesis blocks `node` has not voted on, ascending by block timestamp.
    async fn unvoted_blocks(&self, node: &str) -> Result<Vec<BlockRecord>>;

    /// Highest block number written so far.
    async fn max_block_number(&self) -> Result<Option<u64>>;

    async fn genesis_block(&self) -> Result<Option<BlockRecord>>;

    // -------------------------------------------------------------------------
    // Votes
    // -------------------------------------------------------------------------

    /// Insert a vote. A second vote by the same node on the same block is rejected.
    async fn put_vote(&self, vote: VoteRecord) -> Result<()>;

    async fn votes_for_block(&self, block_id: &str) -> Result<Vec<VoteRecord>>;

    async fn vote_by_node(&self, block_id: &str, node: &str) -> Result<Option<VoteRecord>>;

    async fn votes_by_node(&self, node: &str) -> Result<Vec<VoteRecord>>;

    /// Head of `node`'s vote chain.
    ///
    /// Follows `previous_block → voting_for_block` links from genesis. If the
    /// chain is broken, falls back to the most recent vote by timestamp.
    async fn last_vote_by_node(&self, node: &str) -> Result<Option<VoteRecord>> {
        let votes = self.votes_by_node(node).await?;
        if votes.is_empty() {
            return Ok(None);
        }
        let genesis = self.genesis_block().await?.map(|g| g.id);
        Ok(chain_head(votes, genesis.as_deref()))
    }

    // -------------------------------------------------------------------------
    // Change notifications
    // -------------------------------------------------------------------------

    /// Subscribe to `ops` on `collection`. Only later mutations are delivered.
    fn subscribe(&self, collection: Collection, ops: &[ChangeOp]) -> Subscription;
}

/// Head of a vote chain rooted at `genesis`.
pub fn chain_head(votes: Vec<VoteRecord>, genesis: Option<&str>) -> Option<VoteRecord> {
    let mut by_previous: HashMap<String, VoteRecord> = HashMap::with_capacity(votes.len());
    let mut latest: Option<VoteRecord> = None;
    for vote in votes {
        if latest
            .as_ref()
            .map_or(true, |l| vote.vote.timestamp > l.vote.timestamp)
        {
            latest = Some(vote.clone());
        }
        by_previous.insert(vote.vote.previous_block.clone(), vote);
    }

    let Some(mut cursor) = genesis.map(str::to_string) else {
        return latest;
    };
    let mut head = None;
    // Bounded by the vote count so a cycle cannot spin forever.
    for _ in 0..=by_previous.len() {
        match by_previous.remove(&cursor) {
            Some(vote) => {
                cursor = vote.vote.voting_for_block.clone();
                head = Some(vote);
            }
            None => break,
        }
    }
    head.or(latest)
}

/// Treat a duplicate-key rejection as success.
pub fn ignore_duplicate(result: Result<()>) -> Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(StoreError::DuplicateKey { .. }) => Ok(false),
        Err(e) => Err(e),
    }
}
