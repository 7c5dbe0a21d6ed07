//! # Voter
//!
//! Folds per-transaction validation results into one signed vote per block.
//!
//! ## State
//!
//! | Field        | Meaning                                         |
//! |--------------|-------------------------------------------------|
//! | `last_voted` | head of this node's vote chain                  |
//! | `tallies`    | results so far for blocks still being validated |
//! | `voted`      | votes emitted but not yet stored                |
//!
//! A block's vote is emitted once its count reaches the block's
//! transaction total. The vote links to `last_voted`, which then advances,
//! so this node's votes form a chain rooted at genesis.
//!
//! `voted` is pruned against the pipeline's [`InFlight`] set, so it never
//! outgrows the votes queued for the writer.

use fc_01_store::DocumentStore;
use fc_03_block_pipeline::{PipelineError, Result};
use shared_types::entities::{BlockId, Vote, VoteRecord};
use shared_types::identity::NodeIdentity;
use shared_types::time::TimeSource;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::in_flight::InFlight;
use super::ungroup::Checked;

#[derive(Debug)]
struct Tally {
    count: usize,
    valid: bool,
    reason: Option<String>,
}

pub struct Voter {
    identity: NodeIdentity,
    clock: Arc<dyn TimeSource>,
    last_voted: BlockId,
    tallies: HashMap<BlockId, Tally>,
    voted: HashSet<BlockId>,
}

impl Voter {
    pub fn new(identity: NodeIdentity, clock: Arc<dyn TimeSource>, last_voted: BlockId) -> Self {
        Self {
            identity,
            clock,
            last_voted,
            tallies: HashMap::new(),
            voted: HashSet::new(),
        }
    }

    /// Resume from this node's last vote, or from genesis on a fresh node.
    pub async fn bootstrap(
        store: &dyn DocumentStore,
        identity: NodeIdentity,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self> {
        let last_voted = match store.last_vote_by_node(identity.me()).await? {
            Some(vote) => vote.vote.voting_for_block,
            None => store
                .genesis_block()
                .await?
                .map(|g| g.id)
                .ok_or_else(|| {
                    PipelineError::NotBootstrapped("no genesis block and no prior vote".into())
                })?,
        };
        Ok(Self::new(identity, clock, last_voted))
    }

    pub fn last_voted(&self) -> &str {
        &self.last_voted
    }

    /// Voted on `block_id` and the vote may not be stored yet.
    pub fn has_voted(&self, block_id: &str) -> bool {
        self.voted.contains(block_id)
    }

    /// Blocks with results outstanding.
    pub fn in_progress(&self) -> usize {
        self.tallies.len()
    }

    /// Forget votes the writer has stored.
    pub fn forget_stored(&mut self, in_flight: &InFlight) {
        in_flight.retain_claimed(&mut self.voted);
    }

    /// Fold one result in, returning the vote once the block is complete.
    pub fn tally(&mut self, checked: Checked) -> Result<Option<VoteRecord>> {
        if self.voted.contains(&checked.block_id) {
            return Ok(None);
        }
        let entry = self
            .tallies
            .entry(checked.block_id.clone())
            .or_insert_with(|| Tally {
                count: 0,
                valid: true,
                reason: None,
            });
        entry.count += 1;
        entry.valid &= checked.valid;
        if entry.reason.is_none() {
            entry.reason = checked.reason;
        }
        if entry.count < checked.total {
            return Ok(None);
        }

        let Some(done) = self.tallies.remove(&checked.block_id) else {
            return Ok(None);
        };
        let vote = Vote {
            voting_for_block: checked.block_id.clone(),
            previous_block: self.last_voted.clone(),
            is_block_valid: done.valid,
            invalid_reason: if done.valid { None } else { done.reason },
            timestamp: self.clock.now(),
        };
        let record = VoteRecord::sign(vote, self.identity.keypair())?;
        self.last_voted = checked.block_id.clone();
        self.voted.insert(checked.block_id);
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fc_01_store::StoreHandle;
    use shared_types::crypto::NodeKeypair;
    use shared_types::time::ManualTimeSource;

    fn voter() -> Voter {
        Voter::new(
            NodeIdentity::solo(NodeKeypair::generate()),
            Arc::new(ManualTimeSource::new(5)),
            "genesis".into(),
        )
    }

    fn checked(block: &str, total: usize, valid: bool) -> Checked {
        Checked {
            block_id: block.into(),
            total,
            valid,
            reason: (!valid).then(|| "bad tx".to_string()),
        }
    }

    #[test]
    fn test_vote_emitted_when_count_reaches_total() {
        let mut v = voter();
        assert!(v.tally(checked("b1", 3, true)).unwrap().is_none());
        assert!(v.tally(checked("b1", 3, true)).unwrap().is_none());
        let vote = v.tally(checked("b1", 3, true)).unwrap().expect("complete");

        assert!(vote.vote.is_block_valid);
        assert_eq!(vote.vote.voting_for_block, "b1");
        assert_eq!(vote.vote.previous_block, "genesis");
        assert!(vote.verify());
        assert_eq!(v.in_progress(), 0);
    }

    #[test]
    fn test_one_invalid_tx_invalidates_block() {
        let mut v = voter();
        v.tally(checked("b1", 3, true)).unwrap();
        v.tally(checked("b1", 3, false)).unwrap();
        let vote = v.tally(checked("b1", 3, true)).unwrap().unwrap();

        assert!(!vote.vote.is_block_valid);
        assert_eq!(vote.vote.invalid_reason.as_deref(), Some("bad tx"));
    }

    #[test]
    fn test_votes_chain_in_completion_order() {
        let mut v = voter();
        v.tally(checked("b1", 2, true)).unwrap();
        let first = v.tally(checked("b2", 1, true)).unwrap().unwrap();
        let second = v.tally(checked("b1", 2, true)).unwrap().unwrap();

        assert_eq!(first.vote.previous_block, "genesis");
        assert_eq!(second.vote.previous_block, "b2");
        assert_eq!(v.last_voted(), "b1");
    }

    #[test]
    fn test_no_second_vote_for_same_block() {
        let mut v = voter();
        assert!(v.tally(checked("b1", 1, true)).unwrap().is_some());
        assert!(v.tally(checked("b1", 1, true)).unwrap().is_none());
        assert!(v.has_voted("b1"));
    }

    #[test]
    fn test_stored_votes_are_forgotten() {
        let mut v = voter();
        let in_flight = InFlight::new();
        in_flight.claim("b1");
        in_flight.claim("b2");
        v.tally(checked("b1", 1, true)).unwrap().unwrap();
        v.tally(checked("b2", 1, true)).unwrap().unwrap();

        in_flight.release("b1");
        v.forget_stored(&in_flight);
        assert!(!v.has_voted("b1"));
        assert!(v.has_voted("b2"));
        assert_eq!(v.last_voted(), "b2");
    }

    #[tokio::test]
    async fn test_bootstrap_requires_genesis_or_vote() {
        let handle = StoreHandle::in_memory();
        let result = Voter::bootstrap(
            handle.store.as_ref(),
            NodeIdentity::solo(NodeKeypair::generate()),
            Arc::new(ManualTimeSource::new(0)),
        )
        .await;
        assert!(matches!(result, Err(PipelineError::NotBootstrapped(_))));
    }
}
