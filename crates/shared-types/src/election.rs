//! # Election Tally
//!
//! Federation-wide verdict on a block from the votes cast for it.
//!
//! ## Rules
//!
//! With `n` eligible voters, counting one signed vote per eligible voter:
//!
//! | Condition                     | Status      |
//! |-------------------------------|-------------|
//! | `invalid >= ceil(n / 2)`      | `Invalid`   |
//! | `valid > floor(n / 2)`        | `Valid`     |
//! | otherwise                     | `Undecided` |
//!
//! The genesis block is valid without votes.

use crate::entities::{BlockRecord, VoteRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Outcome of a block election.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElectionStatus {
    Valid,
    Invalid,
    Undecided,
}

impl ElectionStatus {
    /// Valid or still open. Transactions in such blocks count as spent.
    pub fn is_live(self) -> bool {
        !matches!(self, ElectionStatus::Invalid)
    }
}

/// Vote counts for one block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VoteTally {
    pub voters: usize,
    pub valid: usize,
    pub invalid: usize,
}

impl VoteTally {
    /// Count `votes` cast for `block`.
    ///
    /// Votes for another block, from non-voters, with a bad signature, or
    /// repeated by the same voter are ignored.
    pub fn count(block: &BlockRecord, votes: &[VoteRecord]) -> Self {
        let eligible: HashSet<&str> = block.block.voters.iter().map(String::as_str).collect();
        let mut seen = HashSet::new();
        let mut tally = VoteTally {
            voters: eligible.len(),
            ..Default::default()
        };

        for vote in votes {
            if vote.vote.voting_for_block != block.id
                || !eligible.contains(vote.node_pubkey.as_str())
                || !seen.insert(vote.node_pubkey.as_str())
                || !vote.verify()
            {
                continue;
            }
            if vote.vote.is_block_valid {
                tally.valid += 1;
            } else {
                tally.invalid += 1;
            }
        }
        tally
    }

    pub fn status(&self) -> ElectionStatus {
        let n = self.voters;
        if self.invalid >= n.div_ceil(2) && self.invalid > 0 {
            ElectionStatus::Invalid
        } else if self.valid > n / 2 {
            ElectionStatus::Valid
        } else {
            ElectionStatus::Undecided
        }
    }
}

/// Election status of `block` given the votes cast for it.
pub fn block_status(block: &BlockRecord, votes: &[VoteRecord]) -> ElectionStatus {
    if block.is_genesis() {
        return ElectionStatus::Valid;
    }
    VoteTally::count(block, votes).status()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::NodeKeypair;
    use crate::entities::{Block, Output, Transaction, Vote};

    fn block_with_voters(creator: &NodeKeypair, voters: &[&NodeKeypair], number: u64) -> BlockRecord {
        let tx = Transaction::create(
            creator.public_key().to_string(),
            vec![Output::new(1, vec![creator.public_key().to_string()])],
            None,
            None,
        )
        .unwrap()
        .sign(&[creator])
        .unwrap();
        BlockRecord::new(
            Block {
                timestamp: 1,
                block_number: number,
                transactions: vec![tx],
                node_pubkey: creator.public_key().to_string(),
                voters: voters.iter().map(|k| k.public_key().to_string()).collect(),
            },
            creator,
        )
        .unwrap()
    }

    fn vote(voter: &NodeKeypair, block: &BlockRecord, valid: bool) -> VoteRecord {
        VoteRecord::sign(
            Vote {
                voting_for_block: block.id.clone(),
                previous_block: "genesis".into(),
                is_block_valid: valid,
                invalid_reason: None,
                timestamp: 5,
            },
            voter,
        )
        .unwrap()
    }

    #[test]
    fn test_majority_valid() {
        let keys: Vec<_> = (0..3).map(|_| NodeKeypair::generate()).collect();
        let refs: Vec<_> = keys.iter().collect();
        let block = block_with_voters(&keys[0], &refs, 1);

        let votes = vec![vote(&keys[0], &block, true), vote(&keys[1], &block, true)];
        assert_eq!(block_status(&block, &votes), ElectionStatus::Valid);
    }

    #[test]
    fn test_half_invalid_is_invalid() {
        let keys: Vec<_> = (0..4).map(|_| NodeKeypair::generate()).collect();
        let refs: Vec<_> = keys.iter().collect();
        let block = block_with_voters(&keys[0], &refs, 1);

        let votes = vec![vote(&keys[0], &block, false), vote(&keys[1], &block, false)];
        assert_eq!(block_status(&block, &votes), ElectionStatus::Invalid);
    }

    #[test]
    fn test_split_is_undecided() {
        let keys: Vec<_> = (0..4).map(|_| NodeKeypair::generate()).collect();
        let refs: Vec<_> = keys.iter().collect();
        let block = block_with_voters(&keys[0], &refs, 1);

        let votes = vec![vote(&keys[0], &block, true), vote(&keys[1], &block, true)];
        assert_eq!(block_status(&block, &votes), ElectionStatus::Undecided);
    }

    #[test]
    fn test_ineligible_and_duplicate_votes_ignored() {
        let keys: Vec<_> = (0..3).map(|_| NodeKeypair::generate()).collect();
        let outsider = NodeKeypair::generate();
        let refs: Vec<_> = keys.iter().collect();
        let block = block_with_voters(&keys[0], &refs, 1);

        let votes = vec![
            vote(&keys[0], &block, true),
            vote(&keys[0], &block, true),
            vote(&outsider, &block, true),
        ];
        let tally = VoteTally::count(&block, &votes);
        assert_eq!(tally.valid, 1);
        assert_eq!(tally.status(), ElectionStatus::Undecided);
    }

    #[test]
    fn test_forged_vote_ignored() {
        let keys: Vec<_> = (0..1).map(|_| NodeKeypair::generate()).collect();
        let refs: Vec<_> = keys.iter().collect();
        let block = block_with_voters(&keys[0], &refs, 1);

        let mut forged = vote(&keys[0], &block, true);
        forged.vote.is_block_valid = false;
        assert_eq!(block_status(&block, &[forged]), ElectionStatus::Undecided);
    }

    #[test]
    fn test_genesis_always_valid() {
        let keys = NodeKeypair::generate();
        let block = block_with_voters(&keys, &[&keys], 0);
        assert_eq!(block_status(&block, &[]), ElectionStatus::Valid);
    }
}
