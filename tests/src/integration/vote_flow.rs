//! # Vote Flow
//!
//! Every block gets exactly one vote per federation member, and a member's
//! votes chain back to genesis.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::*;
    use fc_01_store::chain_head;
    use shared_types::crypto::NodeKeypair;
    use shared_types::entities::{Block, BlockRecord, Transaction};
    use shared_types::time::{SystemTimeSource, TimeSource};
    use std::time::Duration;

    fn block_by(fed: &Federation, creator: usize, txs: Vec<Transaction>) -> BlockRecord {
        BlockRecord::new(
            Block {
                timestamp: SystemTimeSource.now(),
                block_number: 1_000,
                transactions: txs,
                node_pubkey: fed.public_key(creator).to_string(),
                voters: fed.members.iter().map(|k| k.public_key().to_string()).collect(),
            },
            &fed.members[creator],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_block_with_invalid_transaction_voted_invalid() {
        let fed = Federation::start(FederationConfig::nodes(1)).await;
        let owner = NodeKeypair::generate();

        let bad = block_by(
            &fed,
            0,
            vec![
                create_tx(&owner, 1),
                forged(create_tx(&owner, 2)),
                create_tx(&owner, 3),
            ],
        );
        fed.store.put_block(bad.clone()).await.unwrap();
        let vote = fed.wait_for_vote(&bad.id, 0).await;
        assert!(!vote.vote.is_block_valid);
        assert!(vote.vote.invalid_reason.is_some());
        assert!(vote.verify());

        let good = block_by(&fed, 0, vec![create_tx(&owner, 4), create_tx(&owner, 5)]);
        fed.store.put_block(good.clone()).await.unwrap();
        let vote = fed.wait_for_vote(&good.id, 0).await;
        assert!(vote.vote.is_block_valid);
        assert!(vote.vote.invalid_reason.is_none());

        fed.stop().await;
    }

    #[tokio::test]
    async fn test_votes_chain_back_to_genesis() {
        let fed = Federation::start(FederationConfig::nodes(1)).await;
        let owner = NodeKeypair::generate();

        let mut votes = Vec::new();
        for amount in 1..=3 {
            let (_, vote) = fed.commit(&create_tx(&owner, amount), 0).await;
            votes.push(vote);
        }

        assert_eq!(votes[0].vote.previous_block, fed.genesis.id);
        for pair in votes.windows(2) {
            assert_eq!(pair[1].vote.previous_block, pair[0].vote.voting_for_block);
        }

        let stored = fed.store.votes_by_node(fed.public_key(0)).await.unwrap();
        assert_eq!(stored.len(), 3);
        let head = chain_head(stored, Some(fed.genesis.id.as_str())).unwrap();
        assert_eq!(head, votes[2]);

        fed.stop().await;
    }

    #[tokio::test]
    async fn test_redelivered_block_not_voted_twice() {
        let fed = Federation::start(FederationConfig::nodes(1)).await;
        let (block, vote) = fed.commit(&create_tx(&NodeKeypair::generate(), 2), 0).await;
        let skipped_before = fed.node(0).vote_metrics.snapshot().blocks_skipped;

        fed.store.delete_block(&block.id).await.unwrap();
        fed.store.put_block(block.clone()).await.unwrap();

        let metrics = fed.node(0).vote_metrics.clone();
        eventually("redelivery skipped", || {
            let metrics = metrics.clone();
            async move { (metrics.snapshot().blocks_skipped > skipped_before).then_some(()) }
        })
        .await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        let votes = fed.store.votes_for_block(&block.id).await.unwrap();
        assert_eq!(votes, vec![vote]);
        assert_eq!(fed.node(0).vote_metrics.snapshot().votes_cast(), 1);

        fed.stop().await;
    }

    #[tokio::test]
    async fn test_block_from_outsider_voted_invalid() {
        let fed = Federation::start(FederationConfig::nodes(1)).await;
        let outsider = NodeKeypair::generate();

        let block = BlockRecord::new(
            Block {
                timestamp: SystemTimeSource.now(),
                block_number: 5,
                transactions: vec![create_tx(&outsider, 1)],
                node_pubkey: outsider.public_key().to_string(),
                voters: vec![fed.public_key(0).to_string()],
            },
            &outsider,
        )
        .unwrap();
        fed.store.put_block(block.clone()).await.unwrap();

        let vote = fed.wait_for_vote(&block.id, 0).await;
        assert!(!vote.vote.is_block_valid);

        fed.stop().await;
    }
}
