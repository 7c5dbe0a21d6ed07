//! # Federation Flow
//!
//! Several nodes sharing one store: blocks are elected by majority, and the
//! transactions of a block elected invalid get another chance.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::*;
    use fc_02_validation::election_status;
    use shared_types::crypto::NodeKeypair;
    use shared_types::election::ElectionStatus;
    use shared_types::entities::{Block, BlockRecord};
    use shared_types::time::{SystemTimeSource, TimeSource};

    async fn wait_for_status(fed: &Federation, block: &BlockRecord, status: ElectionStatus) {
        let store = fed.store.clone();
        eventually("election concluded", || {
            let store = store.clone();
            let block = block.clone();
            async move {
                (election_status(store.as_ref(), &block).await.unwrap() == status).then_some(())
            }
        })
        .await;
    }

    #[tokio::test]
    async fn test_every_member_votes_and_block_is_valid() {
        let fed = Federation::start(FederationConfig::nodes(3)).await;
        let tx = create_tx(&NodeKeypair::generate(), 2);

        fed.submit(&tx, 1).await;
        let block = fed.wait_for_block(&tx.id).await;
        assert_eq!(block.block.node_pubkey, fed.public_key(1));

        for voter in 0..3 {
            let vote = fed.wait_for_vote(&block.id, voter).await;
            assert!(vote.vote.is_block_valid);
            assert_eq!(vote.vote.previous_block, fed.genesis.id);
        }
        wait_for_status(&fed, &block, ElectionStatus::Valid).await;

        fed.stop().await;
    }

    #[tokio::test]
    async fn test_invalid_block_transactions_reach_a_new_block() {
        let fed = Federation::start(FederationConfig::nodes(3).with_watchers()).await;
        let owner = NodeKeypair::generate();
        let good = create_tx(&owner, 1);
        let bad = forged(create_tx(&owner, 2));

        let invalid_block = BlockRecord::new(
            Block {
                timestamp: SystemTimeSource.now(),
                block_number: 1,
                transactions: vec![good.clone(), bad.clone()],
                node_pubkey: fed.public_key(0).to_string(),
                voters: fed.members.iter().map(|k| k.public_key().to_string()).collect(),
            },
            &fed.members[0],
        )
        .unwrap();
        fed.store.put_block(invalid_block.clone()).await.unwrap();
        wait_for_status(&fed, &invalid_block, ElectionStatus::Invalid).await;

        let store = fed.store.clone();
        let good_id = good.id.clone();
        let invalid_id = invalid_block.id.clone();
        let rebuilt = eventually("good transaction re-blocked", || {
            let store = store.clone();
            let good_id = good_id.clone();
            let invalid_id = invalid_id.clone();
            async move {
                store
                    .blocks_containing_transaction(&good_id)
                    .await
                    .unwrap()
                    .into_iter()
                    .find(|b| b.id != invalid_id)
            }
        })
        .await;
        wait_for_status(&fed, &rebuilt, ElectionStatus::Valid).await;

        fed.wait_until_not_pending(&bad.id).await;
        let holding_bad = fed.store.blocks_containing_transaction(&bad.id).await.unwrap();
        assert_eq!(holding_bad.len(), 1);
        assert_eq!(holding_bad[0].id, invalid_block.id);

        let invalid_seen: u64 = fed
            .nodes
            .iter()
            .filter_map(|n| n.watcher_metrics.as_ref())
            .map(|m| m.snapshot().invalid_blocks)
            .sum();
        assert!(invalid_seen >= 1);

        fed.stop().await;
    }
}
