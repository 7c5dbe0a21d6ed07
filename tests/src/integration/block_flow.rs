//! # Block Flow
//!
//! Backlog records assigned to a node end up in that node's blocks, each
//! exactly once.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::*;
    use fc_02_validation::RejectionKind;
    use shared_types::crypto::NodeKeypair;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_partial_batch_becomes_one_block_after_timeout() {
        let fed = Federation::start(FederationConfig::nodes(1)).await;
        let owner = NodeKeypair::generate();
        let txs: Vec<_> = (1..=5).map(|n| create_tx(&owner, n)).collect();

        for tx in &txs {
            fed.submit(tx, 0).await;
        }
        for tx in &txs {
            fed.wait_until_not_pending(&tx.id).await;
        }

        let mut block_ids = HashSet::new();
        for tx in &txs {
            let blocks = fed.store.blocks_containing_transaction(&tx.id).await.unwrap();
            assert_eq!(blocks.len(), 1, "tx {} in exactly one block", tx.id);
            block_ids.insert(blocks[0].id.clone());
        }
        assert_eq!(block_ids.len(), 1);

        let block = fed.wait_for_block(&txs[0].id).await;
        assert_eq!(block.len(), txs.len());
        let embedded: HashSet<&str> = block.transaction_ids().collect();
        assert_eq!(embedded.len(), txs.len());
        assert_eq!(block.block.node_pubkey, fed.public_key(0));
        assert_eq!(fed.node(0).block_metrics.snapshot().blocks_written, 1);

        fed.stop().await;
    }

    #[tokio::test]
    async fn test_full_batch_flushes_without_waiting() {
        let mut config = FederationConfig::nodes(1);
        config.pipeline.batch_size = 3;
        config.pipeline.flush_timeout_ms = 60_000;
        let fed = Federation::start(config).await;
        let owner = NodeKeypair::generate();

        let txs: Vec<_> = (1..=3).map(|n| create_tx(&owner, n)).collect();
        for tx in &txs {
            fed.submit(tx, 0).await;
        }

        let block = fed.wait_for_block(&txs[2].id).await;
        assert_eq!(block.len(), 3);

        fed.stop().await;
    }

    #[tokio::test]
    async fn test_resubmitted_transaction_embedded_once() {
        let fed = Federation::start(FederationConfig::nodes(1)).await;
        let tx = create_tx(&NodeKeypair::generate(), 7);

        fed.submit(&tx, 0).await;
        let first = fed.wait_for_block(&tx.id).await;
        fed.wait_until_not_pending(&tx.id).await;

        fed.submit(&tx, 0).await;
        fed.wait_until_not_pending(&tx.id).await;

        let blocks = fed.store.blocks_containing_transaction(&tx.id).await.unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].id, first.id);

        let validation = fed.node(0).block_metrics.snapshot().validation;
        assert_eq!(validation.rejected(RejectionKind::Duplicate), 1);

        fed.stop().await;
    }

    #[tokio::test]
    async fn test_foreign_assignment_left_alone() {
        let fed = Federation::start(FederationConfig {
            running: 1,
            silent: 1,
            ..FederationConfig::default()
        })
        .await;
        let tx = create_tx(&NodeKeypair::generate(), 1);

        fed.submit(&tx, 1).await;
        tokio::time::sleep(std::time::Duration::from_millis(400)).await;

        assert!(fed.store.get_pending(&tx.id).await.unwrap().is_some());
        assert!(fed
            .store
            .blocks_containing_transaction(&tx.id)
            .await
            .unwrap()
            .is_empty());

        fed.stop().await;
    }
}
