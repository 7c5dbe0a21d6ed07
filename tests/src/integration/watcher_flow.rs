//! # Watcher Flow
//!
//! Deleted blocks come back, and work assigned to an unresponsive member is
//! picked up by a live one.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::*;
    use fc_05_watchers::WatcherConfig;
    use shared_types::crypto::NodeKeypair;
    use shared_types::time::{SystemTimeSource, TimeSource};

    #[tokio::test]
    async fn test_deleted_block_restored_identically() {
        let fed = Federation::start(FederationConfig::nodes(1).with_watchers()).await;
        let (block, vote) = fed.commit(&create_tx(&NodeKeypair::generate(), 1), 0).await;

        let deleted = fed.store.delete_block(&block.id).await.unwrap();
        assert_eq!(deleted.as_ref(), Some(&block));

        let store = fed.store.clone();
        let id = block.id.clone();
        let restored = eventually("block restored", || {
            let store = store.clone();
            let id = id.clone();
            async move { store.get_block(&id).await.unwrap() }
        })
        .await;
        assert_eq!(restored, block);

        let metrics = fed.node(0).watcher_metrics.clone().unwrap();
        assert_eq!(metrics.snapshot().reverts, 1);

        // The restore is an insert the voter has already voted on.
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        assert_eq!(fed.store.votes_for_block(&block.id).await.unwrap(), vec![vote]);

        fed.stop().await;
    }

    #[tokio::test]
    async fn test_stale_assignment_moves_to_live_member() {
        let fed = Federation::start(FederationConfig {
            running: 1,
            silent: 1,
            watchers: Some(WatcherConfig {
                backlog_reassign_delay_secs: 1,
                stale_check_interval_secs: 1,
            }),
            ..FederationConfig::default()
        })
        .await;
        let tx = create_tx(&NodeKeypair::generate(), 5);

        // Assigned to the silent member long enough ago to be stale.
        let long_ago = SystemTimeSource.now() - 60_000;
        fed.submit_at(&tx, 1, long_ago).await;

        let block = fed.wait_for_block(&tx.id).await;
        assert_eq!(block.block.node_pubkey, fed.public_key(0));

        let metrics = fed.node(0).watcher_metrics.clone().unwrap();
        assert!(metrics.snapshot().reassignments >= 1);

        fed.stop().await;
    }
}
