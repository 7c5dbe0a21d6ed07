//! # Genesis Bootstrap
//!
//! The genesis block is the root of every node's vote chain:
//!
//! - Block number: 0
//! - One CREATE transaction issued by the bootstrapping node
//! - Valid without votes
//!
//! Every node calls [`ensure_genesis`] on start. The first one to write wins;
//! the others find the block in place (or hit the duplicate key) and reuse it.

use fc_01_store::{ignore_duplicate, DocumentStore, StoreError};
use shared_types::entities::{Block, BlockRecord, Output, Transaction};
use shared_types::errors::EntityError;
use shared_types::identity::NodeIdentity;
use shared_types::time::TimeSource;
use thiserror::Error;
use tracing::info;

/// Genesis creation errors.
#[derive(Debug, Error)]
pub enum GenesisError {
    #[error("Failed to build genesis block: {0}")]
    Build(#[from] EntityError),

    #[error("Failed to store genesis block: {0}")]
    Storage(#[from] StoreError),

    /// Another node's genesis won the race but cannot be read back.
    #[error("Genesis block vanished after a concurrent write")]
    Missing,
}

/// Build a signed genesis block for `identity`.
pub fn create_genesis_block(
    identity: &NodeIdentity,
    clock: &dyn TimeSource,
) -> Result<BlockRecord, GenesisError> {
    let keypair = identity.keypair();
    let tx = Transaction::create(
        identity.me().to_string(),
        vec![Output::new(1, vec![identity.me().to_string()])],
        Some(serde_json::json!({ "message": "Federation-Chain genesis" })),
        None,
    )?
    .sign(&[keypair])?;

    let block = Block {
        timestamp: clock.now(),
        block_number: 0,
        transactions: vec![tx],
        node_pubkey: identity.me().to_string(),
        voters: identity.federation().to_vec(),
    };
    Ok(BlockRecord::new(block, keypair)?)
}

/// Return the store's genesis block, writing one first if there is none.
pub async fn ensure_genesis(
    store: &dyn DocumentStore,
    identity: &NodeIdentity,
    clock: &dyn TimeSource,
) -> Result<BlockRecord, GenesisError> {
    if let Some(genesis) = store.genesis_block().await? {
        info!(block_id = %genesis.id, "[fc-node] Genesis block found");
        return Ok(genesis);
    }

    let genesis = create_genesis_block(identity, clock)?;
    if ignore_duplicate(store.put_block(genesis.clone()).await)? {
        info!(block_id = %genesis.id, "[fc-node] Genesis block created");
        return Ok(genesis);
    }
    store.genesis_block().await?.ok_or(GenesisError::Missing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fc_01_store::StoreHandle;
    use shared_types::crypto::NodeKeypair;
    use shared_types::time::ManualTimeSource;

    #[test]
    fn test_genesis_shape() {
        let identity = NodeIdentity::solo(NodeKeypair::generate());
        let genesis = create_genesis_block(&identity, &ManualTimeSource::new(42)).unwrap();

        assert!(genesis.is_genesis());
        assert!(genesis.is_authentic());
        assert_eq!(genesis.len(), 1);
        assert_eq!(genesis.block.timestamp, 42);
        assert_eq!(genesis.block.voters, identity.federation().to_vec());
    }

    #[tokio::test]
    async fn test_ensure_genesis_is_idempotent() {
        let handle = StoreHandle::in_memory();
        let identity = NodeIdentity::solo(NodeKeypair::generate());
        let clock = ManualTimeSource::new(1);

        let first = ensure_genesis(handle.store.as_ref(), &identity, &clock)
            .await
            .unwrap();
        clock.advance(10);
        let second = ensure_genesis(handle.store.as_ref(), &identity, &clock)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(handle.store.max_block_number().await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_concurrent_bootstrap_agrees_on_one_genesis() {
        let handle = StoreHandle::in_memory();
        let members = vec![
            NodeKeypair::generate().public_key().to_string(),
            NodeKeypair::generate().public_key().to_string(),
        ];
        let a = NodeIdentity::new(NodeKeypair::generate(), members.clone());
        let b = NodeIdentity::new(NodeKeypair::generate(), members);
        let clock = ManualTimeSource::new(1);

        let (from_a, from_b) = tokio::join!(
            ensure_genesis(handle.store.as_ref(), &a, &clock),
            ensure_genesis(handle.store.as_ref(), &b, &clock),
        );
        let (from_a, from_b) = (from_a.unwrap(), from_b.unwrap());

        assert_eq!(from_a.id, from_b.id);
        let stored = handle.store.genesis_block().await.unwrap().unwrap();
        assert_eq!(stored.id, from_a.id);

        // Genesis is deterministic for a fixed clock, so the loser's block can be rebuilt.
        let loser = if from_a.block.node_pubkey == a.me() { &b } else { &a };
        let lost = create_genesis_block(loser, &clock).unwrap();
        assert!(!handle.store.block_exists(&lost.id).await.unwrap());
    }
}
