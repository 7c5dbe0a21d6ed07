//! # Key-Value Document Store
//!
//! [`DocumentStore`] over any ordered [`KeyValueStore`]. Documents are JSON;
//! every index entry is written in the same atomic batch as its document.
//!
//! ## Write path
//!
//! ```text
//! put_block(b) ──► lock ──► exists? ──yes──► DuplicateKey
//!                             │no
//!                             ▼
//!                     batch [doc + indexes] ──► publish insert event
//! ```
//!
//! Check-then-write runs under one async mutex, so two writers can never both
//! pass the uniqueness check. Reads take no lock.

use crate::domain::errors::{Result, StoreError};
use crate::domain::keys;
use crate::ports::inbound::{DocumentStore, Spender};
use crate::ports::outbound::{BatchOperation, KeyValueStore};
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_bus::{ChangeBus, ChangeEvent, ChangeFilter, ChangeOp, ChangePublisher, Collection, Subscription};
use shared_types::entities::{
    BlockRecord, Document, OutputLink, PendingTransaction, Timestamp, TxId, VoteRecord,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Document store over a key-value engine.
pub struct KvDocumentStore<K> {
    kv: K,
    bus: Arc<ChangeBus>,
    retry: RetryPolicy,
    write_lock: Mutex<()>,
}

impl<K: KeyValueStore> KvDocumentStore<K> {
    pub fn new(kv: K, bus: Arc<ChangeBus>, retry: RetryPolicy) -> Self {
        Self {
            kv,
            bus,
            retry,
            write_lock: Mutex::new(()),
        }
    }

    /// Bus carrying this store's change events.
    pub fn change_bus(&self) -> Arc<ChangeBus> {
        self.bus.clone()
    }

    pub fn engine(&self) -> &K {
        &self.kv
    }

    async fn read<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>> {
        let raw = self.retry.run("get", || self.kv.get(key)).await?;
        raw.map(|bytes| decode(key, &bytes)).transpose()
    }

    async fn exists(&self, key: &[u8]) -> Result<bool> {
        self.retry.run("exists", || self.kv.exists(key)).await
    }

    async fn scan(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.retry.run("scan", || self.kv.prefix_scan(prefix)).await
    }

    /// Values of an index scan, read as UTF-8 ids.
    async fn scan_ids(&self, prefix: &[u8]) -> Result<Vec<String>> {
        Ok(self
            .scan(prefix)
            .await?
            .into_iter()
            .filter_map(|(_, v)| String::from_utf8(v).ok())
            .collect())
    }

    async fn write(&self, ops: Vec<BatchOperation>) -> Result<()> {
        // The closure may run more than once; each attempt needs its own copy.
        self.retry
            .run("batch write", || self.kv.atomic_batch_write(ops.clone()))
            .await
    }

    fn publish(&self, event: ChangeEvent) {
        self.bus.publish(event);
    }

    async fn blocks_by_ids(&self, ids: Vec<String>) -> Result<Vec<BlockRecord>> {
        let mut blocks = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(block) = self.read::<BlockRecord>(&keys::block(&id)).await? {
                blocks.push(block);
            }
        }
        Ok(blocks)
    }

    async fn pending_by_ids(&self, ids: Vec<String>) -> Result<Vec<PendingTransaction>> {
        let mut records = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(p) = self.read::<PendingTransaction>(&keys::pending(&id)).await? {
                records.push(p);
            }
        }
        Ok(records)
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

fn decode<T: DeserializeOwned>(key: &[u8], bytes: &[u8]) -> Result<T> {
    serde_json::from_slice(bytes).map_err(|e| {
        StoreError::Serialization(format!("{}: {e}", String::from_utf8_lossy(key)))
    })
}

fn pending_index_ops(p: &PendingTransaction, id_bytes: &[u8]) -> Vec<BatchOperation> {
    vec![
        BatchOperation::put(keys::pending_by_assignee(p), id_bytes.to_vec()),
        BatchOperation::put(keys::pending_by_time(p), id_bytes.to_vec()),
    ]
}

fn block_index_keys(b: &BlockRecord) -> Vec<Vec<u8>> {
    let mut out = vec![keys::block_by_time(b), keys::block_by_number(b)];
    for tx in &b.block.transactions {
        out.push(keys::block_by_tx(&tx.id, &b.id));
        for link in tx.inputs.iter().filter_map(|i| i.fulfills.as_ref()) {
            out.push(keys::spent(link, &tx.id, &b.id));
        }
    }
    out
}

#[async_trait]
impl<K: KeyValueStore> DocumentStore for KvDocumentStore<K> {
    async fn put_pending(&self, tx: PendingTransaction) -> Result<()> {
        let key = keys::pending(tx.id());
        let _guard = self.write_lock.lock().await;
        if self.exists(&key).await? {
            return Err(StoreError::DuplicateKey {
                collection: "backlog",
                key: tx.id().to_string(),
            });
        }

        let mut ops = vec![BatchOperation::put(key, encode(&tx)?)];
        ops.extend(pending_index_ops(&tx, tx.id().as_bytes()));
        self.write(ops).await?;

        debug!(tx_id = %tx.id(), assignee = %tx.assignee, "Pending transaction stored");
        self.publish(ChangeEvent::insert(Collection::Backlog, Document::Pending(tx)));
        Ok(())
    }

    async fn get_pending(&self, id: &str) -> Result<Option<PendingTransaction>> {
        self.read(&keys::pending(id)).await
    }

    async fn delete_pending(&self, ids: &[TxId]) -> Result<usize> {
        let _guard = self.write_lock.lock().await;
        let mut removed = Vec::new();
        let mut ops = Vec::new();
        for id in ids {
            let key = keys::pending(id);
            if let Some(p) = self.read::<PendingTransaction>(&key).await? {
                ops.push(BatchOperation::delete(key));
                ops.push(BatchOperation::delete(keys::pending_by_assignee(&p)));
                ops.push(BatchOperation::delete(keys::pending_by_time(&p)));
                removed.push(p);
            }
        }
        if removed.is_empty() {
            return Ok(0);
        }
        self.write(ops).await?;

        let count = removed.len();
        for p in removed {
            self.publish(ChangeEvent::delete(Collection::Backlog, Document::Pending(p)));
        }
        Ok(count)
    }

    async fn range_by_assignee(&self, node: &str) -> Result<Vec<PendingTransaction>> {
        let ids = self.scan_ids(&keys::assignee_prefix(node)).await?;
        self.pending_by_ids(ids).await
    }

    async fn update_assignment(
        &self,
        id: &str,
        node: &str,
        timestamp: Timestamp,
    ) -> Result<PendingTransaction> {
        let key = keys::pending(id);
        let _guard = self.write_lock.lock().await;
        let old: PendingTransaction =
            self.read(&key).await?.ok_or_else(|| StoreError::NotFound {
                collection: "backlog",
                key: id.to_string(),
            })?;

        let mut new = old.clone();
        new.assignee = node.to_string();
        new.assignment_timestamp = timestamp;

        let mut ops = vec![
            BatchOperation::delete(keys::pending_by_assignee(&old)),
            BatchOperation::delete(keys::pending_by_time(&old)),
            BatchOperation::put(key, encode(&new)?),
        ];
        ops.extend(pending_index_ops(&new, id.as_bytes()));
        self.write(ops).await?;

        self.publish(ChangeEvent::update(
            Collection::Backlog,
            Document::Pending(old),
            Document::Pending(new.clone()),
        ));
        Ok(new)
    }

    async fn stale_pending(&self, older_than: Timestamp) -> Result<Vec<PendingTransaction>> {
        let ids: Vec<String> = self
            .scan(keys::BACKLOG_BY_TIME.as_bytes())
            .await?
            .into_iter()
            .take_while(|(k, _)| keys::timestamp_of_time_key(k).is_some_and(|ts| ts < older_than))
            .filter_map(|(_, v)| String::from_utf8(v).ok())
            .collect();
        self.pending_by_ids(ids).await
    }

    async fn put_block(&self, block: BlockRecord) -> Result<()> {
        let key = keys::block(&block.id);
        let _guard = self.write_lock.lock().await;
        if self.exists(&key).await? {
            return Err(StoreError::DuplicateKey {
                collection: "bigchain",
                key: block.id.clone(),
            });
        }

        let id_bytes = block.id.as_bytes().to_vec();
        let mut ops = vec![BatchOperation::put(key, encode(&block)?)];
        ops.extend(
            block_index_keys(&block)
                .into_iter()
                .map(|k| BatchOperation::put(k, id_bytes.clone())),
        );
        if block.is_genesis() {
            // One genesis per store. A restored genesis has the same id.
            let current = self.retry.run("get", || self.kv.get(&keys::genesis())).await?;
            match current {
                Some(existing) if existing != id_bytes => {
                    return Err(StoreError::DuplicateKey {
                        collection: "bigchain",
                        key: "genesis".to_string(),
                    });
                }
                Some(_) => {}
                None => ops.push(BatchOperation::put(keys::genesis(), id_bytes)),
            }
        }
        self.write(ops).await?;

        debug!(block_id = %block.id, txs = block.len(), "Block stored");
        self.publish(ChangeEvent::insert(Collection::Bigchain, Document::Block(block)));
        Ok(())
    }

    async fn get_block(&self, id: &str) -> Result<Option<BlockRecord>> {
        self.read(&keys::block(id)).await
    }

    async fn block_exists(&self, id: &str) -> Result<bool> {
        self.exists(&keys::block(id)).await
    }

    async fn delete_block(&self, id: &str) -> Result<Option<BlockRecord>> {
        let key = keys::block(id);
        let _guard = self.write_lock.lock().await;
        let Some(block) = self.read::<BlockRecord>(&key).await? else {
            return Ok(None);
        };

        let mut ops = vec![BatchOperation::delete(key)];
        ops.extend(block_index_keys(&block).into_iter().map(BatchOperation::delete));
        if block.is_genesis() {
            ops.push(BatchOperation::delete(keys::genesis()));
        }
        self.write(ops).await?;

        self.publish(ChangeEvent::delete(
            Collection::Bigchain,
            Document::Block(block.clone()),
        ));
        Ok(Some(block))
    }

    async fn blocks_containing_transaction(&self, tx_id: &str) -> Result<Vec<BlockRecord>> {
        let ids = self.scan_ids(&keys::block_by_tx_prefix(tx_id)).await?;
        self.blocks_by_ids(ids).await
    }

    async fn spenders_of(&self, link: &OutputLink) -> Result<Vec<Spender>> {
        Ok(self
            .scan(&keys::spent_prefix(link))
            .await?
            .into_iter()
            .filter_map(|(k, v)| {
                Some(Spender {
                    transaction_id: keys::spender_of_spent_key(&k)?,
                    block_id: String::from_utf8(v).ok()?,
                })
            })
            .collect())
    }

    async fn unvoted_blocks(&self, node: &str) -> Result<Vec<BlockRecord>> {
        let ids = self.scan_ids(keys::BIGCHAIN_BY_TIME.as_bytes()).await?;
        let mut unvoted = Vec::new();
        for id in ids {
            if self.exists(&keys::vote(&id, node)).await? {
                continue;
            }
            if let Some(block) = self.get_block(&id).await? {
                if !block.is_genesis() {
                    unvoted.push(block);
                }
            }
        }
        Ok(unvoted)
    }

    async fn max_block_number(&self) -> Result<Option<u64>> {
        Ok(self
            .scan(keys::BIGCHAIN_BY_NUMBER.as_bytes())
            .await?
            .last()
            .and_then(|(k, _)| keys::number_of_number_key(&k)))
    }

    async fn genesis_block(&self) -> Result<Option<BlockRecord>> {
        let raw = self.retry.run("get", || self.kv.get(&keys::genesis())).await?;
        match raw.and_then(|v| String::from_utf8(v).ok()) {
            Some(id) => self.get_block(&id).await,
            None => Ok(None),
        }
    }

    async fn put_vote(&self, vote: VoteRecord) -> Result<()> {
        let block_id = vote.vote.voting_for_block.clone();
        let key = keys::vote(&block_id, &vote.node_pubkey);
        let _guard = self.write_lock.lock().await;
        if self.exists(&key).await? {
            return Err(StoreError::DuplicateKey {
                collection: "votes",
                key: format!("{}/{}", block_id, vote.node_pubkey),
            });
        }

        self.write(vec![
            BatchOperation::put(key, encode(&vote)?),
            BatchOperation::put(
                keys::vote_by_node(&vote.node_pubkey, &block_id),
                block_id.as_bytes().to_vec(),
            ),
        ])
        .await?;

        debug!(block_id = %block_id, voter = %vote.node_pubkey, "Vote stored");
        self.publish(ChangeEvent::insert(Collection::Votes, Document::Vote(vote)));
        Ok(())
    }

    async fn votes_for_block(&self, block_id: &str) -> Result<Vec<VoteRecord>> {
        self.scan(&keys::votes_for_block_prefix(block_id))
            .await?
            .into_iter()
            .map(|(k, v)| decode(&k, &v))
            .collect()
    }

    async fn vote_by_node(&self, block_id: &str, node: &str) -> Result<Option<VoteRecord>> {
        self.read(&keys::vote(block_id, node)).await
    }

    async fn votes_by_node(&self, node: &str) -> Result<Vec<VoteRecord>> {
        let block_ids = self.scan_ids(&keys::votes_by_node_prefix(node)).await?;
        let mut votes = Vec::with_capacity(block_ids.len());
        for block_id in block_ids {
            if let Some(vote) = self.vote_by_node(&block_id, node).await? {
                votes.push(vote);
            }
        }
        Ok(votes)
    }

    fn subscribe(&self, collection: Collection, ops: &[ChangeOp]) -> Subscription {
        self.bus.subscribe(ChangeFilter::new(collection, ops.to_vec()))
    }
}
