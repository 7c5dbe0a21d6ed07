//! # Block Assembler
//!
//! Accumulates validated transactions and cuts them into signed blocks.
//!
//! ## Flush Rules
//!
//! | Trigger                        | Result                     |
//! |--------------------------------|----------------------------|
//! | accumulator reaches batch size | block with `batch_size` txs |
//! | timeout, accumulator non-empty | block with what is held    |
//! | timeout, accumulator empty     | nothing                    |
//!
//! A transaction id already held is ignored, so redelivery through the
//! at-least-once feed cannot put the same transaction in a block twice.

use crate::error::Result;
use shared_types::entities::{Block, BlockRecord, Transaction, TxId};
use shared_types::identity::NodeIdentity;
use shared_types::time::TimeSource;
use std::collections::HashSet;
use std::sync::Arc;

pub struct BlockAssembler {
    identity: NodeIdentity,
    clock: Arc<dyn TimeSource>,
    batch_size: usize,
    next_block_number: u64,
    transactions: Vec<Transaction>,
    held: HashSet<TxId>,
}

impl BlockAssembler {
    /// `next_block_number` is the number the first emitted block carries.
    pub fn new(
        identity: NodeIdentity,
        clock: Arc<dyn TimeSource>,
        batch_size: usize,
        next_block_number: u64,
    ) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            identity,
            clock,
            batch_size,
            next_block_number,
            transactions: Vec::with_capacity(batch_size),
            held: HashSet::with_capacity(batch_size),
        }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn next_block_number(&self) -> u64 {
        self.next_block_number
    }

    /// Add a transaction, returning a block if the batch is now full.
    pub fn push(&mut self, tx: Transaction) -> Result<Option<BlockRecord>> {
        if !self.held.insert(tx.id.clone()) {
            return Ok(None);
        }
        self.transactions.push(tx);
        if self.transactions.len() >= self.batch_size {
            return self.flush();
        }
        Ok(None)
    }

    /// Cut a block from whatever is held. Empty accumulators yield nothing.
    pub fn flush(&mut self) -> Result<Option<BlockRecord>> {
        if self.transactions.is_empty() {
            return Ok(None);
        }
        let transactions = std::mem::replace(
            &mut self.transactions,
            Vec::with_capacity(self.batch_size),
        );
        self.held.clear();

        let block = Block {
            timestamp: self.clock.now(),
            block_number: self.next_block_number,
            transactions,
            node_pubkey: self.identity.me().to_string(),
            voters: self.identity.federation().to_vec(),
        };
        let record = BlockRecord::new(block, self.identity.keypair())?;
        self.next_block_number += 1;
        Ok(Some(record))
    }
}
