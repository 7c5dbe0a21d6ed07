//! # Core Domain Entities
//!
//! The three document kinds the store persists, and the change record that
//! flows through the change feed.
//!
//! ## Collections
//!
//! | Collection | Record                 | Primary key                       |
//! |------------|------------------------|-----------------------------------|
//! | backlog    | [`PendingTransaction`] | `id`                              |
//! | bigchain   | [`BlockRecord`]        | `id`                              |
//! | votes      | [`VoteRecord`]         | (`voting_for_block`, `node_pubkey`) |

use crate::crypto::{canonical_json, sha3_256_hex, verify_signature, NodeKeypair};
use crate::errors::EntityError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Hex SHA3-256 transaction id.
pub type TxId = String;

/// Hex SHA3-256 block id.
pub type BlockId = String;

/// Hex Ed25519 public key.
pub type PublicKey = String;

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// Current transaction format version.
pub const TX_VERSION: u16 = 2;

// =============================================================================
// TRANSACTIONS
// =============================================================================

/// Transaction operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    /// Mints a new asset. Inputs carry no `fulfills` link.
    Create,
    /// Moves outputs of earlier transactions to new owners.
    Transfer,
}

/// Pointer to one output of an earlier transaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputLink {
    pub transaction_id: TxId,
    pub output_index: u32,
}

/// A transaction input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    /// Output being spent. `None` for CREATE.
    pub fulfills: Option<OutputLink>,
    /// Keys that must sign to unlock the referenced output.
    pub owners_before: Vec<PublicKey>,
    /// One hex signature per entry of `owners_before`, over the transaction id.
    #[serde(default)]
    pub fulfillment: Vec<String>,
}

/// A transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub amount: u64,
    /// Locking condition: digest of the owner keys, see [`condition_for`].
    pub condition: String,
    pub public_keys: Vec<PublicKey>,
}

impl Output {
    /// Output locked to every key in `public_keys`.
    pub fn new(amount: u64, public_keys: Vec<PublicKey>) -> Self {
        Self {
            amount,
            condition: condition_for(&public_keys),
            public_keys,
        }
    }
}

/// Locking condition for a set of owner keys.
pub fn condition_for(public_keys: &[PublicKey]) -> String {
    format!("sha3-256:{}", sha3_256_hex(public_keys.join(",").as_bytes()))
}

/// Asset reference. CREATE carries `data`, TRANSFER carries the asset `id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<TxId>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub data: Option<Value>,
}

/// A federation transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TxId,
    pub operation: Operation,
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    pub asset: Asset,
    pub metadata: Option<Value>,
    pub version: u16,
}

/// The hashed body of a transaction: everything but the id, fulfillments blanked.
#[derive(Serialize)]
struct TransactionBody<'a> {
    operation: Operation,
    inputs: Vec<InputBody<'a>>,
    outputs: &'a [Output],
    asset: &'a Asset,
    metadata: &'a Option<Value>,
    version: u16,
}

#[derive(Serialize)]
struct InputBody<'a> {
    fulfills: &'a Option<OutputLink>,
    owners_before: &'a [PublicKey],
}

impl Transaction {
    /// Unsigned CREATE minting `outputs` for an asset described by `data`.
    pub fn create(
        issuer: PublicKey,
        outputs: Vec<Output>,
        data: Option<Value>,
        metadata: Option<Value>,
    ) -> Result<Self, EntityError> {
        Self::build(
            Operation::Create,
            vec![Input {
                fulfills: None,
                owners_before: vec![issuer],
                fulfillment: Vec::new(),
            }],
            outputs,
            Asset { id: None, data },
            metadata,
        )
    }

    /// Unsigned TRANSFER spending `spends` of asset `asset_id`.
    ///
    /// Each spend pairs the output link with the keys that own it.
    pub fn transfer(
        spends: Vec<(OutputLink, Vec<PublicKey>)>,
        outputs: Vec<Output>,
        asset_id: TxId,
        metadata: Option<Value>,
    ) -> Result<Self, EntityError> {
        let inputs = spends
            .into_iter()
            .map(|(link, owners_before)| Input {
                fulfills: Some(link),
                owners_before,
                fulfillment: Vec::new(),
            })
            .collect();
        Self::build(
            Operation::Transfer,
            inputs,
            outputs,
            Asset {
                id: Some(asset_id),
                data: None,
            },
            metadata,
        )
    }

    fn build(
        operation: Operation,
        inputs: Vec<Input>,
        outputs: Vec<Output>,
        asset: Asset,
        metadata: Option<Value>,
    ) -> Result<Self, EntityError> {
        let mut tx = Self {
            id: String::new(),
            operation,
            inputs,
            outputs,
            asset,
            metadata,
            version: TX_VERSION,
        };
        tx.id = tx.compute_id()?;
        Ok(tx)
    }

    /// Recompute the content id from the body.
    pub fn compute_id(&self) -> Result<TxId, EntityError> {
        let body = TransactionBody {
            operation: self.operation,
            inputs: self
                .inputs
                .iter()
                .map(|i| InputBody {
                    fulfills: &i.fulfills,
                    owners_before: &i.owners_before,
                })
                .collect(),
            outputs: &self.outputs,
            asset: &self.asset,
            metadata: &self.metadata,
            version: self.version,
        };
        Ok(sha3_256_hex(&canonical_json(&body)?))
    }

    /// Fill every input's fulfillment with signatures from `keys`.
    pub fn sign(mut self, keys: &[&NodeKeypair]) -> Result<Self, EntityError> {
        for input in &mut self.inputs {
            let mut fulfillment = Vec::with_capacity(input.owners_before.len());
            for owner in &input.owners_before {
                let key = keys
                    .iter()
                    .find(|k| k.public_key() == owner)
                    .ok_or_else(|| EntityError::MissingSigningKey {
                        public_key: owner.clone(),
                    })?;
                fulfillment.push(key.sign(self.id.as_bytes()));
            }
            input.fulfillment = fulfillment;
        }
        Ok(self)
    }

    /// The asset id this transaction moves: its own id for CREATE.
    pub fn asset_id(&self) -> Option<&str> {
        match self.operation {
            Operation::Create => Some(&self.id),
            Operation::Transfer => self.asset.id.as_deref(),
        }
    }

    /// Link to output `index` of this transaction.
    pub fn output_link(&self, index: u32) -> OutputLink {
        OutputLink {
            transaction_id: self.id.clone(),
            output_index: index,
        }
    }
}

/// A transaction sitting in the pending set with its assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingTransaction {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub assignee: PublicKey,
    pub assignment_timestamp: Timestamp,
}

impl PendingTransaction {
    pub fn new(transaction: Transaction, assignee: PublicKey, assignment_timestamp: Timestamp) -> Self {
        Self {
            transaction,
            assignee,
            assignment_timestamp,
        }
    }

    pub fn id(&self) -> &str {
        &self.transaction.id
    }
}

// =============================================================================
// BLOCKS
// =============================================================================

/// Block body. Hashed to produce the block id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub timestamp: Timestamp,
    pub block_number: u64,
    pub transactions: Vec<Transaction>,
    pub node_pubkey: PublicKey,
    pub voters: Vec<PublicKey>,
}

/// Persisted block document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub id: BlockId,
    pub block: Block,
    /// Creator's signature over the block id.
    pub signature: String,
    /// Legacy embedded votes. Always empty; votes live in their own collection.
    #[serde(default)]
    pub votes: Vec<VoteRecord>,
}

impl BlockRecord {
    /// Hash and sign `block` with the creator's key.
    ///
    /// Fails on an empty transaction list.
    pub fn new(block: Block, creator: &NodeKeypair) -> Result<Self, EntityError> {
        if block.transactions.is_empty() {
            return Err(EntityError::EmptyBlock);
        }
        let id = sha3_256_hex(&canonical_json(&block)?);
        let signature = creator.sign(id.as_bytes());
        Ok(Self {
            id,
            block,
            signature,
            votes: Vec::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.block.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.block.transactions.is_empty()
    }

    pub fn is_genesis(&self) -> bool {
        self.block.block_number == 0
    }

    pub fn transaction_ids(&self) -> impl Iterator<Item = &str> {
        self.block.transactions.iter().map(|tx| tx.id.as_str())
    }

    /// Recomputed id matches and the creator's signature verifies.
    pub fn is_authentic(&self) -> bool {
        match canonical_json(&self.block) {
            Ok(bytes) => {
                sha3_256_hex(&bytes) == self.id
                    && verify_signature(&self.block.node_pubkey, self.id.as_bytes(), &self.signature)
            }
            Err(_) => false,
        }
    }
}

// =============================================================================
// VOTES
// =============================================================================

/// Vote body. Signed by the voting node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub voting_for_block: BlockId,
    pub previous_block: BlockId,
    pub is_block_valid: bool,
    pub invalid_reason: Option<String>,
    pub timestamp: Timestamp,
}

/// Persisted vote document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub node_pubkey: PublicKey,
    pub signature: String,
    pub vote: Vote,
}

impl VoteRecord {
    /// Sign `vote` with the voting node's key.
    pub fn sign(vote: Vote, voter: &NodeKeypair) -> Result<Self, EntityError> {
        let signature = voter.sign(&canonical_json(&vote)?);
        Ok(Self {
            node_pubkey: voter.public_key().to_string(),
            signature,
            vote,
        })
    }

    pub fn verify(&self) -> bool {
        canonical_json(&self.vote)
            .map(|body| verify_signature(&self.node_pubkey, &body, &self.signature))
            .unwrap_or(false)
    }
}

// =============================================================================
// CHANGE RECORDS
// =============================================================================

/// Any document the store holds, as carried by change events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Document {
    Block(BlockRecord),
    Vote(VoteRecord),
    Pending(PendingTransaction),
}

impl Document {
    pub fn as_block(&self) -> Option<&BlockRecord> {
        match self {
            Document::Block(b) => Some(b),
            _ => None,
        }
    }

    pub fn into_block(self) -> Option<BlockRecord> {
        match self {
            Document::Block(b) => Some(b),
            _ => None,
        }
    }

    pub fn into_vote(self) -> Option<VoteRecord> {
        match self {
            Document::Vote(v) => Some(v),
            _ => None,
        }
    }

    pub fn into_pending(self) -> Option<PendingTransaction> {
        match self {
            Document::Pending(p) => Some(p),
            _ => None,
        }
    }
}
