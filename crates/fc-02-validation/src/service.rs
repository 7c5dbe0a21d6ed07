//! # Federation Validator
//!
//! The default [`TransactionValidator`], answering every stateful question
//! through the document store.
//!
//! ## Check Order
//!
//! ```text
//! structure ─→ fulfillments ─→ duplicate ─→ (TRANSFER only)
//!                                            ├─ input in a valid block
//!                                            ├─ owners match the output
//!                                            ├─ output not spent by a live tx
//!                                            ├─ asset ids agree
//!                                            └─ amounts conserved
//! ```
//!
//! "Live" means valid or still undecided: an output spent by a transaction
//! in an undecided block stays spent until that block is voted invalid.

use crate::domain::errors::{Result, ValidationError};
use crate::domain::rules;
use crate::metrics::ValidationMetrics;
use crate::ports::inbound::{TransactionValidator, ValidationContext};
use async_trait::async_trait;
use fc_01_store::{DocumentStore, StoreError};
use shared_types::election::{block_status, ElectionStatus};
use shared_types::entities::{BlockRecord, Operation, OutputLink, Transaction};
use std::sync::Arc;
use tracing::{debug, warn};

/// Election status of a stored block, from the votes the store holds.
pub async fn election_status<S>(
    store: &S,
    block: &BlockRecord,
) -> std::result::Result<ElectionStatus, StoreError>
where
    S: DocumentStore + ?Sized,
{
    if block.is_genesis() {
        return Ok(ElectionStatus::Valid);
    }
    let votes = store.votes_for_block(&block.id).await?;
    Ok(block_status(block, &votes))
}

/// Run `validator`, logging and counting a rejection.
///
/// Returns the rejection reason, or `None` for a valid transaction. A store
/// failure of any kind escapes as an error: the transaction was never judged,
/// so it must not be voted down or dropped from the backlog.
pub async fn verdict<V>(
    validator: &V,
    tx: &Transaction,
    ctx: &ValidationContext,
    metrics: &ValidationMetrics,
) -> std::result::Result<Option<ValidationError>, StoreError>
where
    V: TransactionValidator + ?Sized,
{
    match validator.validate(tx, ctx).await {
        Ok(()) => {
            metrics.record_accepted();
            Ok(None)
        }
        Err(ValidationError::Store(err)) => Err(err),
        Err(err) => {
            metrics.record_rejected(err.kind());
            if err.is_duplicate() {
                debug!(tx_id = %tx.id, reason = %err.kind(), "[fc-02] Transaction rejected: {}", err);
            } else {
                warn!(tx_id = %tx.id, reason = %err.kind(), "[fc-02] Transaction rejected: {}", err);
            }
            Ok(Some(err))
        }
    }
}

/// [`verdict`] as a filter: the transaction if valid, nothing otherwise.
pub async fn screen<V>(
    validator: &V,
    tx: Transaction,
    ctx: &ValidationContext,
    metrics: &ValidationMetrics,
) -> std::result::Result<Option<Transaction>, StoreError>
where
    V: TransactionValidator + ?Sized,
{
    let rejected = verdict(validator, &tx, ctx, metrics).await?;
    Ok(rejected.is_none().then_some(tx))
}

/// Validator backed by the federation's document store.
pub struct FederationValidator<S: ?Sized> {
    store: Arc<S>,
}

impl<S: DocumentStore + ?Sized> FederationValidator<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    async fn check_not_duplicate(&self, tx: &Transaction, ctx: &ValidationContext) -> Result<()> {
        for block in self.store.blocks_containing_transaction(&tx.id).await? {
            if ctx.exclude_block.as_deref() == Some(block.id.as_str()) {
                continue;
            }
            if election_status(self.store.as_ref(), &block).await?.is_live() {
                return Err(ValidationError::Duplicate {
                    tx_id: tx.id.clone(),
                    block_id: block.id,
                });
            }
        }
        Ok(())
    }

    /// The transaction behind `link`, taken from a valid block.
    async fn input_transaction(&self, link: &OutputLink) -> Result<Transaction> {
        let blocks = self
            .store
            .blocks_containing_transaction(&link.transaction_id)
            .await?;
        if blocks.is_empty() {
            return Err(ValidationError::InputDoesNotExist { link: link.clone() });
        }
        for block in blocks {
            if election_status(self.store.as_ref(), &block).await? != ElectionStatus::Valid {
                continue;
            }
            if let Some(tx) = block
                .block
                .transactions
                .into_iter()
                .find(|t| t.id == link.transaction_id)
            {
                return Ok(tx);
            }
        }
        Err(ValidationError::InputNotInValidBlock {
            tx_id: link.transaction_id.clone(),
        })
    }

    async fn check_unspent(&self, tx: &Transaction, link: &OutputLink) -> Result<()> {
        for spender in self.store.spenders_of(link).await? {
            if spender.transaction_id == tx.id {
                continue;
            }
            let Some(block) = self.store.get_block(&spender.block_id).await? else {
                continue;
            };
            if election_status(self.store.as_ref(), &block).await?.is_live() {
                return Err(ValidationError::DoubleSpend {
                    link: link.clone(),
                    spender: spender.transaction_id,
                });
            }
        }
        Ok(())
    }

    async fn check_transfer(&self, tx: &Transaction) -> Result<()> {
        let asset_id = tx.asset.id.as_deref().unwrap_or_default();
        let mut input_total: u64 = 0;

        for (i, input) in tx.inputs.iter().enumerate() {
            let Some(link) = &input.fulfills else {
                return Err(ValidationError::Schema(format!("input {i} has no link")));
            };
            let input_tx = self.input_transaction(link).await?;
            let output = input_tx
                .outputs
                .get(link.output_index as usize)
                .ok_or_else(|| ValidationError::InputDoesNotExist { link: link.clone() })?;

            if output.public_keys != input.owners_before {
                return Err(ValidationError::OwnerMismatch { input: i });
            }
            self.check_unspent(tx, link).await?;

            if input_tx.asset_id() != Some(asset_id) {
                return Err(ValidationError::AssetMismatch(format!(
                    "input {i} moves asset {:?}, transaction declares {asset_id}",
                    input_tx.asset_id()
                )));
            }
            input_total = input_total
                .checked_add(output.amount)
                .ok_or_else(|| ValidationError::Schema("input amount overflow".into()))?;
        }

        let output_total = tx
            .outputs
            .iter()
            .try_fold(0u64, |acc, o| acc.checked_add(o.amount))
            .ok_or_else(|| ValidationError::Schema("output amount overflow".into()))?;
        if input_total != output_total {
            return Err(ValidationError::AmountMismatch {
                inputs: input_total,
                outputs: output_total,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl<S: DocumentStore + ?Sized> TransactionValidator for FederationValidator<S> {
    async fn validate(&self, tx: &Transaction, ctx: &ValidationContext) -> Result<()> {
        rules::check_structure(tx)?;
        rules::check_fulfillments(tx)?;
        self.check_not_duplicate(tx, ctx).await?;
        match tx.operation {
            Operation::Create => Ok(()),
            Operation::Transfer => self.check_transfer(tx).await,
        }
    }
}
