//! # Validation Errors
//!
//! Every reason a transaction can be refused. A refusal filters the
//! transaction out of its stage; it never stops the stage.

use fc_01_store::StoreError;
use shared_types::entities::{OutputLink, TxId};
use std::fmt;
use thiserror::Error;

/// Result type alias for validation.
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Why a transaction was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Malformed transaction body.
    #[error("Schema violation: {0}")]
    Schema(String),

    /// Stored id does not match the hash of the body.
    #[error("Transaction id mismatch: expected {expected}, got {actual}")]
    IdMismatch { expected: TxId, actual: TxId },

    /// A fulfillment does not verify against its owner key.
    #[error("Invalid fulfillment on input {input}")]
    InvalidSignature { input: usize },

    /// Already embedded in a valid or undecided block.
    #[error("Transaction {tx_id} already in block {block_id}")]
    Duplicate { tx_id: TxId, block_id: String },

    /// Input points at a transaction or output that does not exist.
    #[error("Input {link:?} does not exist")]
    InputDoesNotExist { link: OutputLink },

    /// Input transaction exists but no valid block holds it yet.
    #[error("Input transaction {tx_id} is not in a valid block")]
    InputNotInValidBlock { tx_id: TxId },

    /// `owners_before` differs from the keys locking the spent output.
    #[error("Input {input} owners do not match the spent output")]
    OwnerMismatch { input: usize },

    /// The output is already spent by a live transaction.
    #[error("Output {link:?} already spent by {spender}")]
    DoubleSpend { link: OutputLink, spender: TxId },

    /// Output total differs from input total.
    #[error("Amount mismatch: inputs {inputs}, outputs {outputs}")]
    AmountMismatch { inputs: u64, outputs: u64 },

    /// Inputs or the declared asset id disagree.
    #[error("Asset mismatch: {0}")]
    AssetMismatch(String),

    /// The store could not answer a lookup.
    #[error("Store error during validation: {0}")]
    Store(#[from] StoreError),
}

/// Coarse reason class, used for logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionKind {
    Schema,
    Signature,
    Duplicate,
    MissingInput,
    DoubleSpend,
    Amount,
    Asset,
    Store,
}

impl RejectionKind {
    pub const ALL: [RejectionKind; 8] = [
        RejectionKind::Schema,
        RejectionKind::Signature,
        RejectionKind::Duplicate,
        RejectionKind::MissingInput,
        RejectionKind::DoubleSpend,
        RejectionKind::Amount,
        RejectionKind::Asset,
        RejectionKind::Store,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RejectionKind::Schema => "schema",
            RejectionKind::Signature => "signature",
            RejectionKind::Duplicate => "duplicate",
            RejectionKind::MissingInput => "missing_input",
            RejectionKind::DoubleSpend => "double_spend",
            RejectionKind::Amount => "amount",
            RejectionKind::Asset => "asset",
            RejectionKind::Store => "store",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for RejectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ValidationError {
    pub fn kind(&self) -> RejectionKind {
        match self {
            ValidationError::Schema(_) | ValidationError::IdMismatch { .. } => RejectionKind::Schema,
            ValidationError::InvalidSignature { .. } | ValidationError::OwnerMismatch { .. } => {
                RejectionKind::Signature
            }
            ValidationError::Duplicate { .. } => RejectionKind::Duplicate,
            ValidationError::InputDoesNotExist { .. }
            | ValidationError::InputNotInValidBlock { .. } => RejectionKind::MissingInput,
            ValidationError::DoubleSpend { .. } => RejectionKind::DoubleSpend,
            ValidationError::AmountMismatch { .. } => RejectionKind::Amount,
            ValidationError::AssetMismatch(_) => RejectionKind::Asset,
            ValidationError::Store(_) => RejectionKind::Store,
        }
    }

    /// The transaction itself is at fault, as opposed to the store.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, ValidationError::Store(_))
    }

    /// Already embedded elsewhere; the pending copy is redundant.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, ValidationError::Duplicate { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let link = OutputLink {
            transaction_id: "t".into(),
            output_index: 0,
        };
        assert_eq!(
            ValidationError::DoubleSpend {
                link: link.clone(),
                spender: "s".into()
            }
            .kind(),
            RejectionKind::DoubleSpend
        );
        assert_eq!(
            ValidationError::InputDoesNotExist { link }.kind(),
            RejectionKind::MissingInput
        );
        assert_eq!(
            ValidationError::OwnerMismatch { input: 0 }.kind(),
            RejectionKind::Signature
        );
    }

    #[test]
    fn test_store_errors_are_not_rejections() {
        let err = ValidationError::from(StoreError::Connection {
            attempts: 3,
            message: "down".into(),
        });
        assert!(!err.is_rejection());
        assert!(ValidationError::Schema("x".into()).is_rejection());
    }

    #[test]
    fn test_kind_indexes_are_dense() {
        for (i, kind) in RejectionKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }
}
