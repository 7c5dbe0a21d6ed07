//! # Error Types
//!
//! Errors raised while building, hashing or signing records.

use thiserror::Error;

/// Errors from constructing or signing domain records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntityError {
    /// Record could not be encoded to canonical JSON.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// A key or signature was not valid hex or had the wrong length.
    #[error("Invalid key material: {0}")]
    InvalidKey(String),

    /// An input names an owner for which no signing key was supplied.
    #[error("No signing key supplied for owner {public_key}")]
    MissingSigningKey { public_key: String },

    /// Blocks must carry at least one transaction.
    #[error("Refusing to build a block with no transactions")]
    EmptyBlock,
}

impl From<serde_json::Error> for EntityError {
    fn from(err: serde_json::Error) -> Self {
        EntityError::Serialization(err.to_string())
    }
}
