//! # Store Errors
//!
//! Two layers:
//!
//! - [`KVStoreError`]: raw engine failures reported by a [`KeyValueStore`](crate::ports::outbound::KeyValueStore).
//! - [`StoreError`]: what callers of the document store see. Connectivity
//!   problems are kept apart from constraint violations so a duplicate key can
//!   be read as "already applied".

use std::fmt;
use thiserror::Error;

/// Result type alias for document store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by the document store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Engine unreachable after exhausting the retry budget.
    #[error("Store unreachable after {attempts} attempt(s): {message}")]
    Connection { attempts: u32, message: String },

    /// Unique index violation. The record is already present.
    #[error("Duplicate key in {collection}: {key}")]
    DuplicateKey {
        collection: &'static str,
        key: String,
    },

    /// Record required by an update does not exist.
    #[error("Not found in {collection}: {key}")]
    NotFound {
        collection: &'static str,
        key: String,
    },

    /// Record could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Engine reported corrupted data.
    #[error("Corrupted data: {0}")]
    Corrupted(String),
}

impl StoreError {
    /// Constraint violation that callers treat as success.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::DuplicateKey { .. })
    }

    /// Connectivity failure. Fatal for the stage that hit it.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, StoreError::Connection { .. })
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Errors from the key-value engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KVStoreError {
    /// I/O or connectivity failure. Retried.
    IOError { message: String },
    /// Data corruption in the engine. Not retried.
    CorruptionError { message: String },
}

impl fmt::Display for KVStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KVStoreError::IOError { message } => write!(f, "KV store I/O error: {}", message),
            KVStoreError::CorruptionError { message } => {
                write!(f, "KV store corruption: {}", message)
            }
        }
    }
}

impl std::error::Error for KVStoreError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let dup = StoreError::DuplicateKey {
            collection: "bigchain",
            key: "b1".into(),
        };
        assert!(dup.is_duplicate());
        assert!(!dup.is_connectivity());

        let conn = StoreError::Connection {
            attempts: 3,
            message: "refused".into(),
        };
        assert!(conn.is_connectivity());
        assert!(!conn.is_duplicate());
    }

    #[test]
    fn test_display() {
        let err = StoreError::NotFound {
            collection: "backlog",
            key: "tx".into(),
        };
        assert_eq!(err.to_string(), "Not found in backlog: tx");
    }
}
