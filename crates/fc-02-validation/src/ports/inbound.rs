//! # Inbound Port
//!
//! The validator as the pipelines see it. Implementations are read-only
//! against the store.

use crate::domain::errors::Result;
use async_trait::async_trait;
use shared_types::entities::{BlockId, Transaction};

/// Extra facts about where the transaction is being validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationContext {
    /// Block under evaluation. Its own copy of the transaction is not a
    /// duplicate.
    pub exclude_block: Option<BlockId>,
}

impl ValidationContext {
    /// Validating a pending transaction before it enters a block.
    pub fn pending() -> Self {
        Self::default()
    }

    /// Re-validating a transaction as part of `block_id`.
    pub fn in_block(block_id: impl Into<BlockId>) -> Self {
        Self {
            exclude_block: Some(block_id.into()),
        }
    }
}

/// Transaction validity check.
#[async_trait]
pub trait TransactionValidator: Send + Sync {
    async fn validate(&self, tx: &Transaction, ctx: &ValidationContext) -> Result<()>;
}

// =============================================================================
// TEST DOUBLE
// =============================================================================

#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockValidator;

#[cfg(any(test, feature = "test-utils"))]
mod mock {
    use super::*;
    use crate::domain::errors::ValidationError;
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Accepts everything except the ids it was told to reject.
    #[derive(Debug, Default)]
    pub struct MockValidator {
        rejected: Mutex<HashSet<String>>,
        calls: AtomicUsize,
        contexts: Mutex<Vec<ValidationContext>>,
    }

    impl MockValidator {
        pub fn accept_all() -> Self {
            Self::default()
        }

        pub fn rejecting<I, S>(ids: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            let mock = Self::default();
            mock.rejected.lock().extend(ids.into_iter().map(Into::into));
            mock
        }

        pub fn reject(&self, id: impl Into<String>) {
            self.rejected.lock().insert(id.into());
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn contexts(&self) -> Vec<ValidationContext> {
            self.contexts.lock().clone()
        }
    }

    #[async_trait]
    impl TransactionValidator for MockValidator {
        async fn validate(&self, tx: &Transaction, ctx: &ValidationContext) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.contexts.lock().push(ctx.clone());
            if self.rejected.lock().contains(&tx.id) {
                return Err(ValidationError::Schema("rejected by mock".into()));
            }
            Ok(())
        }
    }
}
