//! # Node Context
//!
//! Everything a stage needs from the node, handed over at spawn time.

use fc_01_store::DocumentStore;
use fc_02_validation::TransactionValidator;
use shared_types::identity::NodeIdentity;
use shared_types::time::TimeSource;
use std::sync::Arc;
use tokio::sync::watch;

/// Sending half of the node-wide shutdown signal.
pub type ShutdownTx = watch::Sender<bool>;

/// Receiving half of the node-wide shutdown signal.
pub type ShutdownRx = watch::Receiver<bool>;

/// Create the shutdown signal, initially "running".
pub fn shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    watch::channel(false)
}

/// Shared node state passed to every stage.
#[derive(Clone)]
pub struct NodeContext {
    pub identity: NodeIdentity,
    pub store: Arc<dyn DocumentStore>,
    pub validator: Arc<dyn TransactionValidator>,
    pub clock: Arc<dyn TimeSource>,
    shutdown: ShutdownRx,
}

impl NodeContext {
    pub fn new(
        identity: NodeIdentity,
        store: Arc<dyn DocumentStore>,
        validator: Arc<dyn TransactionValidator>,
        clock: Arc<dyn TimeSource>,
        shutdown: ShutdownRx,
    ) -> Self {
        Self {
            identity,
            store,
            validator,
            clock,
            shutdown,
        }
    }

    /// This node's public key.
    pub fn me(&self) -> &str {
        self.identity.me()
    }

    /// A fresh receiver for the shutdown signal.
    pub fn shutdown(&self) -> ShutdownRx {
        self.shutdown.clone()
    }
}

impl std::fmt::Debug for NodeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeContext")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}
