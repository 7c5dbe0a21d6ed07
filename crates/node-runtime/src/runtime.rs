//! # Node Runtime
//!
//! Wires the store, the pipelines and the watchers into one supervised node.
//!
//! ## Startup Sequence
//!
//! 1. Validate configuration and resolve the node identity
//! 2. Open the store
//! 3. Write the genesis block if the store has none
//! 4. Spawn the block pipeline, the vote pipeline and the watchers
//!
//! ## Shutdown
//!
//! The first of (stop request, stage exit) flips the shutdown signal. Source
//! stages stop reading, downstream stages drain what is queued, and any stage
//! still running after [`SHUTDOWN_GRACE`] is aborted.

use crate::config::NodeConfig;
use crate::genesis::ensure_genesis;
use anyhow::{Context, Result};
use fc_01_store::{DocumentStore, StoreHandle};
use fc_02_validation::{FederationValidator, TransactionValidator};
use fc_03_block_pipeline::{
    shutdown_channel, spawn_block_pipeline, BlockPipelineMetrics, BlockPipelineSnapshot,
    NodeContext, PipelineError, ShutdownRx, ShutdownTx, StageSet,
};
use fc_04_vote_pipeline::{spawn_vote_pipeline, VotePipelineMetrics, VotePipelineSnapshot};
use fc_05_watchers::{spawn_watchers, WatcherMetrics, WatcherSnapshot};
use shared_types::identity::NodeIdentity;
use shared_types::time::{SystemTimeSource, TimeSource};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Time stages get to drain after the shutdown signal.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// A configured node, ready to start.
pub struct NodeRuntime {
    config: NodeConfig,
    identity: NodeIdentity,
    store: StoreHandle,
    clock: Arc<dyn TimeSource>,
}

impl NodeRuntime {
    /// Validate `config` and open the configured store.
    pub fn new(config: NodeConfig) -> Result<Self> {
        config.validate().context("Invalid configuration")?;
        let identity = config
            .identity
            .resolve()
            .context("Failed to load node identity")?;
        if config.identity.secret_key_hex.is_none() {
            warn!(me = %identity.me(), "[fc-node] No FC_SECRET_KEY set, using a throwaway key");
        }
        let store = StoreHandle::open(&config.store).context("Failed to open store")?;
        Ok(Self::with_store(config, identity, store, Arc::new(SystemTimeSource)))
    }

    /// Assemble a runtime from already opened parts.
    pub fn with_store(
        config: NodeConfig,
        identity: NodeIdentity,
        store: StoreHandle,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            config,
            identity,
            store,
            clock,
        }
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    pub fn store(&self) -> Arc<dyn DocumentStore> {
        Arc::clone(&self.store.store)
    }

    /// Bootstrap genesis and spawn every stage.
    pub async fn start(&self) -> Result<RunningNode> {
        info!("===========================================");
        info!("  Federation-Chain Node v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");
        info!(
            me = %self.identity.me(),
            federation = self.identity.federation().len(),
            backend = ?self.config.store.backend,
            "[fc-node] Starting"
        );

        let store = self.store();
        let genesis = ensure_genesis(store.as_ref(), &self.identity, self.clock.as_ref())
            .await
            .context("Failed to bootstrap genesis block")?;

        let (shutdown_tx, shutdown_rx) = shutdown_channel();
        let ctx = self.context(shutdown_rx);
        let mut stages = StageSet::new();

        let block = spawn_block_pipeline(&ctx, &self.config.pipeline, &mut stages);
        let vote = match spawn_vote_pipeline(&ctx, &self.config.pipeline, &mut stages).await {
            Ok(metrics) => metrics,
            Err(e) => {
                let _ = shutdown_tx.send(true);
                stages.abort_all();
                return Err(e).context("Failed to start vote pipeline");
            }
        };
        let watchers = spawn_watchers(&ctx, &self.config.watchers, &mut stages);

        info!(
            genesis = %genesis.id,
            stages = stages.len(),
            "[fc-node] All stages running"
        );
        Ok(RunningNode {
            stages,
            shutdown_tx,
            metrics: NodeMetrics {
                block,
                vote,
                watchers,
            },
        })
    }

    fn context(&self, shutdown: ShutdownRx) -> NodeContext {
        let store = self.store();
        let validator: Arc<dyn TransactionValidator> =
            Arc::new(FederationValidator::new(Arc::clone(&store)));
        NodeContext::new(
            self.identity.clone(),
            store,
            validator,
            Arc::clone(&self.clock),
            shutdown,
        )
    }
}

/// Counters of every running subsystem.
#[derive(Debug, Clone)]
pub struct NodeMetrics {
    pub block: Arc<BlockPipelineMetrics>,
    pub vote: Arc<VotePipelineMetrics>,
    pub watchers: Arc<WatcherMetrics>,
}

/// Point-in-time copy of [`NodeMetrics`].
#[derive(Debug, Clone)]
pub struct NodeSnapshot {
    pub block: BlockPipelineSnapshot,
    pub vote: VotePipelineSnapshot,
    pub watchers: WatcherSnapshot,
}

impl NodeMetrics {
    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            block: self.block.snapshot(),
            vote: self.vote.snapshot(),
            watchers: self.watchers.snapshot(),
        }
    }

    pub fn log_summary(&self) {
        let snap = self.snapshot();
        info!(
            blocks_written = snap.block.blocks_written,
            transactions_written = snap.block.transactions_written,
            rejected = snap.block.validation.rejected_total(),
            votes_cast = snap.vote.votes_cast(),
            reverts = snap.watchers.reverts,
            reassignments = snap.watchers.reassignments,
            requeues = snap.watchers.requeues,
            "[fc-node] Metrics"
        );
    }
}

/// A started node.
pub struct RunningNode {
    stages: StageSet,
    shutdown_tx: ShutdownTx,
    metrics: NodeMetrics,
}

impl RunningNode {
    pub fn metrics(&self) -> &NodeMetrics {
        &self.metrics
    }

    /// Run until `stop` resolves or a stage exits, then shut down.
    ///
    /// Returns the first stage failure, if any.
    pub async fn supervise<F>(mut self, stop: F) -> std::result::Result<(), PipelineError>
    where
        F: Future<Output = ()>,
    {
        let mut first_error = None;
        tokio::pin!(stop);

        tokio::select! {
            _ = &mut stop => info!("[fc-node] Shutdown requested"),
            Some((name, result)) = self.stages.join_next() => {
                warn!(stage = name, "[fc-node] Stage exited, shutting the node down");
                record(name, result, &mut first_error);
            }
        }

        let _ = self.shutdown_tx.send(true);
        let drained = tokio::time::timeout(
            SHUTDOWN_GRACE,
            drain(&mut self.stages, &mut first_error),
        )
        .await;
        if drained.is_err() {
            warn!(
                remaining = self.stages.len(),
                "[fc-node] Stages did not drain in time, aborting"
            );
            self.stages.abort_all();
        }

        self.metrics.log_summary();
        info!("[fc-node] Shutdown complete");
        first_error.map_or(Ok(()), Err)
    }

    /// Signal shutdown and wait for the stages to drain.
    pub async fn shutdown(self) -> std::result::Result<(), PipelineError> {
        self.supervise(std::future::ready(())).await
    }
}

/// Stop future for [`RunningNode::supervise`] that resolves when `signal`
/// fires. If the signal cannot be listened for it never resolves, so only a
/// stage failure stops the node.
pub async fn stop_on<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        error!(
            "[fc-node] Failed to listen for the stop signal, running until a stage fails: {}",
            e
        );
        std::future::pending::<()>().await;
    }
}

async fn drain(stages: &mut StageSet, first_error: &mut Option<PipelineError>) {
    while let Some((name, result)) = stages.join_next().await {
        record(name, result, first_error);
    }
}

fn record(
    name: &'static str,
    result: std::result::Result<(), PipelineError>,
    first_error: &mut Option<PipelineError>,
) {
    if let Err(e) = result {
        error!(stage = name, "[fc-node] Stage failed: {}", e);
        first_error.get_or_insert(e);
    }
}
