//! # Block Pipeline
//!
//! ```text
//!  backlog feed ──► assignment filter ──► validate (N workers) ──► assemble ──► write
//!  (prefeed: my                              │ rejected:              (batch or
//!   backlog by time,                         ▼ delete from backlog     idle timeout)
//!   live: insert+update)
//! ```
//!
//! Update events are followed so records reassigned to this node by a
//! peer's stale-transaction watcher enter the pipeline.

use crate::config::PipelineConfig;
use crate::context::NodeContext;
use crate::domain::{filter_assigned, BlockAssembler};
use crate::error::Result;
use crate::metrics::BlockPipelineMetrics;
use crate::stage::{self, StageSet};
use crate::writer::BlockWriter;
use fc_02_validation::{screen, ValidationContext};
use shared_bus::{ChangeFeed, ChangeOp, Collection};
use shared_types::entities::{BlockRecord, Document, Transaction};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Spawn every stage of the block pipeline into `stages`.
pub fn spawn_block_pipeline(
    ctx: &NodeContext,
    config: &PipelineConfig,
    stages: &mut StageSet,
) -> Arc<BlockPipelineMetrics> {
    let metrics = Arc::new(BlockPipelineMetrics::new());
    let (assigned_tx, assigned_rx) = mpsc::channel(config.capacity());
    let (valid_tx, valid_rx) = mpsc::channel(config.capacity());
    let (block_tx, block_rx) = mpsc::channel(config.capacity());

    stages.spawn("fc-03/feed", backlog_feed(ctx.clone(), assigned_tx));

    let validate_ctx = ctx.clone();
    let validate_metrics = Arc::clone(&metrics);
    stage::spawn_workers(
        stages,
        "fc-03/validate",
        config.workers(),
        assigned_rx,
        valid_tx,
        move |tx| validate_transaction(validate_ctx.clone(), Arc::clone(&validate_metrics), tx),
    );

    stages.spawn(
        "fc-03/assemble",
        assemble(
            ctx.clone(),
            config.batch_size,
            config.flush_timeout(),
            valid_rx,
            block_tx,
        ),
    );

    let writer = BlockWriter::new(Arc::clone(&ctx.store), Arc::clone(&metrics));
    stages.spawn("fc-03/write", write_blocks(writer, block_rx));

    info!(
        workers = config.workers(),
        batch_size = config.batch_size,
        "[fc-03] Block pipeline started"
    );
    metrics
}

/// Source stage: this node's backlog, then live inserts and updates.
async fn backlog_feed(ctx: NodeContext, out: mpsc::Sender<Transaction>) -> Result<()> {
    let me = ctx.me().to_string();
    let mut shutdown = ctx.shutdown();

    let subscription = ctx
        .store
        .subscribe(Collection::Backlog, &[ChangeOp::Insert, ChangeOp::Update]);
    let prefeed = ctx
        .store
        .range_by_assignee(&me)
        .await?
        .into_iter()
        .map(Document::Pending)
        .collect();
    let mut feed = ChangeFeed::with_prefeed(subscription, prefeed);
    info!(
        prefeed = feed.prefeed_remaining(),
        "[fc-03] Backlog feed started"
    );

    loop {
        let item = tokio::select! {
            item = feed.next() => item,
            _ = stage::shutdown_signalled(&mut shutdown) => {
                info!("[fc-03] Shutdown signal received");
                break;
            }
        };
        let Some(item) = item else {
            warn!("[fc-03] Change bus closed, stopping backlog feed");
            break;
        };
        let Some(pending) = item.into_current().into_pending() else {
            continue;
        };
        if let Some(tx) = filter_assigned(pending, &me) {
            if out.send(tx).await.is_err() {
                break;
            }
        }
    }
    Ok(())
}

/// Worker body: pass valid transactions, drop rejected ones from the backlog.
async fn validate_transaction(
    ctx: NodeContext,
    metrics: Arc<BlockPipelineMetrics>,
    tx: Transaction,
) -> Result<Option<Transaction>> {
    let tx_id = tx.id.clone();
    let verdict = screen(
        ctx.validator.as_ref(),
        tx,
        &ValidationContext::pending(),
        &metrics.validation,
    )
    .await?;
    if verdict.is_none() {
        match ctx.store.delete_pending(std::slice::from_ref(&tx_id)).await {
            Ok(removed) => metrics.record_rejected_removed(removed),
            Err(e) => warn!(tx_id = %tx_id, "[fc-03] Failed to remove rejected transaction: {}", e),
        }
    }
    Ok(verdict)
}

/// Serial stage: cut blocks on batch size or after an idle period.
async fn assemble(
    ctx: NodeContext,
    batch_size: usize,
    flush_timeout: Duration,
    mut input: mpsc::Receiver<Transaction>,
    out: mpsc::Sender<BlockRecord>,
) -> Result<()> {
    let next_number = ctx.store.max_block_number().await?.map_or(1, |n| n + 1);
    let mut assembler =
        BlockAssembler::new(ctx.identity.clone(), Arc::clone(&ctx.clock), batch_size, next_number);
    debug!(next_number, "[fc-03] Assembler ready");

    loop {
        let block = match tokio::time::timeout(flush_timeout, input.recv()).await {
            Ok(Some(tx)) => assembler.push(tx)?,
            Ok(None) => {
                if let Some(block) = assembler.flush()? {
                    let _ = out.send(block).await;
                }
                return Ok(());
            }
            Err(_) => assembler.flush()?,
        };
        if let Some(block) = block {
            if out.send(block).await.is_err() {
                return Ok(());
            }
        }
    }
}

/// Serial stage: persist each block.
async fn write_blocks(writer: BlockWriter, mut input: mpsc::Receiver<BlockRecord>) -> Result<()> {
    while let Some(block) = input.recv().await {
        writer.write(block).await?;
    }
    debug!("[fc-03] Writer drained");
    Ok(())
}
