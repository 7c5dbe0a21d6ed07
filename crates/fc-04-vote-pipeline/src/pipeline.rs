//! # Vote Pipeline
//!
//! ```text
//!  block feed ──► ungroup ──► validate (N workers) ──► tally ──► write vote
//!  (prefeed: blocks I        per tx, excluding        one vote per
//!   have not voted on,       the block itself         complete block
//!   live: inserts)
//!     │
//!     └── unauthentic block ─────────────────────────► tally (invalid)
//! ```

use crate::domain::{ungroup, Checked, InFlight, Ungrouped, Voter};
use crate::metrics::VotePipelineMetrics;
use crate::writer::VoteWriter;
use fc_02_validation::{verdict, ValidationContext};
use fc_03_block_pipeline::stage::{self, StageSet};
use fc_03_block_pipeline::{NodeContext, PipelineConfig, Result};
use shared_bus::{ChangeFeed, ChangeOp, Collection};
use shared_types::entities::{BlockRecord, Document, VoteRecord};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Resume the voter and spawn every stage of the vote pipeline.
///
/// Fails if the store holds neither a genesis block nor a prior vote by
/// this node.
pub async fn spawn_vote_pipeline(
    ctx: &NodeContext,
    config: &PipelineConfig,
    stages: &mut StageSet,
) -> Result<Arc<VotePipelineMetrics>> {
    spawn_tracked(ctx, config, stages, InFlight::new()).await
}

async fn spawn_tracked(
    ctx: &NodeContext,
    config: &PipelineConfig,
    stages: &mut StageSet,
    in_flight: InFlight,
) -> Result<Arc<VotePipelineMetrics>> {
    let voter = Voter::bootstrap(ctx.store.as_ref(), ctx.identity.clone(), Arc::clone(&ctx.clock))
        .await?;
    info!(last_voted = %voter.last_voted(), "[fc-04] Voter resumed");

    let metrics = Arc::new(VotePipelineMetrics::new());
    let (job_tx, job_rx) = mpsc::channel(config.capacity());
    let (checked_tx, checked_rx) = mpsc::channel(config.capacity());
    let (vote_tx, vote_rx) = mpsc::channel(config.capacity());

    stages.spawn(
        "fc-04/feed",
        block_feed(
            ctx.clone(),
            Arc::clone(&metrics),
            in_flight.clone(),
            job_tx,
            checked_tx.clone(),
        ),
    );

    let validate_ctx = ctx.clone();
    let validate_metrics = Arc::clone(&metrics);
    stage::spawn_workers(
        stages,
        "fc-04/validate",
        config.workers(),
        job_rx,
        checked_tx,
        move |job| validate_job(validate_ctx.clone(), Arc::clone(&validate_metrics), job),
    );

    stages.spawn(
        "fc-04/tally",
        tally_votes(voter, in_flight.clone(), checked_rx, vote_tx),
    );

    let writer = VoteWriter::new(Arc::clone(&ctx.store), Arc::clone(&metrics));
    stages.spawn("fc-04/write", write_votes(writer, in_flight, vote_rx));

    info!(workers = config.workers(), "[fc-04] Vote pipeline started");
    Ok(metrics)
}

/// Source stage: blocks to vote on, ungrouped into per-transaction jobs.
async fn block_feed(
    ctx: NodeContext,
    metrics: Arc<VotePipelineMetrics>,
    in_flight: InFlight,
    jobs: mpsc::Sender<Ungrouped>,
    verdicts: mpsc::Sender<Checked>,
) -> Result<()> {
    let me = ctx.me().to_string();
    let mut shutdown = ctx.shutdown();

    let subscription = ctx.store.subscribe(Collection::Bigchain, &[ChangeOp::Insert]);
    let prefeed = ctx
        .store
        .unvoted_blocks(&me)
        .await?
        .into_iter()
        .map(Document::Block)
        .collect();
    let mut feed = ChangeFeed::with_prefeed(subscription, prefeed);
    info!(prefeed = feed.prefeed_remaining(), "[fc-04] Block feed started");

    loop {
        let item = tokio::select! {
            item = feed.next() => item,
            _ = stage::shutdown_signalled(&mut shutdown) => {
                info!("[fc-04] Shutdown signal received");
                break;
            }
        };
        let Some(item) = item else {
            warn!("[fc-04] Change bus closed, stopping block feed");
            break;
        };
        let Some(block) = item.into_current().into_block() else {
            continue;
        };

        if !should_vote(&ctx, &me, &block, &in_flight).await? {
            metrics.record_skipped();
            continue;
        }
        in_flight.claim(&block.id);

        if let Some(reason) = block_level_fault(&ctx, &block) {
            warn!(block_id = %block.id, "[fc-04] Rejecting block: {}", reason);
            if verdicts.send(Checked::whole_block(block.id, reason)).await.is_err() {
                break;
            }
            continue;
        }

        debug!(block_id = %block.id, count = block.len(), "[fc-04] Validating block");
        for job in ungroup(block) {
            if jobs.send(job).await.is_err() {
                return Ok(());
            }
        }
    }
    Ok(())
}

async fn should_vote(
    ctx: &NodeContext,
    me: &str,
    block: &BlockRecord,
    in_flight: &InFlight,
) -> Result<bool> {
    if block.is_genesis() || in_flight.contains(&block.id) {
        return Ok(false);
    }
    if !block.block.voters.iter().any(|v| v == me) {
        debug!(block_id = %block.id, "[fc-04] Not an eligible voter for block");
        return Ok(false);
    }
    if ctx.store.vote_by_node(&block.id, me).await?.is_some() {
        debug!(block_id = %block.id, "[fc-04] Already voted on block");
        return Ok(false);
    }
    Ok(true)
}

/// Faults that invalidate a block without looking at its transactions.
fn block_level_fault(ctx: &NodeContext, block: &BlockRecord) -> Option<String> {
    if block.is_empty() {
        return Some("block has no transactions".into());
    }
    if !ctx
        .identity
        .federation()
        .iter()
        .any(|k| *k == block.block.node_pubkey)
    {
        return Some(format!(
            "block creator {} is not a federation member",
            block.block.node_pubkey
        ));
    }
    if !block.is_authentic() {
        return Some("block id or creator signature does not verify".into());
    }
    None
}

/// Worker body: validate one transaction in the context of its block.
async fn validate_job(
    ctx: NodeContext,
    metrics: Arc<VotePipelineMetrics>,
    job: Ungrouped,
) -> Result<Option<Checked>> {
    let context = ValidationContext::in_block(job.block_id.clone());
    let rejected = verdict(ctx.validator.as_ref(), &job.tx, &context, &metrics.validation).await?;
    Ok(Some(Checked {
        block_id: job.block_id,
        total: job.total,
        valid: rejected.is_none(),
        reason: rejected.map(|e| format!("transaction {}: {}", job.tx.id, e)),
    }))
}

/// Serial stage: fold results into votes.
async fn tally_votes(
    mut voter: Voter,
    in_flight: InFlight,
    mut input: mpsc::Receiver<Checked>,
    out: mpsc::Sender<VoteRecord>,
) -> Result<()> {
    while let Some(checked) = input.recv().await {
        voter.forget_stored(&in_flight);
        if voter.has_voted(&checked.block_id) {
            continue;
        }
        if let Some(vote) = voter.tally(checked)? {
            if out.send(vote).await.is_err() {
                break;
            }
        }
    }
    debug!(in_progress = voter.in_progress(), "[fc-04] Tally drained");
    Ok(())
}

/// Serial stage: persist each vote.
async fn write_votes(
    writer: VoteWriter,
    in_flight: InFlight,
    mut input: mpsc::Receiver<VoteRecord>,
) -> Result<()> {
    while let Some(vote) = input.recv().await {
        let block_id = vote.vote.voting_for_block.clone();
        writer.write(vote).await?;
        in_flight.release(&block_id);
    }
    Ok(())
}
