//! # Stale-Transaction Reassigner
//!
//! A backlog record that sits with one node longer than the reassign delay
//! is handed to the next federation member in rotation, so a crashed or
//! slow node cannot hold transactions hostage.

use crate::metrics::WatcherMetrics;
use fc_01_store::{DocumentStore, StoreError};
use fc_03_block_pipeline::stage::shutdown_signalled;
use fc_03_block_pipeline::{NodeContext, Result};
use shared_types::identity::NodeIdentity;
use shared_types::time::TimeSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

pub struct StaleReassigner {
    identity: NodeIdentity,
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn TimeSource>,
    delay: Duration,
    metrics: Arc<WatcherMetrics>,
}

impl StaleReassigner {
    pub fn new(ctx: &NodeContext, delay: Duration, metrics: Arc<WatcherMetrics>) -> Self {
        Self {
            identity: ctx.identity.clone(),
            store: Arc::clone(&ctx.store),
            clock: Arc::clone(&ctx.clock),
            delay,
            metrics,
        }
    }

    /// One scan: reassign every record older than the delay.
    pub async fn reassign_stale(&self) -> Result<usize> {
        let now = self.clock.now();
        let cutoff = now.saturating_sub(self.delay.as_millis() as u64);
        let mut moved = 0;

        for pending in self.store.stale_pending(cutoff).await? {
            let next = self.identity.next_in_rotation(&pending.assignee).to_string();
            match self.store.update_assignment(pending.id(), &next, now).await {
                Ok(_) => {
                    moved += 1;
                    debug!(
                        tx_id = %pending.id(),
                        from = %pending.assignee,
                        to = %next,
                        "[fc-05] Reassigned stale transaction"
                    );
                }
                // Written into a block since the scan.
                Err(StoreError::NotFound { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }
        if moved > 0 {
            self.metrics.record_reassignments(moved);
            info!(count = moved, "[fc-05] Stale transactions reassigned");
        }
        Ok(moved)
    }
}

/// Scan every `interval` until shutdown.
pub async fn run_reassigner(
    ctx: NodeContext,
    reassigner: StaleReassigner,
    interval: Duration,
) -> Result<()> {
    let mut shutdown = ctx.shutdown();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(interval_secs = interval.as_secs(), "[fc-05] Stale reassigner started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                reassigner.reassign_stale().await?;
            }
            _ = shutdown_signalled(&mut shutdown) => break,
        }
    }
    info!("[fc-05] Stale reassigner stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{context_with, pending_tx};
    use shared_types::crypto::NodeKeypair;
    use shared_types::time::ManualTimeSource;

    #[tokio::test]
    async fn test_stale_record_moves_to_next_member() {
        let clock = Arc::new(ManualTimeSource::new(1_000_000));
        let peer = NodeKeypair::generate().public_key().to_string();
        let (ctx, _shutdown) = context_with(vec![peer.clone()], clock.clone());
        let me = ctx.me().to_string();
        let metrics = Arc::new(WatcherMetrics::new());
        let reassigner = StaleReassigner::new(&ctx, Duration::from_secs(60), metrics.clone());

        let stale = pending_tx(&peer, 1_000_000);
        let fresh = pending_tx(&peer, 1_000_000);
        ctx.store.put_pending(stale.clone()).await.unwrap();
        clock.advance(30_000);
        ctx.store
            .put_pending(shared_types::entities::PendingTransaction {
                assignment_timestamp: clock.now(),
                ..fresh.clone()
            })
            .await
            .unwrap();
        clock.advance(45_000);

        assert_eq!(reassigner.reassign_stale().await.unwrap(), 1);

        // Federation order is [peer, me]: the next after peer is me.
        let moved = ctx.store.get_pending(stale.id()).await.unwrap().unwrap();
        assert_eq!(moved.assignee, me);
        assert_eq!(moved.assignment_timestamp, clock.now());
        let kept = ctx.store.get_pending(fresh.id()).await.unwrap().unwrap();
        assert_eq!(kept.assignee, peer);
        assert_eq!(metrics.snapshot().reassignments, 1);
    }

    #[tokio::test]
    async fn test_nothing_stale_is_noop() {
        let clock = Arc::new(ManualTimeSource::new(5_000));
        let (ctx, _shutdown) = context_with(Vec::new(), clock.clone());
        let reassigner =
            StaleReassigner::new(&ctx, Duration::from_secs(60), Arc::new(WatcherMetrics::new()));
        ctx.store
            .put_pending(pending_tx(ctx.me(), 5_000))
            .await
            .unwrap();

        assert_eq!(reassigner.reassign_stale().await.unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_runner_scans_on_interval() {
        let clock = Arc::new(ManualTimeSource::new(0));
        let (ctx, shutdown) = context_with(Vec::new(), clock.clone());
        let metrics = Arc::new(WatcherMetrics::new());
        let reassigner = StaleReassigner::new(&ctx, Duration::from_secs(1), metrics.clone());
        ctx.store.put_pending(pending_tx(ctx.me(), 0)).await.unwrap();
        clock.advance(5_000);

        let task = tokio::spawn(run_reassigner(ctx.clone(), reassigner, Duration::from_secs(5)));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(metrics.snapshot().reassignments, 1);

        shutdown.send(true).unwrap();
        task.await.unwrap().unwrap();
    }
}
