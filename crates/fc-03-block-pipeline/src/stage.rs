//! # Stage Runtime
//!
//! Plumbing shared by every pipeline: a supervised set of stage tasks, the
//! shutdown wait, and a worker pool for stateless stages.
//!
//! ```text
//!   source ──mpsc──► worker ┐
//!                    worker ├──mpsc──► serial stage ──mpsc──► ...
//!                    worker ┘
//! ```
//!
//! Only source stages watch the shutdown signal. When a source returns it
//! drops its sender, and every downstream stage drains what is queued and
//! then sees its input close.

use crate::context::ShutdownRx;
use crate::error::{PipelineError, Result};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, error};

/// Resolves once shutdown is requested or the signal's sender is gone.
pub async fn shutdown_signalled(shutdown: &mut ShutdownRx) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}

/// A supervised group of stage tasks.
#[derive(Default)]
pub struct StageSet {
    tasks: JoinSet<(&'static str, Result<()>)>,
}

impl StageSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a named stage.
    pub fn spawn<F>(&mut self, name: &'static str, stage: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        self.tasks.spawn(async move { (name, stage.await) });
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for the next stage to finish.
    pub async fn join_next(&mut self) -> Option<(&'static str, Result<()>)> {
        let joined = self.tasks.join_next().await?;
        Some(match joined {
            Ok((name, result)) => {
                debug!(stage = name, ok = result.is_ok(), "Stage finished");
                (name, result)
            }
            Err(e) => (
                "unknown",
                Err(PipelineError::Aborted {
                    stage: "unknown",
                    message: e.to_string(),
                }),
            ),
        })
    }

    /// Wait for every stage, returning the first failure.
    pub async fn join_all(mut self) -> Result<()> {
        let mut first_error = None;
        while let Some((name, result)) = self.join_next().await {
            if let Err(e) = result {
                error!(stage = name, "Stage failed: {}", e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Abort every remaining stage.
    pub fn abort_all(&mut self) {
        self.tasks.abort_all();
    }
}

/// Run `work` on `workers` parallel tasks fed from one input channel.
///
/// `Some` results go to `output`; `None` filters the item out. The output
/// channel closes once every worker has stopped.
pub fn spawn_workers<I, O, F, Fut>(
    stages: &mut StageSet,
    name: &'static str,
    workers: usize,
    input: mpsc::Receiver<I>,
    output: mpsc::Sender<O>,
    work: F,
) where
    I: Send + 'static,
    O: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<O>>> + Send,
{
    let input = Arc::new(Mutex::new(input));
    let work = Arc::new(work);
    for _ in 0..workers.max(1) {
        let input = Arc::clone(&input);
        let output = output.clone();
        let work = Arc::clone(&work);
        stages.spawn(name, async move {
            loop {
                // Hold the lock only while waiting, not while working.
                let next = input.lock().await.recv().await;
                let Some(item) = next else {
                    return Ok(());
                };
                if let Some(result) = work(item).await? {
                    if output.send(result).await.is_err() {
                        return Ok(());
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::shutdown_channel;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_workers_filter_and_close_output() {
        let mut stages = StageSet::new();
        let (in_tx, in_rx) = mpsc::channel(16);
        let (out_tx, mut out_rx) = mpsc::channel(16);

        spawn_workers(&mut stages, "evens", 3, in_rx, out_tx, |n: u32| async move {
            Ok((n % 2 == 0).then_some(n))
        });
        for n in 0..10 {
            in_tx.send(n).await.unwrap();
        }
        drop(in_tx);

        let mut seen = Vec::new();
        while let Some(n) = timeout(Duration::from_secs(1), out_rx.recv()).await.unwrap() {
            seen.push(n);
        }
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 2, 4, 6, 8]);
        stages.join_all().await.unwrap();
    }

    #[tokio::test]
    async fn test_join_all_reports_failure() {
        let mut stages = StageSet::new();
        stages.spawn("ok", async { Ok(()) });
        stages.spawn("bad", async {
            Err(PipelineError::NotBootstrapped("no genesis".into()))
        });

        let err = stages.join_all().await.unwrap_err();
        assert!(matches!(err, PipelineError::NotBootstrapped(_)));
    }

    #[tokio::test]
    async fn test_shutdown_signalled() {
        let (tx, mut rx) = shutdown_channel();
        let waiter = tokio::spawn(async move { shutdown_signalled(&mut rx).await });
        tx.send(true).unwrap();
        timeout(Duration::from_secs(1), waiter).await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_dropped_sender_counts_as_shutdown() {
        let (tx, mut rx) = shutdown_channel();
        drop(tx);
        timeout(Duration::from_secs(1), shutdown_signalled(&mut rx))
            .await
            .unwrap();
    }
}
