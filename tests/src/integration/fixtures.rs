//! # Test Fixtures
//!
//! A [`Federation`] is N nodes sharing one in-memory store, each running its
//! own block pipeline, vote pipeline and (optionally) watchers, exactly as
//! `fc-node` wires them.

use fc_01_store::{DocumentStore, StoreHandle};
use fc_02_validation::{FederationValidator, TransactionValidator};
use fc_03_block_pipeline::{
    shutdown_channel, spawn_block_pipeline, BlockPipelineMetrics, NodeContext, PipelineConfig,
    ShutdownTx, StageSet,
};
use fc_04_vote_pipeline::{spawn_vote_pipeline, VotePipelineMetrics};
use fc_05_watchers::{spawn_watchers, WatcherConfig, WatcherMetrics};
use node_runtime::create_genesis_block;
use shared_types::crypto::NodeKeypair;
use shared_types::entities::{BlockRecord, Output, PendingTransaction, Transaction, VoteRecord};
use shared_types::identity::NodeIdentity;
use shared_types::time::{SystemTimeSource, TimeSource};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

/// Upper bound for any eventual condition in these tests.
pub const WAIT: Duration = Duration::from_secs(10);

/// Harness options.
#[derive(Clone, Debug)]
pub struct FederationConfig {
    /// Nodes that run pipelines
    pub running: usize,
    /// Extra federation members that never run
    pub silent: usize,
    pub pipeline: PipelineConfig,
    pub watchers: Option<WatcherConfig>,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            running: 1,
            silent: 0,
            pipeline: PipelineConfig {
                batch_size: 100,
                flush_timeout_ms: 100,
                channel_capacity: 256,
                validation_workers: 2,
            },
            watchers: None,
        }
    }
}

impl FederationConfig {
    pub fn nodes(running: usize) -> Self {
        Self {
            running,
            ..Self::default()
        }
    }

    pub fn with_watchers(mut self) -> Self {
        self.watchers = Some(WatcherConfig::default());
        self
    }
}

/// One running member.
pub struct TestNode {
    pub ctx: NodeContext,
    pub block_metrics: Arc<BlockPipelineMetrics>,
    pub vote_metrics: Arc<VotePipelineMetrics>,
    pub watcher_metrics: Option<Arc<WatcherMetrics>>,
    stages: StageSet,
    shutdown: ShutdownTx,
}

impl TestNode {
    pub fn me(&self) -> &str {
        self.ctx.me()
    }
}

pub struct Federation {
    pub store: Arc<dyn DocumentStore>,
    pub genesis: BlockRecord,
    /// Every member's keys in federation order, running nodes first.
    pub members: Vec<NodeKeypair>,
    pub nodes: Vec<TestNode>,
}

impl Federation {
    pub async fn start(config: FederationConfig) -> Self {
        let members: Vec<NodeKeypair> = (0..config.running + config.silent)
            .map(|_| NodeKeypair::generate())
            .collect();
        let federation: Vec<String> = members.iter().map(|k| k.public_key().to_string()).collect();

        let store = StoreHandle::in_memory().store;
        let first = NodeIdentity::new(members[0].clone(), federation.clone());
        let genesis = create_genesis_block(&first, &SystemTimeSource).expect("genesis");
        store.put_block(genesis.clone()).await.expect("write genesis");

        let mut nodes = Vec::with_capacity(config.running);
        for keypair in members.iter().take(config.running) {
            let identity = NodeIdentity::new(keypair.clone(), federation.clone());
            nodes.push(start_node(identity, Arc::clone(&store), &config).await);
        }
        // Let every feed subscribe before the test writes anything.
        sleep(Duration::from_millis(50)).await;

        Self {
            store,
            genesis,
            members,
            nodes,
        }
    }

    pub fn node(&self, index: usize) -> &TestNode {
        &self.nodes[index]
    }

    pub fn public_key(&self, index: usize) -> &str {
        self.members[index].public_key()
    }

    /// Put `tx` into the backlog assigned to member `assignee`.
    pub async fn submit(&self, tx: &Transaction, assignee: usize) {
        self.submit_at(tx, assignee, SystemTimeSource.now()).await;
    }

    pub async fn submit_at(&self, tx: &Transaction, assignee: usize, assigned_at: u64) {
        let pending = PendingTransaction::new(
            tx.clone(),
            self.public_key(assignee).to_string(),
            assigned_at,
        );
        self.store.put_pending(pending).await.expect("put pending");
    }

    /// The blocks that embed `tx_id`, once at least one exists.
    pub async fn wait_for_block(&self, tx_id: &str) -> BlockRecord {
        let store = Arc::clone(&self.store);
        let tx_id = tx_id.to_string();
        eventually("transaction written into a block", || {
            let store = Arc::clone(&store);
            let tx_id = tx_id.clone();
            async move {
                store
                    .blocks_containing_transaction(&tx_id)
                    .await
                    .expect("query blocks")
                    .into_iter()
                    .next()
            }
        })
        .await
    }

    /// Member `voter`'s vote on `block_id`, once cast.
    pub async fn wait_for_vote(&self, block_id: &str, voter: usize) -> VoteRecord {
        let store = Arc::clone(&self.store);
        let block_id = block_id.to_string();
        let voter = self.public_key(voter).to_string();
        eventually("vote cast", || {
            let store = Arc::clone(&store);
            let block_id = block_id.clone();
            let voter = voter.clone();
            async move {
                store
                    .vote_by_node(&block_id, &voter)
                    .await
                    .expect("query vote")
            }
        })
        .await
    }

    /// Wait until `tx_id` has left the backlog.
    pub async fn wait_until_not_pending(&self, tx_id: &str) {
        let store = Arc::clone(&self.store);
        let tx_id = tx_id.to_string();
        eventually("transaction removed from backlog", || {
            let store = Arc::clone(&store);
            let tx_id = tx_id.clone();
            async move {
                match store.get_pending(&tx_id).await.expect("query pending") {
                    Some(_) => None,
                    None => Some(()),
                }
            }
        })
        .await
    }

    /// Submit `tx`, then wait for it to land in a block that `voter` voted on.
    pub async fn commit(&self, tx: &Transaction, voter: usize) -> (BlockRecord, VoteRecord) {
        self.submit(tx, voter).await;
        let block = self.wait_for_block(&tx.id).await;
        let vote = self.wait_for_vote(&block.id, voter).await;
        (block, vote)
    }

    /// Signal shutdown and wait for every stage to drain.
    pub async fn stop(self) {
        for node in self.nodes {
            let _ = node.shutdown.send(true);
            timeout(WAIT, node.stages.join_all())
                .await
                .expect("stages drain")
                .expect("stages exit cleanly");
        }
    }
}

async fn start_node(
    identity: NodeIdentity,
    store: Arc<dyn DocumentStore>,
    config: &FederationConfig,
) -> TestNode {
    let (shutdown, shutdown_rx) = shutdown_channel();
    let validator: Arc<dyn TransactionValidator> =
        Arc::new(FederationValidator::new(Arc::clone(&store)));
    let ctx = NodeContext::new(
        identity,
        store,
        validator,
        Arc::new(SystemTimeSource),
        shutdown_rx,
    );

    let mut stages = StageSet::new();
    let block_metrics = spawn_block_pipeline(&ctx, &config.pipeline, &mut stages);
    let vote_metrics = spawn_vote_pipeline(&ctx, &config.pipeline, &mut stages)
        .await
        .expect("vote pipeline starts");
    let watcher_metrics = config
        .watchers
        .as_ref()
        .map(|watchers| spawn_watchers(&ctx, watchers, &mut stages));

    TestNode {
        ctx,
        block_metrics,
        vote_metrics,
        watcher_metrics,
        stages,
        shutdown,
    }
}

/// Poll `check` until it yields a value or [`WAIT`] elapses.
pub async fn eventually<T, F, Fut>(what: &str, mut check: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let found = timeout(WAIT, async {
        loop {
            if let Some(value) = check().await {
                return value;
            }
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    match found {
        Ok(value) => value,
        Err(_) => panic!("timed out waiting for: {what}"),
    }
}

// =============================================================================
// TRANSACTIONS
// =============================================================================

/// A signed CREATE of `amount` units owned by `owner`.
pub fn create_tx(owner: &NodeKeypair, amount: u64) -> Transaction {
    Transaction::create(
        owner.public_key().to_string(),
        vec![Output::new(amount, vec![owner.public_key().to_string()])],
        Some(serde_json::json!({ "nonce": rand_nonce() })),
        None,
    )
    .expect("create")
    .sign(&[owner])
    .expect("sign")
}

/// A signed TRANSFER of the whole output 0 of `source` from `owner` to `to`.
pub fn transfer_tx(source: &Transaction, owner: &NodeKeypair, to: &NodeKeypair) -> Transaction {
    let amount = source.outputs[0].amount;
    Transaction::transfer(
        vec![(source.output_link(0), vec![owner.public_key().to_string()])],
        vec![Output::new(amount, vec![to.public_key().to_string()])],
        source.asset_id().expect("asset id").to_string(),
        Some(serde_json::json!({ "nonce": rand_nonce() })),
    )
    .expect("transfer")
    .sign(&[owner])
    .expect("sign")
}

/// `tx` with its fulfillments corrupted. The id still matches the body.
pub fn forged(mut tx: Transaction) -> Transaction {
    for input in &mut tx.inputs {
        for fulfillment in &mut input.fulfillment {
            *fulfillment = "00".repeat(64);
        }
    }
    tx
}

/// Distinct metadata keeps otherwise identical transactions apart.
fn rand_nonce() -> u64 {
    static NONCE: AtomicU64 = AtomicU64::new(0);
    NONCE.fetch_add(1, Ordering::Relaxed)
}
