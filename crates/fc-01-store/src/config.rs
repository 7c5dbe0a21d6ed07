//! Store configuration and backend selection.

use crate::adapters::memory::InMemoryKVStore;
use crate::adapters::lock::DatabaseLock;
use crate::domain::errors::StoreError;
use crate::ports::inbound::DocumentStore;
use crate::ports::outbound::KeyValueStore;
use crate::retry::{RetryPolicy, DEFAULT_MAX_TRIES};
use crate::service::KvDocumentStore;
use shared_bus::ChangeBus;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Available store backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    RocksDb,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(StoreBackend::Memory),
            "rocksdb" | "rocks" => Ok(StoreBackend::RocksDb),
            other => Err(format!("unknown store backend '{other}'")),
        }
    }
}

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    /// Data directory for on-disk backends.
    pub data_dir: PathBuf,
    /// Attempts per engine call before a connection error is fatal.
    pub max_tries: u32,
    /// Base backoff between attempts.
    pub retry_base_delay_ms: u64,
    /// Change events buffered per subscriber.
    pub change_channel_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            data_dir: PathBuf::from("./data"),
            max_tries: DEFAULT_MAX_TRIES,
            retry_base_delay_ms: 1000,
            change_channel_capacity: shared_bus::DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl StoreConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_tries, Duration::from_millis(self.retry_base_delay_ms))
    }
}

/// An opened store plus the resources that must live as long as it.
pub struct StoreHandle {
    pub store: Arc<dyn DocumentStore>,
    pub bus: Arc<ChangeBus>,
    _lock: Option<DatabaseLock>,
}

impl StoreHandle {
    /// In-memory store with default retry, for tests and local runs.
    pub fn in_memory() -> Self {
        Self::memory(Arc::new(ChangeBus::new()), RetryPolicy::default())
    }

    fn memory(bus: Arc<ChangeBus>, retry: RetryPolicy) -> Self {
        Self::with_engine(InMemoryKVStore::new(), bus, retry)
    }

    /// Store over an engine that needs no data directory lock.
    pub fn with_engine<K: KeyValueStore + 'static>(
        kv: K,
        bus: Arc<ChangeBus>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store: Arc::new(KvDocumentStore::new(kv, bus.clone(), retry)),
            bus,
            _lock: None,
        }
    }

    /// Open the backend named in `config`.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        let bus = Arc::new(ChangeBus::with_capacity(config.change_channel_capacity));
        let retry = config.retry_policy();

        match config.backend {
            StoreBackend::Memory => {
                info!("[fc-01] Opening in-memory store");
                Ok(Self::memory(bus, retry))
            }
            StoreBackend::RocksDb => Self::open_rocksdb(config, bus, retry),
        }
    }

    #[cfg(feature = "rocksdb")]
    fn open_rocksdb(
        config: &StoreConfig,
        bus: Arc<ChangeBus>,
        retry: RetryPolicy,
    ) -> Result<Self, StoreError> {
        use crate::adapters::rocksdb::{RocksDbConfig, RocksDbKVStore};

        let lock = DatabaseLock::acquire(&config.data_dir).map_err(|e| StoreError::Connection {
            attempts: 1,
            message: e.to_string(),
        })?;
        let path = config.data_dir.join("rocksdb");
        info!(path = %path.display(), "[fc-01] Opening RocksDB store");
        let kv = RocksDbKVStore::open(RocksDbConfig {
            path,
            ..RocksDbConfig::default()
        })
        .map_err(|e| StoreError::Connection {
            attempts: 1,
            message: e.to_string(),
        })?;

        Ok(Self {
            store: Arc::new(KvDocumentStore::new(kv, bus.clone(), retry)),
            bus,
            _lock: Some(lock),
        })
    }

    #[cfg(not(feature = "rocksdb"))]
    fn open_rocksdb(
        _config: &StoreConfig,
        _bus: Arc<ChangeBus>,
        _retry: RetryPolicy,
    ) -> Result<Self, StoreError> {
        Err(StoreError::Connection {
            attempts: 0,
            message: "built without the `rocksdb` feature".into(),
        })
    }
}
