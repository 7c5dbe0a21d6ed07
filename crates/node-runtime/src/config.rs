//! # Node Configuration
//!
//! Unified configuration for every subsystem, loaded from `FC_*` environment
//! variables over the defaults.
//!
//! | Variable                          | Field                                  |
//! |-----------------------------------|----------------------------------------|
//! | `FC_STORE_BACKEND`                | `store.backend` (`memory`, `rocksdb`)  |
//! | `FC_DATA_DIR`                     | `store.data_dir`                       |
//! | `FC_STORE_MAX_TRIES`              | `store.max_tries`                      |
//! | `FC_STORE_RETRY_BASE_MS`          | `store.retry_base_delay_ms`            |
//! | `FC_CHANGE_CHANNEL_CAPACITY`      | `store.change_channel_capacity`        |
//! | `FC_BATCH_SIZE`                   | `pipeline.batch_size`                  |
//! | `FC_FLUSH_TIMEOUT_MS`             | `pipeline.flush_timeout_ms`            |
//! | `FC_CHANNEL_CAPACITY`             | `pipeline.channel_capacity`            |
//! | `FC_VALIDATION_WORKERS`           | `pipeline.validation_workers`          |
//! | `FC_BACKLOG_REASSIGN_DELAY_SECS`  | `watchers.backlog_reassign_delay_secs` |
//! | `FC_STALE_CHECK_INTERVAL_SECS`    | `watchers.stale_check_interval_secs`   |
//! | `FC_SECRET_KEY`                   | `identity.secret_key_hex`              |
//! | `FC_FEDERATION`                   | `identity.federation` (comma-separated)|
//!
//! Logging variables are read by [`TelemetryConfig`].

use fc_01_store::{StoreBackend, StoreConfig};
use fc_03_block_pipeline::PipelineConfig;
use fc_05_watchers::WatcherConfig;
use fc_telemetry::TelemetryConfig;
use shared_types::crypto::NodeKeypair;
use shared_types::identity::NodeIdentity;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown store backend '{0}'")]
    UnknownBackend(String),

    #[error("{var} must be a number, got '{value}'")]
    InvalidNumber { var: &'static str, value: String },

    #[error("Batch size must be at least 1")]
    ZeroBatchSize,

    #[error("Store max tries must be at least 1")]
    ZeroMaxTries,

    #[error("Invalid secret key: {0}")]
    InvalidSecretKey(String),

    #[error("A federation is configured but FC_SECRET_KEY is not set")]
    MissingSecretKey,

    #[error("Federation does not include this node ({me})")]
    NotInFederation { me: String },
}

/// This node's key material and federation membership.
#[derive(Debug, Clone, Default)]
pub struct IdentityConfig {
    /// Hex-encoded ed25519 secret. A throwaway key is generated when unset.
    pub secret_key_hex: Option<String>,

    /// Ordered federation public keys. Empty means a single-node federation.
    pub federation: Vec<String>,
}

impl IdentityConfig {
    /// Build the node identity, generating a key if none is configured.
    pub fn resolve(&self) -> Result<NodeIdentity, ConfigError> {
        let keypair = match &self.secret_key_hex {
            Some(secret) => NodeKeypair::from_secret_hex(secret)
                .map_err(|e| ConfigError::InvalidSecretKey(e.to_string()))?,
            None => NodeKeypair::generate(),
        };
        Ok(NodeIdentity::new(keypair, self.federation.clone()))
    }
}

/// Complete node configuration.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    /// Store backend and retry policy.
    pub store: StoreConfig,
    /// Block and vote pipeline tuning.
    pub pipeline: PipelineConfig,
    /// Watcher timing.
    pub watchers: WatcherConfig,
    /// Keys and federation.
    pub identity: IdentityConfig,
    /// Log rendering.
    pub telemetry: TelemetryConfig,
}

impl NodeConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self {
            telemetry: TelemetryConfig::from_lookup(&lookup),
            ..Self::default()
        };

        if let Some(backend) = lookup("FC_STORE_BACKEND") {
            config.store.backend = StoreBackend::from_str(&backend)
                .map_err(|_| ConfigError::UnknownBackend(backend.clone()))?;
        }
        if let Some(dir) = lookup("FC_DATA_DIR") {
            config.store.data_dir = PathBuf::from(dir);
        }
        set_number(&lookup, "FC_STORE_MAX_TRIES", &mut config.store.max_tries)?;
        set_number(&lookup, "FC_STORE_RETRY_BASE_MS", &mut config.store.retry_base_delay_ms)?;
        set_number(
            &lookup,
            "FC_CHANGE_CHANNEL_CAPACITY",
            &mut config.store.change_channel_capacity,
        )?;

        set_number(&lookup, "FC_BATCH_SIZE", &mut config.pipeline.batch_size)?;
        set_number(&lookup, "FC_FLUSH_TIMEOUT_MS", &mut config.pipeline.flush_timeout_ms)?;
        set_number(&lookup, "FC_CHANNEL_CAPACITY", &mut config.pipeline.channel_capacity)?;
        set_number(&lookup, "FC_VALIDATION_WORKERS", &mut config.pipeline.validation_workers)?;

        set_number(
            &lookup,
            "FC_BACKLOG_REASSIGN_DELAY_SECS",
            &mut config.watchers.backlog_reassign_delay_secs,
        )?;
        set_number(
            &lookup,
            "FC_STALE_CHECK_INTERVAL_SECS",
            &mut config.watchers.stale_check_interval_secs,
        )?;

        config.identity.secret_key_hex = lookup("FC_SECRET_KEY").filter(|s| !s.trim().is_empty());
        if let Some(members) = lookup("FC_FEDERATION") {
            config.identity.federation = members
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(String::from)
                .collect();
        }

        Ok(config)
    }

    /// Reject configurations the node cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.store.max_tries == 0 {
            return Err(ConfigError::ZeroMaxTries);
        }

        match &self.identity.secret_key_hex {
            Some(secret) => {
                let keypair = NodeKeypair::from_secret_hex(secret)
                    .map_err(|e| ConfigError::InvalidSecretKey(e.to_string()))?;
                let me = keypair.public_key();
                let federation = &self.identity.federation;
                if !federation.is_empty() && !federation.iter().any(|k| k == me) {
                    return Err(ConfigError::NotInFederation { me: me.to_string() });
                }
            }
            None if !self.identity.federation.is_empty() => {
                return Err(ConfigError::MissingSecretKey);
            }
            None => {}
        }
        Ok(())
    }
}

fn set_number<F, T>(lookup: &F, var: &'static str, target: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(value) = lookup(var) {
        *target = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber { var, value })?;
    }
    Ok(())
}
