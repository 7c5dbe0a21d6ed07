//! # Federation-Chain Telemetry
//!
//! Structured logging for the node.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fc_telemetry::{init_logging, TelemetryConfig};
//!
//! fn main() {
//!     init_logging(&TelemetryConfig::from_env()).expect("logging");
//!     tracing::info!("[fc-node] Starting");
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable                   | Default | Description                    |
//! |----------------------------|---------|--------------------------------|
//! | `FC_LOG_LEVEL` / `RUST_LOG` | `info`  | `EnvFilter` directives          |
//! | `FC_LOG_FORMAT`            | `plain` | `plain` or `json`              |
//! | `FC_LOG_TARGETS`           | `true`  | Include the module path        |
//!
//! Counters live next to the code that bumps them (each pipeline crate has a
//! `metrics` module); this crate only decides how events are rendered.

mod config;
mod logging;

pub use config::{LogFormat, TelemetryConfig};
pub use logging::{build_filter, init_logging};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter '{directives}': {message}")]
    Filter { directives: String, message: String },

    #[error("Global subscriber already installed: {0}")]
    AlreadyInstalled(String),
}
