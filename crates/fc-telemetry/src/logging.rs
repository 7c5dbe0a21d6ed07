//! Global subscriber installation.
//!
//! JSON output carries the same fields as plain output (`block_id`, `tx_id`,
//! `count`, ...), so a log shipper can index them without parsing messages.

use crate::{LogFormat, TelemetryConfig, TelemetryError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Parse the configured filter directives.
pub fn build_filter(config: &TelemetryConfig) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(&config.log_level).map_err(|e| TelemetryError::Filter {
        directives: config.log_level.clone(),
        message: e.to_string(),
    })
}

/// Install the global log subscriber.
///
/// Fails if the filter does not parse or a subscriber is already installed.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = build_filter(config)?;

    let result = match config.format {
        LogFormat::Json => {
            let json_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_target(config.with_target)
                .with_thread_ids(true)
                .with_current_span(false);
            tracing_subscriber::registry()
                .with(filter)
                .with(json_layer)
                .try_init()
        }
        LogFormat::Plain => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_target(config.with_target)
                .with_thread_ids(false)
                .with_ansi(true);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .try_init()
        }
    };
    result.map_err(|e| TelemetryError::AlreadyInstalled(e.to_string()))?;

    tracing::debug!(
        level = %config.log_level,
        format = ?config.format,
        "[fc-telemetry] Logging initialized"
    );
    Ok(())
}
