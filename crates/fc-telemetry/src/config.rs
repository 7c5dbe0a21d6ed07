//! Telemetry configuration from environment variables.

use std::env;

/// Rendering of log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable, one line per event
    #[default]
    Plain,
    /// One JSON object per event
    Json,
}

impl LogFormat {
    /// Parse `json` / `plain`, case-insensitive. Anything else is plain.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Plain
        }
    }
}

/// Configuration for the log subscriber.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// `EnvFilter` directives (e.g. `info` or `fc_04_vote_pipeline=debug,info`)
    pub log_level: String,

    /// Event rendering
    pub format: LogFormat,

    /// Whether to print the event target
    pub with_target: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Plain,
            with_target: true,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `FC_LOG_LEVEL` or `RUST_LOG`: filter directives (default: info)
    /// - `FC_LOG_FORMAT`: `json` or `plain` (default: plain)
    /// - `FC_LOG_TARGETS`: print event targets (default: true)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            log_level: lookup("FC_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_level),

            format: lookup("FC_LOG_FORMAT")
                .map(|v| LogFormat::parse(&v))
                .unwrap_or(defaults.format),

            with_target: lookup("FC_LOG_TARGETS")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(defaults.with_target),
        }
    }
}
