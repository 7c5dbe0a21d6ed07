//! Error types for the pipelines

use fc_01_store::StoreError;
use shared_types::errors::EntityError;
use thiserror::Error;

/// Result type alias for pipeline stages
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors that stop a pipeline stage.
///
/// Bad records never surface here: they are filtered and logged inside the
/// stage. What remains is fatal for the stage and shuts the node down.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Store unreachable after retries, or returned corrupt data
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Block or vote could not be built or signed
    #[error("Record construction failed: {0}")]
    Entity(#[from] EntityError),

    /// A stage started without the state it needs
    #[error("Stage cannot start: {0}")]
    NotBootstrapped(String),

    /// A stage task panicked or was aborted
    #[error("Stage {stage} terminated abnormally: {message}")]
    Aborted {
        /// Stage name
        stage: &'static str,
        /// Join error text
        message: String,
    },
}
