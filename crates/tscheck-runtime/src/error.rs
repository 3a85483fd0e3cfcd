//! Error types for the runtime crate.

use thiserror::Error;

use tscheck_core::CoreError;

/// Errors that can occur in the runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Event channel closed or full.
    #[error("channel error: {0}")]
    Channel(String),

    /// Orchestrator error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Configuration value rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for runtime operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
