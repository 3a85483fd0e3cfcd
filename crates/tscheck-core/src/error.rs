//! Error types for the core crate.

use thiserror::Error;

use crate::task::TaskId;

/// Errors that can occur while orchestrating tasks.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The configured executable cannot be invoked.
    #[error("executable not found: {0}")]
    ExecutableUnavailable(String),

    /// The process could not be spawned.
    #[error("failed to spawn {executable}: {source}")]
    Spawn {
        /// Executable that failed to launch.
        executable: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Task has already been started or has ended.
    #[error("task {0} already started")]
    AlreadyStarted(TaskId),

    /// Task is not known to the orchestrator.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
