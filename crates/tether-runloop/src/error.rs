//! Error types for the runloop module.

use thiserror::Error;

/// Errors that can occur in invokers, managers and threads.
#[derive(Debug, Error)]
pub enum RunLoopError {
    /// A queue was polled, or a bound value accessed, off its owning thread.
    #[error("{invoker} is not owned by the calling thread")]
    NotOwner { invoker: String },

    /// A transfer named an invoker the source manager does not own.
    #[error("Invoker {item} is not owned by {manager}")]
    NotOwned { item: String, manager: String },

    /// Thread was already started.
    #[error("Thread {0} is already started")]
    AlreadyStarted(String),

    /// Thread is not running.
    #[error("Thread {0} is not running")]
    NotRunning(String),

    /// A synchronous invoke was not picked up in time.
    #[error("Operation timed out")]
    Timeout,

    /// The queued call was released before it could run.
    #[error("Invoke on {0} was dropped before it ran")]
    Dropped(String),

    /// The OS refused to spawn the worker thread.
    #[error("Failed to spawn thread: {0}")]
    Spawn(#[from] std::io::Error),

    /// Error raised by a queued call.
    #[error("{0}")]
    Custom(String),
}

impl RunLoopError {
    /// Build a [`RunLoopError::Custom`] from any displayable value.
    pub fn custom(msg: impl std::fmt::Display) -> Self {
        RunLoopError::Custom(msg.to_string())
    }
}

/// Result type for runloop operations.
pub type RunLoopResult<T> = Result<T, RunLoopError>;
