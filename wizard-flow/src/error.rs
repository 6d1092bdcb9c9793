use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("task execution failed: {0}")]
    TaskExecutionFailed(String),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("context error: {0}")]
    ContextError(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Another run for the same session has not finished yet.
    #[error("session {0} already has a run in flight")]
    SessionBusy(String),

    #[error("storage error: {0}")]
    StorageError(String),
}
