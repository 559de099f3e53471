use thiserror::Error;

/// Errors from message store operations.
///
/// Persistence and connectivity failures are fatal for the current turn and
/// are propagated, never retried internally.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("turn not found")]
    NotFound,
}

/// Errors from the external completion interface.
#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("provider error: {message}")]
    Provider { message: String },

    #[error("rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Errors from the optional long-term memory collaborator.
///
/// Always recovered locally: the memory context block is omitted.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("long-term memory unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced by a conversation manager's `ask`.
#[derive(Debug, Error)]
pub enum ConversationError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("completion failed: {0}")]
    Completion(#[from] CompletionError),
}
