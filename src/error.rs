//! Error taxonomy for the assistant.
//!
//! Internal stage failures bubble up to the conversation router, which is the
//! single place a user-visible fallback string is produced. Nothing below the
//! router fabricates apology text.

use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum AssistantError {
    /// Language-model completion call failed.
    #[error("completion provider error: {0}")]
    Completion(String),

    /// Embedding call failed.
    #[error("embedding provider error: {0}")]
    Embedding(String),

    /// Vector index storage failure.
    #[error("index storage error: {0}")]
    Storage(String),

    /// An operation that requires a live index found none.
    #[error("no vector index is loaded")]
    IndexAbsent,

    /// Index creation or rebuild was asked to persist zero chunks.
    #[error("refusing to build an index from an empty chunk set")]
    EmptyChunkSet,

    /// Document chunking failed.
    #[error("chunking error: {0}")]
    Chunking(String),

    /// External document source failure (listing or fetching documents).
    #[error("document source error: {0}")]
    Source(String),

    /// An external call exceeded its deadline.
    #[error("external call timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization failure.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
