// Error types for task storage and attachments

use std::io;

/// Result type alias for task operations
pub type Result<T> = std::result::Result<T, TaskError>;

/// Errors raised by the storage port
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No durable medium is reachable
    #[error("storage is unavailable")]
    Unavailable,

    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors surfaced to callers of the task store
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// Imported text was not a JSON array
    #[error("invalid import data: {0}")]
    Import(String),

    /// Attachment declared a content type other than PDF
    #[error("attachment rejected: expected application/pdf, got {content_type}")]
    AttachmentRejected { content_type: String },

    /// Reading an accepted attachment failed
    #[error("failed to read attachment {path}: {source}")]
    AttachmentRead {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Malformed data URL
    #[error("invalid data URL: {0}")]
    DataUrl(String),

    #[error("task title cannot be empty")]
    EmptyTitle,

    #[error("failed to encode tasks: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
