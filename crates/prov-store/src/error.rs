use prov_types::ContentId;

/// Errors from blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    /// The requested blob was not found.
    #[error("blob not found: {0}")]
    NotFound(ContentId),

    /// The key cannot be mapped onto the backend's namespace.
    #[error("invalid blob key: {0:?}")]
    InvalidKey(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for blob store operations.
pub type BlobResult<T> = Result<T, BlobError>;
