//! Error types for the custody object store.

/// Errors that can occur when talking to a custody backend.
#[derive(Debug, thiserror::Error)]
pub enum ObjectStoreError {
    /// Object storage error
    #[error("object storage error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// HTTP custody endpoint error
    #[error("custody endpoint error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A locator that the backend could never have produced
    #[error("invalid locator: {0}")]
    InvalidLocator(String),

    /// The backend answered with something that is not a shard blob
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// S3 bucket not found - must be created before use
    #[error("S3 bucket '{0}' does not exist. Create it before storing shards.")]
    BucketNotFound(String),
}

/// Result type alias for object store operations.
pub type Result<T> = std::result::Result<T, ObjectStoreError>;
