use thiserror::Error;

/// Errors surfaced by the caching layer.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    /// A store would push the namespace past its capacity ceiling or
    /// past the space left on disk. Recoverable: delete entries and
    /// retry. There is no automatic eviction.
    #[error(
        "quota exceeded: requested {requested} bytes with {usage} of {capacity} in use"
    )]
    QuotaExceeded {
        requested: u64,
        usage: u64,
        capacity: u64,
    },

    /// Every item in a batch fetch-and-store failed. Individual
    /// errors are logged and dropped; the batch reports only this.
    #[error("all {attempted} save attempts failed")]
    AllSavesFailed { attempted: usize },

    /// A blob failed its integrity or size check on read.
    #[error("invalid blob: {0}")]
    InvalidBlob(String),

    #[error("repository error: {0}")]
    Repository(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CacheError>;
