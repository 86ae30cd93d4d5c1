//! Error types for session lifecycle operations.

/// Error raised by a key-value backend or the session store façade.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem error from the `fs` backend.
    #[error("Storage I/O error at '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// Transport error from the `http` backend.
    #[error("Storage HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The remote backend answered with a non-success status.
    #[error("Storage backend returned {status} for '{key}'")]
    Status { status: u16, key: String },

    /// A record could not be encoded for storage.
    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The key cannot be mapped onto the backend.
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),
}

/// Error type for session operations.
///
/// `IpMissingFromSession` and `IpMismatch` are the distinguished signals
/// raised by the validator. The manager recovers from both locally; they
/// only escape when the validator is called directly.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IP pinning is enabled but the record carries no IP hash.
    #[error("No IP in session even though IP pinning is enabled")]
    IpMissingFromSession,

    /// The request IP does not verify against the record's IP hash.
    #[error("User IP doesn't match the one in session")]
    IpMismatch,

    /// Application code tried to write session metadata.
    #[error("Cannot overwrite session metadata key '{0}'")]
    ReservedKey(String),

    /// Hashing or hash parameter failure.
    #[error("Hash error: {0}")]
    Hash(String),

    /// A value could not be converted to or from JSON.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend failure. Never masked: there is no safe default for an outage.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, Error>;
