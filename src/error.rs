use thiserror::Error;

/// Shardcache error type
#[derive(Error, Debug)]
pub enum CacheError {
    /// Malformed server configuration string
    #[error("Invalid server configuration: {0}")]
    Config(String),

    /// Key rejected by portability validation
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    /// Counter key was absent (incr/decr)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Connection or timeout failure talking to a backend node
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Malformed wire value
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for shardcache operations
pub type Result<T> = std::result::Result<T, CacheError>;
