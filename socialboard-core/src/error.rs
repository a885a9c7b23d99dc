//! Error types for socialboard-core

use thiserror::Error;

/// Main error type for the socialboard-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Requested dimensions do not match the dimensions of a data set
    #[error("incompatible dimensions: {0}")]
    IncompatibleDimensions(String),

    /// Unsupported analysis type, measure name, or malformed parameter/data
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Error reported by the aggregation client, passed through untouched
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Caller-supplied deadline elapsed before the aggregation call returned
    #[error("aggregation timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for socialboard-core
pub type Result<T> = std::result::Result<T, Error>;
