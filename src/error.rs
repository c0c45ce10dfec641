//! Error types for the metrics store

use thiserror::Error;

/// Main error type for the metrics library
#[derive(Error, Debug)]
pub enum Error {
    /// Store error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A stored member failed strict decoding. A well-formed writer never
    /// produces one, so this is a hard error and is not retried.
    #[error("Malformed sample under '{key}': {source}")]
    MalformedSample {
        /// Metric key the member was read from
        key: String,
        /// Underlying decode failure
        #[source]
        source: serde_json::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Errors surfaced by a [`SampleStore`](crate::store::SampleStore) backend
#[derive(Error, Debug)]
pub enum StoreError {
    /// Connection to the backend failed
    #[error("Connection error: {0}")]
    Connection(String),

    /// A command did not complete within its timeout
    #[error("Command timeout")]
    Timeout,

    /// Query execution failed
    #[error("Query error: {0}")]
    Query(String),

    /// Serialization of an outgoing member failed
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
