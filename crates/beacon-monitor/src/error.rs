//! Error types for the feature-instance monitor.

use thiserror::Error;

/// Result type alias for monitor operations.
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Errors resolving a locator to bytes.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("unsupported source scheme: {0}")]
    UnsupportedScheme(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("transport error: {0}")]
    Http(#[from] beacon_core::http::HttpError),

    #[error("{url} returned {status}")]
    Status { url: String, status: u16 },
}

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("error getting config from {locator:?}: {source}")]
    Fetch {
        locator: String,
        source: SourceError,
    },

    #[error("error deserializing config: {0}")]
    Deserialize(#[from] serde_json::Error),
}
