//! Error types for the remote data client

use thiserror::Error;

/// Errors that can occur while issuing a remote request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The requested endpoint was never registered with the [`Api`](crate::Api)
    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(String),

    /// The server answered with a non-success status
    #[error("Request to {url} failed with status {status}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Absolute URL that was requested
        url: String,
    },

    /// The request never produced a response (connect, timeout, TLS)
    #[error("Request failed: {0}")]
    Request(String),

    /// The response body was not valid JSON, or not the expected shape
    #[error("Response parsing failed: {0}")]
    Decode(String),
}
