//! Error types for the CLI client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server rejected the access token (closed with 1008)
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),
}
