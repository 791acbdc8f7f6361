//! Error types for the peer service.

use thiserror::Error;

pub type PeerResult<T> = Result<T, PeerError>;

#[derive(Debug, Error)]
pub enum PeerError {
    #[error("failed to bind bootstrap server on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("bootstrap server error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("bootstrap server task ended unexpectedly: {0}")]
    Task(String),

    #[error("peers file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of one client call to a worker's bootstrap server.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    #[error("could not connect to {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("call to {endpoint} failed: {status}")]
    Call {
        endpoint: String,
        status: tonic::Status,
    },

    #[error("call to {endpoint} timed out")]
    Timeout { endpoint: String },
}
