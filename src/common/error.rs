//! Error types for ringkv

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // === Storage Errors ===
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Corrupted data: {0}")]
    Corrupted(String),

    // === Replication Errors ===
    #[error("No replica accepted the operation for key: {0}")]
    ReplicationFailed(String),

    // === Network Errors ===
    #[error("gRPC error: {0}")]
    Grpc(#[from] tonic::Status),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    // === Config Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === Generic ===
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Convert to gRPC status for RPC responses
    pub fn to_grpc_status(&self) -> tonic::Status {
        use tonic::Code;
        match self {
            Error::KeyNotFound(_) => tonic::Status::new(Code::NotFound, self.to_string()),
            Error::InvalidConfig(_) => tonic::Status::new(Code::InvalidArgument, self.to_string()),
            Error::Grpc(status) => status.clone(),
            _ => tonic::Status::new(Code::Internal, self.to_string()),
        }
    }

    /// Convert to HTTP status code
    pub fn to_http_status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Error::KeyNotFound(_) | Error::ReplicationFailed(_) => StatusCode::NOT_FOUND,
            Error::InvalidConfig(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// Implement From for common error types
impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Other(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Other(s)
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Other(e.to_string())
    }
}
