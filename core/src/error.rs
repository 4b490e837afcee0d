//! Error types for recall

use thiserror::Error;

/// Core error type for recall operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Protocol error: {0}")]
    Protocol(#[from] crate::protocol::ProtocolError),
}

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
