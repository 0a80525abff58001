//! Error types for meshlod

use thiserror::Error;

/// Main error type for meshlod operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Result type alias for meshlod operations
pub type Result<T> = std::result::Result<T, Error>;
