//! Error types for I/O operations

use thiserror::Error;

/// Errors that can occur during I/O operations
#[derive(Error, Debug)]
pub enum IoError {
    #[error("Invalid file format: {format}")]
    InvalidFormat { format: String },

    #[error("Parse error: {message}")]
    ParseError { message: String },

    #[error("Write error: {message}")]
    WriteError { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IoError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::ParseError {
            message: message.into(),
        }
    }

    pub fn write(message: impl Into<String>) -> Self {
        Self::WriteError {
            message: message.into(),
        }
    }
}

impl From<IoError> for meshlod_core::Error {
    fn from(err: IoError) -> Self {
        match err {
            IoError::Io(e) => meshlod_core::Error::Io(e),
            IoError::InvalidFormat { format } => meshlod_core::Error::UnsupportedFormat(format),
            IoError::ParseError { message } => meshlod_core::Error::InvalidData(message),
            IoError::WriteError { message } => meshlod_core::Error::InvalidData(message),
        }
    }
}

/// Result type for I/O operations
pub type IoResult<T> = std::result::Result<T, IoError>;
