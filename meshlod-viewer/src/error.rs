//! Error types for the viewer

use meshlod_io::IoError;
use thiserror::Error;

/// Errors surfaced by viewer operations
#[derive(Error, Debug)]
pub enum ViewerError {
    #[error(transparent)]
    Core(#[from] meshlod_core::Error),

    #[error(transparent)]
    Io(#[from] IoError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Render loop already started")]
    RenderLoopAlreadyStarted,

    #[error("Model load failed: {0}")]
    LoadFailed(String),

    #[error("Model loader stopped before delivering a result")]
    LoaderDisconnected,
}

impl From<std::io::Error> for ViewerError {
    fn from(err: std::io::Error) -> Self {
        ViewerError::Io(IoError::Io(err))
    }
}

/// Result type for viewer operations
pub type ViewerResult<T> = std::result::Result<T, ViewerError>;
