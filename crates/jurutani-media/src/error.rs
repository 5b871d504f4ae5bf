use thiserror::Error;

use jurutani_backend::BackendError;

/// Errors produced by the media pipeline.
#[derive(Error, Debug)]
pub enum MediaError {
    /// The file is not an accepted image type.
    #[error("Unsupported attachment type: {0}")]
    InvalidFile(String),

    /// The file exceeds the upload ceiling.
    #[error("Attachment too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    /// Decode or re-encode failure.
    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    /// The storage put failed; the message send must be aborted.
    #[error("Upload failed: {0}")]
    Upload(#[source] BackendError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MediaError>;
