//! # jurutani-media
//!
//! The attachment pipeline: validate an image handed over by the UI,
//! downscale and re-encode it, upload the compressed bytes to object
//! storage, and hand back a durable [`AttachmentRef`].
//!
//! The original bytes never reach storage -- what is uploaded is always the
//! recompressed JPEG.
//!
//! [`AttachmentRef`]: jurutani_shared::AttachmentRef

pub mod compress;
pub mod pipeline;
pub mod validate;

mod error;

pub use error::{MediaError, Result};
pub use pipeline::{attachment_path, MediaPipeline};
pub use validate::UploadFile;
