//! The upload pipeline: validate, recompress, store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use jurutani_backend::ObjectStorage;
use jurutani_shared::constants::{
    JPEG_QUALITY, MAX_IMAGE_HEIGHT, MAX_IMAGE_WIDTH, STORAGE_PREFIX,
};
use jurutani_shared::{AttachmentRef, UserId};

use crate::compress::compress;
use crate::error::{MediaError, Result};
use crate::validate::{validate, UploadFile};

/// Storage path for a new attachment, unique per (sender, upload time).
pub fn attachment_path(sender: UserId, at: DateTime<Utc>) -> String {
    format!("{STORAGE_PREFIX}/{sender}/{}.jpg", at.timestamp_millis())
}

pub struct MediaPipeline {
    storage: Arc<dyn ObjectStorage>,
}

impl MediaPipeline {
    pub fn new(storage: Arc<dyn ObjectStorage>) -> Self {
        Self { storage }
    }

    /// Validate, recompress and upload `file` on behalf of `sender`.
    ///
    /// What lands in storage is always the recompressed JPEG; the original
    /// bytes are discarded.  Any failure here must abort the send that
    /// requested the upload -- a message must never reference an object
    /// that was not stored.
    pub async fn upload(&self, sender: UserId, file: &UploadFile) -> Result<AttachmentRef> {
        validate(file)?;

        let compressed = compress(&file.data, MAX_IMAGE_WIDTH, MAX_IMAGE_HEIGHT, JPEG_QUALITY)?;
        let path = attachment_path(sender, Utc::now());

        self.storage
            .put(&path, compressed.data.clone(), "image/jpeg")
            .await
            .map_err(MediaError::Upload)?;

        info!(
            path = %path,
            original = file.data.len(),
            compressed = compressed.data.len(),
            width = compressed.width,
            height = compressed.height,
            "attachment uploaded"
        );

        Ok(AttachmentRef {
            url: self.storage.public_url(&path),
            path,
        })
    }

    /// Best-effort removal of a stored attachment.
    ///
    /// Failures are logged and swallowed: callers run this as cleanup after
    /// a row deletion that must still succeed.
    pub async fn remove(&self, path: &str) {
        if let Err(e) = self.storage.delete(path).await {
            warn!(path, error = %e, "failed to delete attachment");
        }
    }
}
