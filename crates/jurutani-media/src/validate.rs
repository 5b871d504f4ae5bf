//! Attachment validation: MIME allow-list and size ceiling.
//!
//! Both checks resolve locally, before any decode work or network call.

use bytes::Bytes;

use jurutani_shared::constants::{ALLOWED_IMAGE_TYPES, MAX_ATTACHMENT_SIZE};

use crate::error::{MediaError, Result};

/// An attachment as handed over by the UI layer.
#[derive(Debug, Clone)]
pub struct UploadFile {
    /// Original file name, used for MIME guessing when no content type is
    /// supplied.
    pub name: String,
    /// Declared content type, if the UI knows it.
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type: None,
            data: data.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Declared content type, or a guess from the file name.
    pub fn resolved_type(&self) -> String {
        match &self.content_type {
            Some(ct) => ct.clone(),
            None => mime_guess::from_path(&self.name)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
        }
    }
}

/// Check `file` against the allow-list and the size ceiling.
pub fn validate(file: &UploadFile) -> Result<()> {
    if file.data.is_empty() {
        return Err(MediaError::InvalidFile("empty file".to_string()));
    }

    let size = file.data.len();
    if size > MAX_ATTACHMENT_SIZE {
        return Err(MediaError::TooLarge {
            size,
            max: MAX_ATTACHMENT_SIZE,
        });
    }

    let mime = file.resolved_type();
    if !ALLOWED_IMAGE_TYPES.contains(&mime.as_str()) {
        return Err(MediaError::InvalidFile(mime));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_images_by_declared_type() {
        let file = UploadFile::new("foto", vec![0u8; 16]).with_content_type("image/png");
        assert!(validate(&file).is_ok());
    }

    #[test]
    fn guesses_type_from_file_name() {
        let file = UploadFile::new("sawah.jpg", vec![0u8; 16]);
        assert!(validate(&file).is_ok());

        let file = UploadFile::new("laporan.pdf", vec![0u8; 16]);
        assert!(matches!(validate(&file), Err(MediaError::InvalidFile(_))));
    }

    #[test]
    fn rejects_oversized_files() {
        let file = UploadFile::new("besar.png", vec![0u8; MAX_ATTACHMENT_SIZE + 1]);
        assert!(matches!(validate(&file), Err(MediaError::TooLarge { .. })));
    }

    #[test]
    fn rejects_empty_files() {
        let file = UploadFile::new("kosong.png", Vec::new());
        assert!(matches!(validate(&file), Err(MediaError::InvalidFile(_))));
    }
}
