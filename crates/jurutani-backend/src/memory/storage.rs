//! In-memory object storage.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::error::{BackendError, Result};
use crate::storage::ObjectStorage;

struct StoredObject {
    data: Bytes,
    #[allow(dead_code)]
    content_type: String,
}

/// Path-addressed objects in a map, with a configurable public base URL.
pub struct MemoryStorage {
    objects: Mutex<HashMap<String, StoredObject>>,
    base_url: String,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::with_base_url("memory://storage")
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
            base_url: base_url.into(),
        }
    }

    /// Whether an object exists at `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.objects
            .lock()
            .expect("storage lock poisoned")
            .contains_key(path)
    }

    /// The stored bytes at `path`, if any.
    pub fn object(&self, path: &str) -> Option<Bytes> {
        self.objects
            .lock()
            .expect("storage lock poisoned")
            .get(path)
            .map(|o| o.data.clone())
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().expect("storage lock poisoned").len()
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn put(&self, path: &str, data: Bytes, content_type: &str) -> Result<()> {
        debug!(path, size = data.len(), "storing object");
        self.objects.lock().expect("storage lock poisoned").insert(
            path.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let removed = self
            .objects
            .lock()
            .expect("storage lock poisoned")
            .remove(path);
        if removed.is_none() {
            return Err(BackendError::NotFound);
        }
        debug!(path, "deleted object");
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_delete_round_trip() {
        let storage = MemoryStorage::new();
        let path = "chat-images/user/1.jpg";

        storage
            .put(path, Bytes::from_static(b"jpeg-bytes"), "image/jpeg")
            .await
            .unwrap();
        assert!(storage.contains(path));
        assert_eq!(storage.object(path).unwrap().as_ref(), b"jpeg-bytes");
        assert_eq!(
            storage.public_url(path),
            format!("memory://storage/{path}")
        );

        storage.delete(path).await.unwrap();
        assert!(!storage.contains(path));
    }

    #[tokio::test]
    async fn deleting_a_missing_object_fails() {
        let storage = MemoryStorage::new();
        assert!(matches!(
            storage.delete("chat-images/nothing.jpg").await,
            Err(BackendError::NotFound)
        ));
    }
}
