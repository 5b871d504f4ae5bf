use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Path-addressed object storage with public-URL resolution.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `data` under `path`, overwriting any existing object.
    async fn put(&self, path: &str, data: Bytes, content_type: &str) -> Result<()>;

    /// Delete the object at `path`.  Fails with `NotFound` if absent.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Publicly resolvable URL for the object at `path`.
    fn public_url(&self, path: &str) -> String;
}
