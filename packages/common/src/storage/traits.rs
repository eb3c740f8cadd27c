use std::time::Duration;

use async_trait::async_trait;

use super::error::StorageError;
use super::key::ObjectKey;

/// An object fetched from the store.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Vec<u8>,
    /// Content type recorded at upload time, when the backend knows it.
    pub content_type: Option<String>,
}

/// Key-addressed object storage that can issue time-limited signed URLs.
///
/// The service never streams purchased files itself: downloads and uploads
/// go straight to the backend through signed URLs. `get` exists for the
/// image proxy.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Signed URL granting a GET of `key` for `ttl`.
    ///
    /// When `content_disposition` is set, the backend answers the GET with
    /// that `Content-Disposition` header.
    async fn presign_get(
        &self,
        key: &ObjectKey,
        ttl: Duration,
        content_disposition: Option<&str>,
    ) -> Result<String, StorageError>;

    /// Signed URL granting a PUT of exactly `key` with `content_type` for `ttl`.
    async fn presign_put(
        &self,
        key: &ObjectKey,
        content_type: &str,
        ttl: Duration,
    ) -> Result<String, StorageError>;

    /// Fetch a whole object.
    async fn get(&self, key: &ObjectKey) -> Result<StoredObject, StorageError>;

    /// Store a whole object, replacing any previous content.
    async fn put(
        &self,
        key: &ObjectKey,
        content_type: &str,
        data: &[u8],
    ) -> Result<(), StorageError>;
}
