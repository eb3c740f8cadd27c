use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;

use super::error::StorageError;
use super::key::ObjectKey;
use super::signing::{SignedGrant, SignedMethod, UrlSigner};
use super::traits::{ObjectStore, StoredObject};

/// Filesystem-backed object store.
///
/// Objects live under `{root}/objects/{key}` with their content type in
/// `{root}/meta/{key}`. Signed URLs point back at the service's own storage
/// endpoint, which checks them with [`FilesystemObjectStore::signer`].
pub struct FilesystemObjectStore {
    root: PathBuf,
    max_size: u64,
    signer: UrlSigner,
}

impl FilesystemObjectStore {
    /// Create a new filesystem object store.
    pub async fn new(root: PathBuf, max_size: u64, signer: UrlSigner) -> Result<Self, StorageError> {
        fs::create_dir_all(root.join("objects")).await?;
        fs::create_dir_all(root.join("meta")).await?;
        fs::create_dir_all(root.join(".tmp")).await?;
        Ok(Self {
            root,
            max_size,
            signer,
        })
    }

    pub fn signer(&self) -> &UrlSigner {
        &self.signer
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    fn object_path(&self, key: &ObjectKey) -> PathBuf {
        join_key(&self.root.join("objects"), key)
    }

    fn meta_path(&self, key: &ObjectKey) -> PathBuf {
        join_key(&self.root.join("meta"), key)
    }

    /// Path for a temporary file during writes.
    fn temp_path(&self) -> PathBuf {
        self.root
            .join(".tmp")
            .join(uuid::Uuid::new_v4().to_string())
    }

    async fn write_atomic(&self, target: &Path, data: &[u8]) -> Result<(), StorageError> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        let temp_path = self.temp_path();
        if let Err(e) = fs::write(&temp_path, data).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&temp_path, target).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }
        Ok(())
    }

    fn expiry(ttl: Duration) -> i64 {
        Utc::now().timestamp() + i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX / 2)
    }
}

fn join_key(base: &Path, key: &ObjectKey) -> PathBuf {
    key.segments().fold(base.to_path_buf(), |path, segment| path.join(segment))
}

#[async_trait]
impl ObjectStore for FilesystemObjectStore {
    async fn presign_get(
        &self,
        key: &ObjectKey,
        ttl: Duration,
        content_disposition: Option<&str>,
    ) -> Result<String, StorageError> {
        Ok(self.signer.sign(&SignedGrant {
            method: SignedMethod::Get,
            key: key.clone(),
            expires: Self::expiry(ttl),
            scope: content_disposition.unwrap_or_default().to_string(),
        }))
    }

    async fn presign_put(
        &self,
        key: &ObjectKey,
        content_type: &str,
        ttl: Duration,
    ) -> Result<String, StorageError> {
        Ok(self.signer.sign(&SignedGrant {
            method: SignedMethod::Put,
            key: key.clone(),
            expires: Self::expiry(ttl),
            scope: content_type.to_string(),
        }))
    }

    async fn get(&self, key: &ObjectKey) -> Result<StoredObject, StorageError> {
        let data = match fs::read(self.object_path(key)).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(key.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let content_type = fs::read_to_string(self.meta_path(key)).await.ok();
        Ok(StoredObject { data, content_type })
    }

    async fn put(
        &self,
        key: &ObjectKey,
        content_type: &str,
        data: &[u8],
    ) -> Result<(), StorageError> {
        if data.len() as u64 > self.max_size {
            return Err(StorageError::SizeLimitExceeded {
                actual: data.len() as u64,
                limit: self.max_size,
            });
        }
        self.write_atomic(&self.meta_path(key), content_type.as_bytes())
            .await?;
        self.write_atomic(&self.object_path(key), data).await
    }
}
