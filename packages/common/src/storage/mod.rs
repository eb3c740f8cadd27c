mod error;
mod key;
mod signing;
mod traits;

pub mod filesystem;
#[cfg(feature = "object-storage")]
pub mod s3;

use std::sync::Arc;

pub use error::StorageError;
pub use key::ObjectKey;
pub use signing::{SignatureRejection, SignedGrant, SignedMethod, UrlSigner};
pub use traits::{ObjectStore, StoredObject};

use crate::config::{StorageBackend, StorageConfig};
use filesystem::FilesystemObjectStore;

/// Object store handles built from configuration.
///
/// `local` is set only for the filesystem backend, whose signed URLs are
/// served by this service.
pub struct ConfiguredStore {
    pub store: Arc<dyn ObjectStore>,
    pub local: Option<Arc<FilesystemObjectStore>>,
}

/// Build the configured object store backend.
pub async fn from_config(config: &StorageConfig) -> Result<ConfiguredStore, StorageError> {
    match config.backend {
        StorageBackend::Filesystem => {
            let fs_config = config.filesystem.as_ref().ok_or_else(|| {
                StorageError::Config("missing [storage.filesystem] section".into())
            })?;
            let signer = UrlSigner::new(&fs_config.signing_secret, &fs_config.public_base_url)?;
            let local = Arc::new(
                FilesystemObjectStore::new(fs_config.root.clone(), config.max_object_size, signer)
                    .await?,
            );
            Ok(ConfiguredStore {
                store: local.clone(),
                local: Some(local),
            })
        }
        #[cfg(feature = "object-storage")]
        StorageBackend::S3 => {
            let s3_config = config
                .s3
                .as_ref()
                .ok_or_else(|| StorageError::Config("missing [storage.s3] section".into()))?;
            Ok(ConfiguredStore {
                store: Arc::new(s3::S3ObjectStore::new(s3_config, config.max_object_size)?),
                local: None,
            })
        }
        #[cfg(not(feature = "object-storage"))]
        StorageBackend::S3 => Err(StorageError::Config(
            "S3 backend requires the `object-storage` feature".into(),
        )),
    }
}
