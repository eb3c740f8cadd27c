use std::path::PathBuf;

use serde::Deserialize;

/// Which object store implementation to construct.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Filesystem,
    S3,
}

/// Object storage configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Backend to use. Default: "filesystem".
    #[serde(default = "default_backend")]
    pub backend: StorageBackend,
    /// Lifetime of signed download URLs. Default: 3600.
    #[serde(default = "default_download_url_ttl_secs")]
    pub download_url_ttl_secs: u64,
    /// Lifetime of signed upload URLs. Default: 300.
    #[serde(default = "default_upload_url_ttl_secs")]
    pub upload_url_ttl_secs: u64,
    /// Largest object accepted through the service. Default: 512 MiB.
    #[serde(default = "default_max_object_size")]
    pub max_object_size: u64,
    pub filesystem: Option<FilesystemStoreConfig>,
    pub s3: Option<S3StoreConfig>,
}

/// Settings for the filesystem backend.
#[derive(Debug, Deserialize, Clone)]
pub struct FilesystemStoreConfig {
    /// Directory holding objects. Default: "./data/objects".
    #[serde(default = "default_fs_root")]
    pub root: PathBuf,
    /// Absolute URL of the storage endpoint that serves signed URLs,
    /// e.g. "http://127.0.0.1:3000/api/v1/storage".
    pub public_base_url: String,
    /// HMAC key for signed URLs.
    pub signing_secret: String,
}

/// Settings for S3-compatible backends.
#[derive(Debug, Deserialize, Clone)]
pub struct S3StoreConfig {
    pub bucket: String,
    /// Region name. R2 uses "auto". Default: "auto".
    #[serde(default = "default_s3_region")]
    pub region: String,
    /// Custom endpoint, e.g. "https://<account>.r2.cloudflarestorage.com".
    pub endpoint: Option<String>,
    pub access_key: String,
    pub secret_key: String,
    /// Use path-style addressing (MinIO). Default: false.
    #[serde(default)]
    pub path_style: bool,
}

fn default_backend() -> StorageBackend {
    StorageBackend::Filesystem
}
fn default_download_url_ttl_secs() -> u64 {
    3600
}
fn default_upload_url_ttl_secs() -> u64 {
    300
}
fn default_max_object_size() -> u64 {
    512 * 1024 * 1024
}
fn default_fs_root() -> PathBuf {
    PathBuf::from("./data/objects")
}
fn default_s3_region() -> String {
    "auto".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            download_url_ttl_secs: default_download_url_ttl_secs(),
            upload_url_ttl_secs: default_upload_url_ttl_secs(),
            max_object_size: default_max_object_size(),
            filesystem: None,
            s3: None,
        }
    }
}
