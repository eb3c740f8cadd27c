pub mod config;
pub mod storage;

pub use config::{FilesystemStoreConfig, S3StoreConfig, StorageBackend, StorageConfig};
