use std::sync::Arc;

use common::storage::ObjectStore;
use common::storage::filesystem::FilesystemObjectStore;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub store: Arc<dyn ObjectStore>,
    /// Set when the filesystem backend is active; its signed URLs are served
    /// by the storage routes.
    pub local_store: Option<Arc<FilesystemObjectStore>>,
    pub config: Arc<AppConfig>,
}
