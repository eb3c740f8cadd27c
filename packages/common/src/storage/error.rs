/// Errors that can occur during object storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(String),
    /// The key is not a valid object key.
    #[error("invalid object key: {0}")]
    InvalidKey(&'static str),
    /// An I/O error occurred.
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The object exceeds the configured size limit.
    #[error("object exceeds size limit ({actual} > {limit} bytes)")]
    SizeLimitExceeded { actual: u64, limit: u64 },
    /// The backend is misconfigured (missing section, bad URL, bad credentials).
    #[error("storage misconfigured: {0}")]
    Config(String),
    /// The remote backend rejected or failed the request.
    #[error("storage backend error: {0}")]
    Backend(String),
}
