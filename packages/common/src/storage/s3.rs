use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use http::{HeaderMap, HeaderValue, header};
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, Region};

use super::error::StorageError;
use super::key::ObjectKey;
use super::traits::{ObjectStore, StoredObject};
use crate::config::S3StoreConfig;

/// S3-compatible object store (AWS S3, Cloudflare R2, MinIO).
pub struct S3ObjectStore {
    bucket: Box<Bucket>,
    max_size: u64,
}

impl S3ObjectStore {
    pub fn new(config: &S3StoreConfig, max_size: u64) -> Result<Self, StorageError> {
        let region = match &config.endpoint {
            Some(endpoint) => Region::Custom {
                region: config.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config
                .region
                .parse()
                .map_err(|e| StorageError::Config(format!("invalid S3 region: {e}")))?,
        };

        let credentials = Credentials::new(
            Some(&config.access_key),
            Some(&config.secret_key),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Config(format!("invalid S3 credentials: {e}")))?;

        let mut bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| StorageError::Config(format!("invalid S3 bucket: {e}")))?;
        if config.path_style {
            bucket = bucket.with_path_style();
        }

        Ok(Self { bucket, max_size })
    }
}

fn expiry_secs(ttl: Duration) -> u32 {
    // Presigned URLs are capped at seven days by S3.
    u32::try_from(ttl.as_secs()).unwrap_or(u32::MAX).min(604_800)
}

fn backend_error(op: &str, err: S3Error) -> StorageError {
    match err {
        S3Error::HttpFailWithBody(404, _) => StorageError::NotFound(op.to_string()),
        other => StorageError::Backend(format!("S3 {op} failed: {other}")),
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn presign_get(
        &self,
        key: &ObjectKey,
        ttl: Duration,
        content_disposition: Option<&str>,
    ) -> Result<String, StorageError> {
        let queries = content_disposition.map(|value| {
            HashMap::from([(
                "response-content-disposition".to_string(),
                value.to_string(),
            )])
        });
        self.bucket
            .presign_get(key.as_str(), expiry_secs(ttl), queries)
            .await
            .map_err(|e| backend_error("presign GET", e))
    }

    async fn presign_put(
        &self,
        key: &ObjectKey,
        content_type: &str,
        ttl: Duration,
    ) -> Result<String, StorageError> {
        let value = HeaderValue::from_str(content_type)
            .map_err(|_| StorageError::Backend("content type is not a valid header".into()))?;
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, value);
        self.bucket
            .presign_put(key.as_str(), expiry_secs(ttl), Some(headers), None)
            .await
            .map_err(|e| backend_error("presign PUT", e))
    }

    async fn get(&self, key: &ObjectKey) -> Result<StoredObject, StorageError> {
        let response = self
            .bucket
            .get_object(key.as_str())
            .await
            .map_err(|e| backend_error("GET", e))?;

        match response.status_code() {
            200..=299 => {}
            404 => return Err(StorageError::NotFound(key.to_string())),
            code => {
                return Err(StorageError::Backend(format!(
                    "S3 GET returned status {code}"
                )));
            }
        }

        let content_type = response
            .headers()
            .into_iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .map(|(_, value)| value);

        Ok(StoredObject {
            data: response.bytes().to_vec(),
            content_type,
        })
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
        let response = self
            .bucket
            .put_object_with_content_type(key.as_str(), data, content_type)
            .await
            .map_err(|e| backend_error("PUT", e))?;
        match response.status_code() {
            200..=299 => Ok(()),
            code => Err(StorageError::Backend(format!(
                "S3 PUT returned status {code}"
            ))),
        }
    }
}
