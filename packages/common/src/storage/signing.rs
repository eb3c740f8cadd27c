use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use url::Url;

use super::error::StorageError;
use super::key::ObjectKey;

type HmacSha256 = Hmac<Sha256>;

/// Access granted by a signed URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignedMethod {
    Get,
    Put,
}

impl SignedMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Self::Get),
            "PUT" => Some(Self::Put),
            _ => None,
        }
    }
}

/// The parameters a signed URL commits to.
///
/// `scope` is the content type for uploads and the response
/// `Content-Disposition` (possibly empty) for downloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedGrant {
    pub method: SignedMethod,
    pub key: ObjectKey,
    pub expires: i64,
    pub scope: String,
}

/// Why a presented signed URL was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SignatureRejection {
    #[error("signature does not match")]
    Mismatch,
    #[error("signed URL has expired")]
    Expired,
}

/// Issues and checks HMAC-signed URLs for the filesystem object store.
///
/// URLs have the shape
/// `{base_url}/{key}?method=GET&expires=<unix>&scope=<..>&signature=<hex>`.
#[derive(Clone)]
pub struct UrlSigner {
    secret: Vec<u8>,
    base_url: Url,
}

impl UrlSigner {
    pub fn new(secret: &str, base_url: &str) -> Result<Self, StorageError> {
        if secret.is_empty() {
            return Err(StorageError::Config("signing secret must not be empty".into()));
        }
        let base_url = Url::parse(base_url)
            .map_err(|e| StorageError::Config(format!("invalid public base URL: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(StorageError::Config("public base URL cannot be a base".into()));
        }
        Ok(Self {
            secret: secret.as_bytes().to_vec(),
            base_url,
        })
    }

    fn mac(&self, grant: &SignedGrant) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.secret).expect("HMAC accepts any key length");
        mac.update(grant.method.as_str().as_bytes());
        mac.update(b"\n");
        mac.update(grant.key.as_str().as_bytes());
        mac.update(b"\n");
        mac.update(grant.expires.to_string().as_bytes());
        mac.update(b"\n");
        mac.update(grant.scope.as_bytes());
        mac
    }

    pub fn signature(&self, grant: &SignedGrant) -> String {
        hex::encode(self.mac(grant).finalize().into_bytes())
    }

    /// Render a signed URL for `grant`.
    pub fn sign(&self, grant: &SignedGrant) -> String {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(grant.key.segments());
        }
        url.query_pairs_mut()
            .append_pair("method", grant.method.as_str())
            .append_pair("expires", &grant.expires.to_string())
            .append_pair("scope", &grant.scope)
            .append_pair("signature", &self.signature(grant));
        url.into()
    }

    /// Check a presented signature against `grant` at time `now`.
    pub fn verify(
        &self,
        grant: &SignedGrant,
        signature: &str,
        now: DateTime<Utc>,
    ) -> Result<(), SignatureRejection> {
        let provided = hex::decode(signature).map_err(|_| SignatureRejection::Mismatch)?;
        let expected = self.mac(grant).finalize().into_bytes();
        if expected.len() != provided.len() || !bool::from(expected.as_slice().ct_eq(provided.as_slice())) {
            return Err(SignatureRejection::Mismatch);
        }
        if now.timestamp() > grant.expires {
            return Err(SignatureRejection::Expired);
        }
        Ok(())
    }
}
