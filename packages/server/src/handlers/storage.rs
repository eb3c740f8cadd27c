use axum::{
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::Response,
};
use chrono::Utc;
use common::storage::{
    ObjectKey, ObjectStore, SignedGrant, SignedMethod, filesystem::FilesystemObjectStore,
};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::error::{AppError, ErrorBody};
use crate::state::AppState;

/// Query parameters carried by a locally signed URL.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct SignedUrlParams {
    /// `GET` or `PUT`.
    pub method: Option<String>,
    /// Unix expiry timestamp.
    pub expires: Option<i64>,
    /// Content type for uploads, `Content-Disposition` for downloads.
    pub scope: Option<String>,
    /// Hex HMAC-SHA256 signature.
    pub signature: Option<String>,
}

fn local_store(state: &AppState) -> Result<&FilesystemObjectStore, AppError> {
    state
        .local_store
        .as_deref()
        .ok_or_else(|| AppError::NotFound("Local object storage is not enabled".into()))
}

/// Check the presented signature for `method` on `key`.
fn authorize(
    store: &FilesystemObjectStore,
    method: SignedMethod,
    key: &str,
    params: SignedUrlParams,
) -> Result<SignedGrant, AppError> {
    let key = ObjectKey::parse(key).map_err(|_| AppError::PermissionDenied)?;
    let (Some(presented), Some(expires), Some(signature)) =
        (params.method, params.expires, params.signature)
    else {
        return Err(AppError::PermissionDenied);
    };
    if SignedMethod::parse(&presented) != Some(method) {
        return Err(AppError::PermissionDenied);
    }

    let grant = SignedGrant {
        method,
        key,
        expires,
        scope: params.scope.unwrap_or_default(),
    };

    store
        .signer()
        .verify(&grant, &signature, Utc::now())
        .map_err(|e| {
            warn!(key = %grant.key, error = %e, "Signed URL rejected");
            AppError::PermissionDenied
        })?;

    Ok(grant)
}

/// Download an object through a locally signed URL.
#[utoipa::path(
    get,
    path = "/storage/{*key}",
    tag = "Storage",
    operation_id = "getSignedObject",
    summary = "Download via signed URL",
    description = "Serves objects for URLs issued by the filesystem object store. Only available when that backend is configured.",
    params(
        ("key" = String, Path, description = "Object key"),
        SignedUrlParams,
    ),
    responses(
        (status = 200, description = "Object bytes"),
        (status = 403, description = "Invalid or expired signature (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Object not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, params), fields(key = %key))]
pub async fn get_signed_object(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(params): Query<SignedUrlParams>,
) -> Result<Response, AppError> {
    let store = local_store(&state)?;
    let grant = authorize(store, SignedMethod::Get, &key, params)?;

    let object = store.get(&grant.key).await?;
    let content_type = object.content_type.unwrap_or_else(|| {
        mime_guess::from_path(grant.key.file_name())
            .first_or_octet_stream()
            .to_string()
    });

    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, "private, no-store");
    if !grant.scope.is_empty() {
        builder = builder.header(header::CONTENT_DISPOSITION, grant.scope.as_str());
    }

    builder
        .body(Body::from(object.data))
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// Upload an object through a locally signed URL.
#[utoipa::path(
    put,
    path = "/storage/{*key}",
    tag = "Storage",
    operation_id = "putSignedObject",
    summary = "Upload via signed URL",
    description = "Accepts a PUT for a URL issued by the filesystem object store. The request `Content-Type` must equal the signed content type.",
    params(
        ("key" = String, Path, description = "Object key"),
        SignedUrlParams,
    ),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "Object stored"),
        (status = 400, description = "Object too large (VALIDATION_ERROR)", body = ErrorBody),
        (status = 403, description = "Invalid signature or content type (PERMISSION_DENIED)", body = ErrorBody),
    ),
)]
#[instrument(skip(state, params, headers, body), fields(key = %key, size = body.len()))]
pub async fn put_signed_object(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Query(params): Query<SignedUrlParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, AppError> {
    let store = local_store(&state)?;
    let grant = authorize(store, SignedMethod::Put, &key, params)?;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if content_type != grant.scope {
        warn!(expected = %grant.scope, got = %content_type, "Upload content type mismatch");
        return Err(AppError::PermissionDenied);
    }

    store.put(&grant.key, content_type, &body).await?;
    info!("Stored object");

    Ok(StatusCode::OK)
}
