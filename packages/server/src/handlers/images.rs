use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::Response,
};
use common::storage::ObjectKey;
use tracing::{debug, instrument};

use crate::error::{AppError, ErrorBody};
use crate::state::AppState;

const IMMUTABLE_CACHE: &str = "public, max-age=31536000, immutable";

/// Purchasable files share the bucket, so only image types are proxied.
fn is_image(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .and_then(|essence| essence.trim().split_once('/'))
        .is_some_and(|(kind, subtype)| kind.eq_ignore_ascii_case("image") && !subtype.is_empty())
}

fn image_not_found() -> AppError {
    AppError::NotFound("Image not found".into())
}

/// Serve a catalog image from object storage.
#[utoipa::path(
    get,
    path = "/images/{*key}",
    tag = "Images",
    operation_id = "getImage",
    summary = "Fetch a product image",
    description = "Streams a stored object with a long-lived immutable cache header. Keys are write-once, so the response never changes. Only objects with an `image/*` content type are served. Invalid keys, missing or non-image objects and storage failures are all reported as 404.",
    params(("key" = String, Path, description = "Object key, e.g. `products/<uuid>-cover.png`")),
    responses(
        (status = 200, description = "Image bytes"),
        (status = 404, description = "Image not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(key = %key))]
pub async fn get_image(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, AppError> {
    let key = ObjectKey::parse(&key).map_err(|e| {
        debug!(error = %e, "Rejected image key");
        image_not_found()
    })?;

    let object = state.store.get(&key).await.map_err(|e| {
        debug!(error = %e, "Image fetch failed");
        image_not_found()
    })?;

    let content_type = object.content_type.unwrap_or_else(|| {
        mime_guess::from_path(key.file_name())
            .first_or_octet_stream()
            .to_string()
    });
    if !is_image(&content_type) {
        debug!(content_type = %content_type, "Refusing to proxy non-image object");
        return Err(image_not_found());
    }

    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CACHE_CONTROL, IMMUTABLE_CACHE)
        .body(Body::from(object.data))
        .map_err(|e| AppError::Internal(e.to_string()))
}
