use std::time::Duration;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use common::storage::ObjectKey;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait, IntoActiveModel};
use tracing::{info, instrument};

use crate::entity::product;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::{AdminUser, AuthUser};
use crate::extractors::json::AppJson;
use crate::models::{
    CreateProductRequest, ProductResponse, UploadUrlRequest, UploadUrlResponse, validate_name,
};
use crate::state::AppState;
use crate::utils::filename::{validate_content_type, validate_flat_filename};

/// Key prefix for catalog uploads.
const UPLOAD_PREFIX: &str = "products";

/// Mint a signed upload target for a new catalog asset.
#[utoipa::path(
    post,
    path = "/products/upload-url",
    tag = "Products",
    operation_id = "createUploadUrl",
    summary = "Create a signed upload URL",
    description = "Generates a fresh object key `products/<uuid>-<fileName>` and returns a short-lived signed PUT URL bound to that key and `fileType`. Requires the admin role; any other caller gets 401 before the body is read.",
    request_body = UploadUrlRequest,
    responses(
        (status = 200, description = "Signed upload target", body = UploadUrlResponse),
        (status = 400, description = "Missing or invalid fileName / fileType (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Not an admin (ADMIN_REQUIRED)", body = ErrorBody),
        (status = 500, description = "Storage failure (INTERNAL_ERROR)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, admin, payload), fields(user_id = %admin.0.user_id))]
pub async fn create_upload_url(
    admin: AdminUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<UploadUrlRequest>,
) -> Result<Json<UploadUrlResponse>, AppError> {
    let file_name = payload
        .file_name
        .as_deref()
        .ok_or_else(|| AppError::Validation("fileName is required".into()))?;
    let file_name =
        validate_flat_filename(file_name).map_err(|e| AppError::Validation(e.message().into()))?;

    let file_type = payload
        .file_type
        .as_deref()
        .ok_or_else(|| AppError::Validation("fileType is required".into()))?;
    let file_type = validate_content_type(file_type).map_err(|e| AppError::Validation(e.into()))?;

    let key = ObjectKey::for_upload(UPLOAD_PREFIX, file_name)?;
    let ttl = Duration::from_secs(state.config.storage.upload_url_ttl_secs);

    let signed_url = state
        .store
        .presign_put(&key, file_type, ttl)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to sign upload URL: {e}")))?;

    info!(file_key = %key, "Issued upload URL");

    Ok(Json(UploadUrlResponse {
        signed_url,
        file_key: key.to_string(),
    }))
}

fn parse_stored_key(field: &str, key: &str) -> Result<ObjectKey, AppError> {
    ObjectKey::parse(key.trim()).map_err(|e| AppError::Validation(format!("Invalid {field}: {e}")))
}

/// Register a product against previously uploaded objects.
#[utoipa::path(
    post,
    path = "/products",
    tag = "Products",
    operation_id = "createProduct",
    summary = "Create a product",
    description = "Creates a catalog entry. `file_key` and `image_key` are keys returned by the upload-URL endpoint. Requires the admin role.",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(name = %payload.name))]
pub async fn create_product(
    auth_user: AuthUser,
    State(state): State<AppState>,
    AppJson(payload): AppJson<CreateProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>), AppError> {
    auth_user.require_admin()?;

    validate_name(&payload.name)?;
    if payload.price_in_cents < 0 {
        return Err(AppError::Validation("price_in_cents must not be negative".into()));
    }
    let file_key = parse_stored_key("file_key", &payload.file_key)?;
    let image_key = parse_stored_key("image_key", &payload.image_key)?;

    let model = product::ActiveModel {
        name: Set(payload.name.trim().to_string()),
        description: Set(payload.description),
        price_in_cents: Set(payload.price_in_cents),
        file_key: Set(file_key.to_string()),
        image_key: Set(image_key.to_string()),
        is_available: Set(payload.is_available.unwrap_or(true)),
        created_at: Set(Utc::now()),
        archived_at: Set(None),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!(product_id = model.id, "Product created");

    Ok((StatusCode::CREATED, Json(ProductResponse::from(model))))
}

/// Archive a product.
#[utoipa::path(
    delete,
    path = "/products/{id}",
    tag = "Products",
    operation_id = "archiveProduct",
    summary = "Archive a product",
    description = "Marks the product unavailable and archived. The row is kept so existing orders and download links keep working. Requires the admin role.",
    params(("id" = i32, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Product archived"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Product not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn archive_product(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_admin()?;

    let existing = product::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".into()))?;

    if existing.archived_at.is_none() {
        let mut active = existing.into_active_model();
        active.is_available = Set(false);
        active.archived_at = Set(Some(Utc::now()));
        active.update(&state.db).await?;
        info!(product_id = id, "Product archived");
    }

    Ok(StatusCode::NO_CONTENT)
}
