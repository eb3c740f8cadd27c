use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use common::storage::ObjectKey;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::fulfillment::{DownloadGrants, Resolution};
use crate::ledger::OrderLedger;
use crate::state::AppState;
use crate::utils::filename::attachment_disposition;

/// `303 See Other` to the resolver URL of a freshly issued verification.
#[derive(Debug)]
pub struct DownloadRedirect {
    pub verification_id: Uuid,
}

impl DownloadRedirect {
    pub fn location(&self) -> String {
        format!("/api/v1/download/{}", self.verification_id)
    }
}

impl IntoResponse for DownloadRedirect {
    fn into_response(self) -> Response {
        (StatusCode::SEE_OTHER, [(header::LOCATION, self.location())]).into_response()
    }
}

/// `302 Found` to a storage-signed URL. Never cached: the target expires.
#[derive(Debug)]
pub struct SignedRedirect {
    pub url: String,
}

impl IntoResponse for SignedRedirect {
    fn into_response(self) -> Response {
        (
            StatusCode::FOUND,
            [
                (header::LOCATION, self.url),
                (header::CACHE_CONTROL, "no-store".to_string()),
            ],
        )
            .into_response()
    }
}

fn order_not_found() -> AppError {
    AppError::NotFound("Order not found or access denied".into())
}

/// Exchange an owned order for a download verification.
#[utoipa::path(
    post,
    path = "/orders/{order_id}/download",
    tag = "Downloads",
    operation_id = "requestDownload",
    summary = "Request a download link",
    description = "Checks that the caller owns the order and issues a short-lived download verification. Redirects to the resolver URL. Unknown orders and orders owned by someone else are both reported as 404.",
    params(("order_id" = String, Path, description = "Order ID (UUID)")),
    responses(
        (status = 303, description = "Redirect to `/api/v1/download/{verification_id}`"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Order not found or access denied (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(order_id = %order_id, user_id = %auth_user.user_id))]
pub async fn request_download(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> Result<DownloadRedirect, AppError> {
    let order_id = Uuid::parse_str(&order_id).map_err(|_| order_not_found())?;

    let order = OrderLedger::new(&state.db)
        .find_owned(order_id, &auth_user.user_id)
        .await?
        .ok_or_else(order_not_found)?;

    let ttl = state
        .config
        .fulfillment
        .verification_ttl()
        .ok_or_else(|| {
            AppError::Internal("fulfillment.verification_ttl_secs is out of range".into())
        })?;
    let verification = DownloadGrants::new(&state.db)
        .issue(&order, ttl, Utc::now())
        .await?;

    info!(verification_id = %verification.id, "Issued download verification");

    Ok(DownloadRedirect {
        verification_id: verification.id,
    })
}

/// Resolve a download verification to a signed storage URL.
#[utoipa::path(
    get,
    path = "/download/{verification_id}",
    tag = "Downloads",
    operation_id = "resolveDownload",
    summary = "Resolve a download link",
    description = "Redirects to a time-limited signed URL for the purchased file. The response sets `Content-Disposition` to the product name.",
    params(("verification_id" = String, Path, description = "Download verification ID (UUID)")),
    responses(
        (status = 302, description = "Redirect to the signed object URL"),
        (status = 403, description = "Unknown or consumed link (INVALID_LINK)", body = ErrorBody),
        (status = 410, description = "Link expired (LINK_EXPIRED)", body = ErrorBody),
        (status = 500, description = "Storage failure (INTERNAL_ERROR)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(verification_id = %verification_id))]
pub async fn resolve_download(
    State(state): State<AppState>,
    Path(verification_id): Path<String>,
) -> Result<SignedRedirect, AppError> {
    let id = Uuid::parse_str(&verification_id).map_err(|_| AppError::InvalidLink)?;

    let resolution = DownloadGrants::new(&state.db)
        .resolve(id, Utc::now(), state.config.fulfillment.single_use_links)
        .await?;

    let product = match resolution {
        Resolution::Granted { product, .. } => product,
        Resolution::Invalid => return Err(AppError::InvalidLink),
        Resolution::Expired => return Err(AppError::LinkExpired),
    };

    let key = ObjectKey::parse(&product.file_key).map_err(|e| {
        AppError::Internal(format!("product {} has an invalid file key: {e}", product.id))
    })?;
    let disposition = attachment_disposition(&product.name, key.extension());
    let ttl = Duration::from_secs(state.config.storage.download_url_ttl_secs);

    let url = state
        .store
        .presign_get(&key, ttl, Some(&disposition))
        .await
        .map_err(|e| AppError::Internal(format!("Failed to sign download URL: {e}")))?;

    Ok(SignedRedirect { url })
}
