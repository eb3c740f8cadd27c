use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::storage::StorageError;
use sea_orm::DbErr;
use serde::Serialize;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `TOKEN_MISSING`,
    /// `TOKEN_INVALID`, `ADMIN_REQUIRED`, `PERMISSION_DENIED`, `SIGNATURE_INVALID`,
    /// `INVALID_LINK`, `LINK_EXPIRED`, `NOT_FOUND`, `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "metadata.productId is required")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    TokenMissing,
    TokenInvalid,
    /// Admin-only endpoint called without the admin role, reported as 401.
    AdminRequired,
    PermissionDenied,
    /// Webhook signature header missing, malformed, stale or wrong.
    SignatureInvalid,
    /// Download verification id unknown or already consumed.
    InvalidLink,
    /// Download verification past its expiry.
    LinkExpired,
    NotFound(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::TokenMissing => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_MISSING",
                    message: "Authentication required".into(),
                },
            ),
            AppError::TokenInvalid => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "TOKEN_INVALID",
                    message: "Invalid or expired token".into(),
                },
            ),
            AppError::AdminRequired => (
                StatusCode::UNAUTHORIZED,
                ErrorBody {
                    code: "ADMIN_REQUIRED",
                    message: "Unauthorized".into(),
                },
            ),
            AppError::PermissionDenied => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    code: "PERMISSION_DENIED",
                    message: "Insufficient permissions".into(),
                },
            ),
            AppError::SignatureInvalid => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "SIGNATURE_INVALID",
                    message: "Webhook signature verification failed".into(),
                },
            ),
            AppError::InvalidLink => (
                StatusCode::FORBIDDEN,
                ErrorBody {
                    code: "INVALID_LINK",
                    message: "Invalid link".into(),
                },
            ),
            AppError::LinkExpired => (
                StatusCode::GONE,
                ErrorBody {
                    code: "LINK_EXPIRED",
                    message: "Link expired".into(),
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AppError::NotFound(format!("Object '{key}' not found")),
            StorageError::InvalidKey(reason) => AppError::Validation(format!("Invalid key: {reason}")),
            StorageError::SizeLimitExceeded { actual, limit } => AppError::Validation(format!(
                "Object size {actual} exceeds limit of {limit} bytes"
            )),
            other => AppError::Internal(other.to_string()),
        }
    }
}
