use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;
use crate::state::AppState;
use crate::utils::jwt;

/// Authenticated caller extracted from the `Authorization: Bearer <token>` header.
///
/// Add this as a handler parameter to require authentication.
/// Admin checks happen via `require_admin()` in the handler body.
pub struct AuthUser {
    pub user_id: String,
    is_admin: bool,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    /// Returns `Err(PermissionDenied)` unless the caller holds the admin role.
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AppError::PermissionDenied)
        }
    }
}

/// Like [`AuthUser`] but any failure, including a non-admin caller, is
/// reported as 401 `ADMIN_REQUIRED`. The rejection happens during
/// extraction, before the handler body runs.
pub struct AdminUser(pub AuthUser);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::TokenMissing)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AppError::TokenInvalid)?;

        let claims =
            jwt::verify(&state.config.auth.jwt_secret, token).map_err(|_| AppError::TokenInvalid)?;

        if claims.sub.is_empty() {
            return Err(AppError::TokenInvalid);
        }

        let is_admin = claims.role.as_deref() == Some(state.config.auth.admin_role.as_str());

        Ok(AuthUser {
            user_id: claims.sub,
            is_admin,
        })
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match AuthUser::from_request_parts(parts, state).await {
            Ok(user) if user.is_admin() => Ok(AdminUser(user)),
            _ => Err(AppError::AdminRequired),
        }
    }
}
