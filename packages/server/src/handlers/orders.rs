use axum::{Json, extract::State};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::ledger::OrderLedger;
use crate::models::OrderResponse;
use crate::state::AppState;

/// List the caller's orders.
#[utoipa::path(
    get,
    path = "/orders",
    tag = "Orders",
    operation_id = "listMyOrders",
    summary = "List my orders",
    description = "Returns the caller's orders, newest first, with product details.",
    responses(
        (status = 200, description = "Orders owned by the caller", body = Vec<OrderResponse>),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn list_my_orders(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<OrderResponse>>, AppError> {
    let rows = OrderLedger::new(&state.db)
        .list_for_user(&auth_user.user_id)
        .await?;

    Ok(Json(rows.into_iter().map(OrderResponse::from).collect()))
}
