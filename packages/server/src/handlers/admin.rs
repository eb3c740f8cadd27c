use axum::{
    Json,
    extract::{Query, State},
};
use tracing::instrument;

use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::ledger::OrderLedger;
use crate::models::{
    AdminOrderListResponse, AdminOrderResponse, PageParams, Pagination, SalesSummaryResponse,
};
use crate::state::AppState;

/// List all orders.
#[utoipa::path(
    get,
    path = "/admin/orders",
    tag = "Admin",
    operation_id = "listAllOrders",
    summary = "List all orders",
    description = "Returns every order, newest first, with the product name and payment intent. Requires the admin role.",
    params(PageParams),
    responses(
        (status = 200, description = "Page of orders", body = AdminOrderListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn list_all_orders(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<AdminOrderListResponse>, AppError> {
    auth_user.require_admin()?;

    let (page, per_page) = params.resolve();
    let (rows, total) = OrderLedger::new(&state.db).list_all(page, per_page).await?;

    Ok(Json(AdminOrderListResponse {
        data: rows.into_iter().map(AdminOrderResponse::from).collect(),
        pagination: Pagination::new(page, per_page, total),
    }))
}

/// Sales figures for the dashboard.
#[utoipa::path(
    get,
    path = "/admin/sales",
    tag = "Admin",
    operation_id = "getSalesSummary",
    summary = "Get sales summary",
    description = "Total revenue, order count, average order value, revenue per product and the most recent 7 days with sales. Requires the admin role.",
    responses(
        (status = 200, description = "Sales summary", body = SalesSummaryResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn get_sales_summary(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<SalesSummaryResponse>, AppError> {
    auth_user.require_admin()?;

    let summary = OrderLedger::new(&state.db).sales_summary().await?;
    Ok(Json(summary.into()))
}
