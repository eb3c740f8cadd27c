use axum::extract::DefaultBodyLimit;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .merge(webhook_routes())
        .merge(order_routes())
        .merge(product_routes())
        .merge(admin_routes())
        .merge(storage_routes(config))
}

fn webhook_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::webhook::stripe_webhook))
}

fn order_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::orders::list_my_orders))
        .routes(routes!(handlers::download::request_download))
        .routes(routes!(handlers::download::resolve_download))
}

fn product_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::products::create_product))
        .routes(routes!(handlers::products::create_upload_url))
        .routes(routes!(handlers::products::archive_product))
}

fn admin_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::admin::list_all_orders))
        .routes(routes!(handlers::admin::get_sales_summary))
}

fn storage_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let limit = usize::try_from(config.storage.max_object_size).unwrap_or(usize::MAX);
    OpenApiRouter::new()
        .routes(routes!(
            handlers::storage::get_signed_object,
            handlers::storage::put_signed_object
        ))
        .layer(DefaultBodyLimit::max(limit))
}
