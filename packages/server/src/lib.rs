pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod fulfillment;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod payments;
pub mod routes;
pub mod seed;
pub mod state;
pub mod utils;

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable as ScalarServable};

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        version = "1.0.0",
        description = "Order fulfillment and download delivery for a digital-goods storefront"
    ),
    tags(
        (name = "Webhooks", description = "Payment provider callbacks"),
        (name = "Orders", description = "Purchases owned by the caller"),
        (name = "Downloads", description = "Download grants for purchased files"),
        (name = "Products", description = "Catalog registration and uploads"),
        (name = "Admin", description = "Order ledger and sales reporting"),
        (name = "Images", description = "Cached catalog images"),
        (name = "Storage", description = "Signed URL endpoint of the filesystem object store"),
        (name = "Health", description = "Service health"),
    ),
    modifiers(&SecurityAddon),
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest("/api", routes::api_routes(&state.config))
        .split_for_parts();

    let spec = api.clone();
    router
        .route(
            "/api-docs/openapi.json",
            axum::routing::get(move || async move { axum::Json(spec) }),
        )
        .with_state(state)
        .merge(Scalar::with_url("/scalar", api))
}
