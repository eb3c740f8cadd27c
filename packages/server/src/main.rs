use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use storefront_server::config::{AppConfig, CorsConfig};
use storefront_server::database::init_db;
use storefront_server::fulfillment::run_verification_sweeper;
use storefront_server::seed::ensure_indexes;
use storefront_server::state::AppState;
use storefront_server::build_router;

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allow_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static("authorization"),
            HeaderName::from_static("content-type"),
        ])
        .max_age(Duration::from_secs(config.max_age))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,storefront_server=debug,tower_http=info".into()),
        )
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = init_db(&config.database.url)
        .await
        .context("Failed to connect to database")?;
    ensure_indexes(&db).await?;

    let storage = common::storage::from_config(&config.storage)
        .await
        .context("Failed to initialise object storage")?;
    info!(backend = ?config.storage.backend, "Object storage ready");

    let retention = config
        .fulfillment
        .expired_retention()
        .context("Invalid fulfillment.expired_retention_secs")?;
    tokio::spawn(run_verification_sweeper(
        db.clone(),
        config.fulfillment.sweep_interval_secs,
        retention,
    ));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server.host / server.port")?;
    let cors = cors_layer(&config.server.cors);

    let state = AppState {
        db,
        store: storage.store,
        local_store: storage.local,
        config: Arc::new(config),
    };

    let app = build_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    info!("Server running at http://{}", addr);
    info!("API docs at http://{}/scalar", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
