//! Assure API server binary entrypoint.

use axum::body::Body;
use axum::http::Request;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use assure_common::config::AppConfig;
use assure_engine::services::Services;

use assure_api::routes::create_router;
use assure_api::state::AppState;

/// Upper bound on request bodies; contract sources are the largest payloads.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(
            "assure_api=debug,assure_engine=debug,assure_upstream=debug,tower_http=debug",
        )
    });
    if std::env::var("LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!("Starting Assure API server...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Wire upstream clients and analysis services
    let services = Services::from_config(&config)?;
    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(services, config);

    // Build router
    let app = create_router(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    id = %Uuid::new_v4(),
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(CorsLayer::permissive());

    // Start server
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("API server listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
