//! IS23 Bedcam Gateway
//!
//! Main entry point for the gateway application.

use is23_bedcam::{
    asset_store::AssetStore,
    ptz_dispatcher::{HttpTransport, PtzDispatcher},
    realtime_hub::RealtimeHub,
    state::{AppConfig, AppState},
    stream_session::StreamSessionService,
    web_api,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "is23_bedcam=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting IS23 Bedcam Gateway v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        host = %config.host,
        port = config.port,
        asset_api_url = %config.asset_api_url,
        request_timeout_sec = config.request_timeout.as_secs(),
        "Configuration loaded"
    );

    // Initialize components
    let transport = Arc::new(HttpTransport::new(config.request_timeout));
    let dispatcher = PtzDispatcher::new(transport);

    let assets = Arc::new(AssetStore::new(
        config.asset_api_url.clone(),
        config.request_timeout,
    ));
    tracing::info!("AssetStore initialized");

    let realtime = Arc::new(RealtimeHub::new());
    tracing::info!("RealtimeHub initialized");

    let sessions = Arc::new(StreamSessionService::new(
        dispatcher,
        Arc::clone(&assets),
        Arc::clone(&realtime),
    ));
    tracing::info!("StreamSessionService initialized");

    let state = AppState {
        config: config.clone(),
        assets,
        sessions,
        realtime,
    };

    // Build router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = web_api::create_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!(addr = %addr, "Listening");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install shutdown handler");
    }
    tracing::info!("Shutdown signal received");
}
