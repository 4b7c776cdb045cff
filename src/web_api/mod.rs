//! WebAPI - REST API Endpoints
//!
//! ## Responsibilities
//!
//! - HTTP API routes for viewer clients
//! - Middleware notification callback
//! - WebSocket upgrade for realtime distribution

mod routes;
mod session_routes;
mod ptz_routes;
mod preset_routes;

pub use routes::create_router;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::models::HealthResponse;
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let asset_ok = state.assets.health_check().await.unwrap_or(false);

    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        asset_api_connected: asset_ok,
        active_sessions: state.sessions.session_count().await,
        ws_connections: state.realtime.connection_count(),
    };

    Json(response)
}
