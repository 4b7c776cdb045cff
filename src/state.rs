//! Application state
//!
//! Holds all shared components and state

use crate::asset_store::AssetStore;
use crate::ptz_dispatcher::HttpTransport;
use crate::realtime_hub::RealtimeHub;
use crate::stream_session::StreamSessionService;
use std::sync::Arc;
use std::time::Duration;

/// Session service over the production transport
pub type SessionService = StreamSessionService<HttpTransport>;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Bed/asset data service URL
    pub asset_api_url: String,
    /// Outbound HTTP timeout (middleware and asset service)
    pub request_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8083),
            asset_api_url: std::env::var("ASSET_API_URL")
                .unwrap_or_else(|_| "http://localhost:8090".to_string()),
            request_timeout: Duration::from_secs(
                std::env::var("REQUEST_TIMEOUT_SEC")
                    .ok()
                    .and_then(|t| t.parse().ok())
                    .unwrap_or(10),
            ),
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// Bed/asset data service adapter
    pub assets: Arc<AssetStore>,
    /// Per-viewer stream sessions
    pub sessions: Arc<SessionService>,
    /// RealtimeHub (WebSocket to viewers)
    pub realtime: Arc<RealtimeHub>,
}
