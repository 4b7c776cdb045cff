//! RealtimeHub - WebSocket Distribution to Viewer Clients
//!
//! ## Responsibilities
//!
//! - WebSocket connection management per viewer
//! - Access-request prompts to the current camera holder
//! - Availability notices to every interested viewer
//! - Player error and stream state propagation
//!
//! Delivery is best-effort: a dropped connection loses its messages, and
//! no ordering is guaranteed relative to middleware command responses.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Hub message types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
#[serde(rename_all = "snake_case")]
pub enum HubMessage {
    /// Another viewer wants control; shown to the current holder only
    AccessRequested(AccessRequestedMessage),
    /// Camera became free; interested viewers should attempt re-acquire
    CameraAvailable(CameraAvailableMessage),
    /// Player-reported error, propagated without touching session state
    PlayerError(PlayerErrorMessage),
    /// Stream status/alert change for a session
    StreamState(StreamStateMessage),
}

/// Access request prompt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessRequestedMessage {
    pub camera_id: String,
    pub requested_by: String,
    pub message: String,
}

/// Camera availability notice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraAvailableMessage {
    pub camera_id: String,
    pub message: String,
}

/// Player error propagation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerErrorMessage {
    pub session_id: Uuid,
    pub camera_id: String,
    pub error: String,
}

/// Stream state change notice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamStateMessage {
    pub session_id: Uuid,
    pub camera_id: String,
    pub status: String,
    pub alert: String,
}

/// Client connection
struct ClientConnection {
    id: Uuid,
    user_id: String,
    tx: mpsc::UnboundedSender<String>,
}

/// RealtimeHub instance
pub struct RealtimeHub {
    connections: RwLock<HashMap<Uuid, ClientConnection>>,
    connection_count: AtomicU64,
}

impl RealtimeHub {
    /// Create new RealtimeHub
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            connection_count: AtomicU64::new(0),
        }
    }

    /// Register a new client
    pub async fn register(&self, user_id: String) -> (Uuid, mpsc::UnboundedReceiver<String>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        let conn = ClientConnection { id, user_id, tx };

        {
            let mut connections = self.connections.write().await;
            connections.insert(id, conn);
        }

        self.connection_count.fetch_add(1, Ordering::Relaxed);

        tracing::info!(connection_id = %id, "Viewer connected");

        (id, rx)
    }

    /// Unregister a client
    pub async fn unregister(&self, id: &Uuid) {
        let mut connections = self.connections.write().await;
        if connections.remove(id).is_some() {
            self.connection_count.fetch_sub(1, Ordering::Relaxed);
            tracing::info!(connection_id = %id, "Viewer disconnected");
        }
    }

    /// Broadcast message to all clients
    pub async fn broadcast(&self, message: HubMessage) {
        let json = match serde_json::to_string(&message) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize hub message");
                return;
            }
        };

        let connections = self.connections.read().await;
        tracing::debug!(
            client_count = connections.len(),
            "Broadcasting to connected viewers"
        );

        for conn in connections.values() {
            if let Err(e) = conn.tx.send(json.clone()) {
                tracing::warn!(connection_id = %conn.id, error = %e, "Failed to send message");
            }
        }
    }

    /// Send message to specific user
    pub async fn send_to_user(&self, user_id: &str, message: HubMessage) {
        let json = match serde_json::to_string(&message) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize hub message");
                return;
            }
        };

        let connections = self.connections.read().await;
        for conn in connections.values() {
            if conn.user_id == user_id {
                if let Err(e) = conn.tx.send(json.clone()) {
                    tracing::warn!(connection_id = %conn.id, error = %e, "Failed to send message");
                }
            }
        }
    }

    /// Get connection count
    pub fn connection_count(&self) -> u64 {
        self.connection_count.load(Ordering::Relaxed)
    }
}

impl Default for RealtimeHub {
    fn default() -> Self {
        Self::new()
    }
}
