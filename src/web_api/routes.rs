//! Router assembly, notification callback and WebSocket handling

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use super::preset_routes::{list_presets, regenerate_boundary, save_preset};
use super::ptz_routes::{acquire_lock, move_camera, release_lock, request_access};
use super::session_routes::{close_session, get_session, open_session, player_event, poll_status, reset_session};
use crate::lock_arbiter::AccessEvent;
use crate::realtime_hub::{CameraAvailableMessage, HubMessage};
use crate::state::AppState;

/// Create API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(super::health_check))
        // Sessions
        .route("/api/sessions", post(open_session))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id", delete(close_session))
        .route("/api/sessions/:id/reset", post(reset_session))
        .route("/api/sessions/:id/player-event", post(player_event))
        .route("/api/sessions/:id/status", get(poll_status))
        // Camera control
        .route("/api/sessions/:id/lock", post(acquire_lock))
        .route("/api/sessions/:id/lock", delete(release_lock))
        .route("/api/sessions/:id/request-access", post(request_access))
        .route("/api/sessions/:id/move", post(move_camera))
        // Presets & boundary
        .route("/api/sessions/:id/presets", post(save_preset))
        .route("/api/beds/:bed_id/presets", get(list_presets))
        .route("/api/beds/:bed_id/boundary", post(regenerate_boundary))
        // Middleware notification callback
        .route("/api/notifications", post(receive_notification))
        // WebSocket
        .route("/ws", get(ws_handler))
        .with_state(state)
}

/// POST /api/notifications
/// Out-of-band notification from the middleware. At-most-once delivery;
/// a lost notification only delays the next user-triggered attempt.
async fn receive_notification(
    State(state): State<AppState>,
    Json(event): Json<AccessEvent>,
) -> impl IntoResponse {
    tracing::info!(
        camera_id = %event.camera_id(),
        event = ?event,
        "Middleware notification received"
    );

    state.sessions.handle_access_event(&event).await;

    // Availability is of interest to every connected viewer, not just the
    // ones with an open session on the camera
    if let AccessEvent::CameraAvailable { camera_id, message } = &event {
        state
            .realtime
            .broadcast(HubMessage::CameraAvailable(CameraAvailableMessage {
                camera_id: camera_id.clone(),
                message: message.clone(),
            }))
            .await;
    }

    StatusCode::NO_CONTENT
}

#[derive(Debug, Deserialize)]
struct WsQuery {
    user_id: String,
}

/// GET /ws?user_id=...
async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state, query.user_id))
}

/// Handle WebSocket connection
async fn handle_websocket(socket: WebSocket, state: AppState, user_id: String) {
    let (mut sender, mut receiver) = socket.split();

    let (conn_id, mut rx) = state.realtime.register(user_id).await;

    // Forward messages from hub to WebSocket
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    // Drain incoming frames until the client goes away
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Close(_)) | Err(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.realtime.unregister(&conn_id).await;
}
