//! Stream session API endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::Result;
use crate::models::ApiResponse;
use crate::state::AppState;
use crate::stream_session::{PlayerEvent, StreamSessionView};

#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    pub viewer: String,
    pub bed_id: String,
}

/// POST /api/sessions
/// Open a viewing session for a bed: lock negotiation plus stream token
pub async fn open_session(
    State(state): State<AppState>,
    Json(request): Json<OpenSessionRequest>,
) -> Result<Json<ApiResponse<StreamSessionView>>> {
    let view = state
        .sessions
        .open_bed(&request.viewer, &request.bed_id)
        .await?;
    Ok(Json(ApiResponse::success(view)))
}

/// GET /api/sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ApiResponse<StreamSessionView>>> {
    let view = state.sessions.view(session_id).await?;
    Ok(Json(ApiResponse::success(view)))
}

/// DELETE /api/sessions/:id
/// Teardown; the lock release runs unconditionally
pub async fn close_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Value>>> {
    state.sessions.close(session_id).await?;
    Ok(Json(ApiResponse::success(json!({"closed": true}))))
}

/// POST /api/sessions/:id/reset
/// Manual retry: fresh token, stale in-flight responses ignored
pub async fn reset_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ApiResponse<StreamSessionView>>> {
    let view = state.sessions.reset(session_id).await?;
    Ok(Json(ApiResponse::success(view)))
}

/// POST /api/sessions/:id/player-event
/// Lifecycle callback from the viewer's video player
pub async fn player_event(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(event): Json<PlayerEvent>,
) -> Result<Json<ApiResponse<StreamSessionView>>> {
    let view = state.sessions.player_event(session_id, event).await?;
    Ok(Json(ApiResponse::success(view)))
}

/// GET /api/sessions/:id/status
/// Device status poll; a device failure triggers an automatic reset
pub async fn poll_status(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Value>>> {
    match state.sessions.check_status(session_id).await? {
        Some(status) => Ok(Json(ApiResponse::success(json!({
            "position": status.position,
            "moving": status.moving,
        })))),
        None => Ok(Json(ApiResponse::error("Camera unreachable"))),
    }
}
