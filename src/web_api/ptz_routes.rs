//! Camera control API endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::Result;
use crate::lock_arbiter::LockResult;
use crate::models::ApiResponse;
use crate::state::AppState;
use crate::stream_session::{MoveRequest, StreamSessionView};

fn lock_result_body(result: LockResult) -> Value {
    match result {
        LockResult::Granted => json!({"result": "granted"}),
        LockResult::Denied { holder } => json!({
            "result": "denied",
            "holder": holder,
        }),
        LockResult::Unreachable => json!({"result": "unreachable"}),
    }
}

/// POST /api/sessions/:id/lock
/// Acquire exclusive control. A denial is a 200 with the holder identity;
/// the viewer surfaces it as a notice with a request-access option.
pub async fn acquire_lock(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Value>>> {
    let result = state.sessions.acquire_lock(session_id).await?;
    Ok(Json(ApiResponse::success(lock_result_body(result))))
}

/// DELETE /api/sessions/:id/lock
/// Hand off control without closing the session
pub async fn release_lock(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Value>>> {
    state.sessions.release_lock(session_id).await?;
    Ok(Json(ApiResponse::success(json!({"released": true}))))
}

/// POST /api/sessions/:id/request-access
/// Cooperative takeover; control only transfers on a later re-acquire
pub async fn request_access(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ApiResponse<Value>>> {
    let result = state.sessions.request_access(session_id).await?;
    Ok(Json(ApiResponse::success(lock_result_body(result))))
}

/// POST /api/sessions/:id/move
/// Absolute or relative move; requires held-by-self lock belief
pub async fn move_camera(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<MoveRequest>,
) -> Result<Json<ApiResponse<StreamSessionView>>> {
    let view = state.sessions.move_camera(session_id, request).await?;
    Ok(Json(ApiResponse::success(view)))
}
