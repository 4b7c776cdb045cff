//! Preset and boundary API endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::boundary::BoundaryRegion;
use crate::error::{Error, Result};
use crate::models::{ApiResponse, Preset};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SavePresetRequest {
    pub name: String,
}

/// POST /api/sessions/:id/presets
/// Save the camera's current position as a named preset
pub async fn save_preset(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SavePresetRequest>,
) -> Result<Json<ApiResponse<Preset>>> {
    if request.name.trim().is_empty() {
        return Err(Error::Validation("Preset name must not be empty".to_string()));
    }

    let preset = state
        .sessions
        .save_preset(session_id, request.name.trim())
        .await?;
    Ok(Json(ApiResponse::success(preset)))
}

/// GET /api/beds/:bed_id/presets
pub async fn list_presets(
    State(state): State<AppState>,
    Path(bed_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<Preset>>>> {
    let presets = state.assets.list_presets(&bed_id).await?;
    Ok(Json(ApiResponse::success(presets)))
}

/// POST /api/beds/:bed_id/boundary
/// Recompute the safe travel envelope from the bed's current presets and
/// persist it as the bed's boundary preset
pub async fn regenerate_boundary(
    State(state): State<AppState>,
    Path(bed_id): Path<String>,
) -> Result<Json<ApiResponse<BoundaryRegion>>> {
    let region = state.sessions.regenerate_boundary(&bed_id).await?;
    Ok(Json(ApiResponse::success(region)))
}
