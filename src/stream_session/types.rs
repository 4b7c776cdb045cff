//! Stream session types

use crate::lock_arbiter::LockBelief;
use crate::models::{PtzDelta, PtzPosition};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Seconds after which a still-pending "moving" alert is assumed complete
/// and cleared, even without explicit confirmation from the device
pub const MOVE_ALERT_CLEAR_SECS: u64 = 4;

/// Visible stream lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamStatus {
    Stop,
    Loading,
    Playing,
}

/// Orthogonal alert sub-state, attachable at any time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamAlert {
    None,
    /// Reset-in-progress sentinel
    Loading,
    /// A move command is in flight
    Moving,
    HostUnreachable,
    AuthenticationError,
    /// Feed administratively disabled
    Offline,
    PlayingConfirmation,
}

impl StreamAlert {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamAlert::None => "none",
            StreamAlert::Loading => "loading",
            StreamAlert::Moving => "moving",
            StreamAlert::HostUnreachable => "host_unreachable",
            StreamAlert::AuthenticationError => "authentication_error",
            StreamAlert::Offline => "offline",
            StreamAlert::PlayingConfirmation => "playing_confirmation",
        }
    }
}

impl StreamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamStatus::Stop => "stop",
            StreamStatus::Loading => "loading",
            StreamStatus::Playing => "playing",
        }
    }
}

/// Lifecycle event reported by the external video player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlayerEvent {
    /// First frame rendered
    Play,
    /// Playback ended
    Ended,
    /// Player-level error; propagated, session state untouched
    Error { message: String },
}

/// Move request from a viewer client
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "target", rename_all = "snake_case")]
pub enum MoveRequest {
    Absolute(PtzPosition),
    Relative(PtzDelta),
}

/// Serializable snapshot of one session for API responses
#[derive(Debug, Clone, Serialize)]
pub struct StreamSessionView {
    pub session_id: Uuid,
    pub viewer: String,
    pub bed_id: String,
    pub camera_id: String,
    pub status: StreamStatus,
    pub alert: StreamAlert,
    pub lock: LockBelief,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playable_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_frame_at: Option<DateTime<Utc>>,
}
