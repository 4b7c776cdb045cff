//! PTZ command vocabulary and outcome taxonomy

use crate::models::{PtzDelta, PtzPosition};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

/// Closed set of commands understood by the camera middleware.
/// Each instance is dispatched exactly once and yields exactly one outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum PtzCommand {
    LockCamera,
    UnlockCamera,
    RequestAccess,
    AbsoluteMove(PtzPosition),
    RelativeMove(PtzDelta),
    GetStatus,
    GetPresets,
    GetStreamToken,
}

impl PtzCommand {
    /// Middleware endpoint suffix for this command
    pub fn endpoint(&self) -> &'static str {
        match self {
            PtzCommand::LockCamera => "lock",
            PtzCommand::UnlockCamera => "unlock",
            PtzCommand::RequestAccess => "request-access",
            PtzCommand::AbsoluteMove(_) => "move/absolute",
            PtzCommand::RelativeMove(_) => "move/relative",
            PtzCommand::GetStatus => "status",
            PtzCommand::GetPresets => "presets",
            PtzCommand::GetStreamToken => "stream-token",
        }
    }

    /// Whether this command mutates middleware state (POST vs GET)
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            PtzCommand::GetStatus | PtzCommand::GetPresets | PtzCommand::GetStreamToken
        )
    }

    /// Request parameters, if any
    pub fn params(&self) -> Option<Value> {
        match self {
            PtzCommand::AbsoluteMove(pos) => Some(json!({
                "x": pos.x,
                "y": pos.y,
                "zoom": pos.zoom,
            })),
            PtzCommand::RelativeMove(delta) => Some(json!({
                "dx": delta.x,
                "dy": delta.y,
                "dzoom": delta.zoom,
            })),
            _ => None,
        }
    }

    /// Whether a 409 response is a meaningful contention outcome
    /// for this command (lock/access negotiation only)
    pub fn conflict_expected(&self) -> bool {
        matches!(self, PtzCommand::LockCamera | PtzCommand::RequestAccess)
    }
}

/// Lock/access response payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockPayload {
    pub message: String,
    /// User currently recognized as camera holder by the middleware
    pub camera_user: String,
}

/// Camera status payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusPayload {
    pub position: PtzPosition,
    #[serde(default)]
    pub moving: bool,
}

/// Command-specific success payload
#[derive(Debug, Clone, PartialEq)]
pub enum CommandPayload {
    /// lock_camera / request_access
    Lock(LockPayload),
    /// get_presets: preset name -> middleware numeric identifier
    Presets(HashMap<String, u32>),
    /// get_stream_token: short-lived playback token
    StreamToken(String),
    /// get_status
    Status(StatusPayload),
    /// unlock_camera and moves carry no payload of interest
    Empty,
}

/// Uniform outcome classification every caller must apply
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// 2xx
    Success(CommandPayload),
    /// 409 on a lock/access command. Normal contention, not an error.
    Conflict { holder: String, message: String },
    /// 500 or transport-level failure. Never silently dropped by callers.
    Unreachable,
    /// Non-2xx on stream token retrieval; remediation differs from
    /// unreachable (credentials/config vs network/device)
    AuthFailed,
}
