//! Lock negotiation types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One client's attempt to operate a camera.
/// The authoritative lock state lives in the middleware; this records only
/// who is asking and when control was last granted to them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlSession {
    /// Requesting user identity
    pub user: String,
    /// Camera asset identifier
    pub camera_id: String,
    /// Set when the middleware last granted control to this session
    pub acquired_at: Option<DateTime<Utc>>,
}

impl ControlSession {
    pub fn new(user: impl Into<String>, camera_id: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            camera_id: camera_id.into(),
            acquired_at: None,
        }
    }
}

/// Believed current holder of camera control. A cache, not the truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "holder")]
#[serde(rename_all = "snake_case")]
pub enum LockBelief {
    /// No holder recognized; the camera is free
    Unlocked,
    /// The middleware last reported this session as holder
    HeldBySelf,
    /// The middleware last reported another user as holder
    HeldByOther(String),
}

/// Outcome of an acquire/request-access negotiation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockResult {
    /// Device reports the caller as holder
    Granted,
    /// Another user holds the camera. A normal outcome, surfaced as an
    /// informational notice, not a failure.
    Denied { holder: String },
    /// Transport/timeout failure; the cached belief is left unchanged
    Unreachable,
}

/// Out-of-band message from the real-time notification channel.
/// At-most-once, best-effort, unordered relative to command responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum AccessEvent {
    /// Another client asked for control of the camera
    #[serde(rename = "CAMERA_ACCESS_REQUEST")]
    AccessRequested {
        camera_id: String,
        requested_by: String,
        message: String,
    },
    /// The camera became available; interested viewers should re-acquire
    #[serde(rename = "CAMERA_AVAILABILITY")]
    CameraAvailable { camera_id: String, message: String },
}

impl AccessEvent {
    pub fn camera_id(&self) -> &str {
        match self {
            AccessEvent::AccessRequested { camera_id, .. } => camera_id,
            AccessEvent::CameraAvailable { camera_id, .. } => camera_id,
        }
    }
}

/// What a session should do with a notification it just observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvailabilityAction {
    /// Show the access-requested prompt to this viewer (current holder only)
    ShowAccessPrompt { requested_by: String },
    /// Camera became free; this session should attempt acquire again.
    /// Requesting access never by itself transfers control.
    AttemptReacquire,
    /// Nothing to do for this session
    Ignore,
}
