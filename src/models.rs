//! Shared models and types for IS23
//!
//! This module contains types shared across multiple modules
//! to avoid circular dependencies.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub asset_api_connected: bool,
    pub active_sessions: usize,
    pub ws_connections: u64,
}

/// Identity of a physical camera, supplied by the asset service.
/// Immutable for the lifetime of a viewing session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraDevice {
    /// Stable asset identifier
    pub asset_id: String,
    /// Network address/hostname of the camera itself
    pub hostname: String,
    /// Credential triple
    pub username: String,
    pub password: String,
    pub access_key: String,
    /// Owning facility's middleware hostname
    pub middleware_host: String,
    /// Administrative feed disable flag
    #[serde(default)]
    pub feed_disabled: bool,
}

impl CameraDevice {
    /// Validate network addresses before any command is dispatched.
    ///
    /// An operator-supplied hostname with embedded scheme, whitespace or
    /// path separators would produce garbage middleware URLs.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("hostname", &self.hostname),
            ("middleware_host", &self.middleware_host),
        ] {
            if value.is_empty() {
                return Err(Error::Config(format!(
                    "Camera {}: {} is empty",
                    self.asset_id, field
                )));
            }
            if value.contains("://") || value.contains('/') || value.contains(char::is_whitespace) {
                return Err(Error::Config(format!(
                    "Camera {}: invalid {} '{}'",
                    self.asset_id, field, value
                )));
            }
        }
        Ok(())
    }
}

/// A PTZ position in camera-normalized units
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PtzPosition {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

/// A relative PTZ step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PtzDelta {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

/// Preset kind discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresetKind {
    /// Operator-saved travel target
    Normal,
    /// Stores a computed boundary region; at most one per bed
    Boundary,
}

/// A named PTZ position associated with a bed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub kind: PresetKind,
    pub bed_id: String,
    /// Saved position (normal presets)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<PtzPosition>,
    /// Computed safe-travel rectangle (boundary presets)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boundary: Option<crate::boundary::BoundaryRegion>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(hostname: &str, middleware: &str) -> CameraDevice {
        CameraDevice {
            asset_id: "cam-001".to_string(),
            hostname: hostname.to_string(),
            username: "viewer".to_string(),
            password: "secret".to_string(),
            access_key: "ak".to_string(),
            middleware_host: middleware.to_string(),
            feed_disabled: false,
        }
    }

    #[test]
    fn test_valid_device_passes() {
        assert!(device("cam01.ward3.local", "mw.facility.example").validate().is_ok());
    }

    #[test]
    fn test_embedded_scheme_rejected() {
        assert!(device("http://cam01", "mw.facility.example").validate().is_err());
    }

    #[test]
    fn test_empty_middleware_rejected() {
        assert!(device("cam01", "").validate().is_err());
    }

    #[test]
    fn test_whitespace_rejected() {
        assert!(device("cam 01", "mw").validate().is_err());
    }
}
