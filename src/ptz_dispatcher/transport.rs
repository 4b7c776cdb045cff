//! Middleware transport abstraction
//!
//! The production transport speaks HTTP to the facility middleware with a
//! WS-Security style UsernameToken digest, the scheme the ward camera
//! gateways expect. Tests substitute scripted in-memory transports.

use super::types::PtzCommand;
use crate::error::{Error, Result};
use crate::models::CameraDevice;
use base64::Engine;
use sha1::{Digest, Sha1};
use std::future::Future;
use std::time::Duration;

/// Raw middleware response before outcome classification
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: serde_json::Value,
}

/// HTTP-like request/response transport to the camera middleware.
///
/// `send` resolves with a `TransportResponse` for any HTTP-level reply
/// (including 4xx/5xx) and fails with [`Error::Network`] only when the
/// middleware could not be reached at all.
pub trait CommandTransport: Send + Sync + 'static {
    fn send(
        &self,
        device: &CameraDevice,
        command: &PtzCommand,
    ) -> impl Future<Output = Result<TransportResponse>> + Send;
}

/// Production transport over reqwest
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self { client }
    }

    fn command_url(&self, device: &CameraDevice, command: &PtzCommand) -> String {
        format!(
            "https://{}/api/cameras/{}/{}",
            device.middleware_host,
            device.asset_id,
            command.endpoint()
        )
    }

    /// UsernameToken digest fields: Base64(SHA1(nonce + created + password))
    fn auth_digest(device: &CameraDevice) -> (String, String, String) {
        let nonce: [u8; 16] = rand::random();
        let nonce_base64 = base64::engine::general_purpose::STANDARD.encode(nonce);

        let created = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();

        let mut hasher = Sha1::new();
        hasher.update(nonce);
        hasher.update(created.as_bytes());
        hasher.update(device.password.as_bytes());
        let digest = hasher.finalize();
        let digest_base64 = base64::engine::general_purpose::STANDARD.encode(digest);

        (nonce_base64, created, digest_base64)
    }
}

impl CommandTransport for HttpTransport {
    async fn send(
        &self,
        device: &CameraDevice,
        command: &PtzCommand,
    ) -> Result<TransportResponse> {
        let url = self.command_url(device, command);
        let (nonce, created, digest) = Self::auth_digest(device);

        tracing::debug!(
            camera_id = %device.asset_id,
            url = %url,
            command = ?command,
            "Sending middleware command"
        );

        let mut request = if command.is_mutation() {
            self.client.post(&url)
        } else {
            self.client.get(&url)
        };

        request = request
            .header("X-Access-Key", &device.access_key)
            .header("X-Auth-Username", &device.username)
            .header("X-Auth-Nonce", nonce)
            .header("X-Auth-Created", created)
            .header("X-Auth-Digest", digest);

        if let Some(params) = command.params() {
            request = request.json(&params);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Network(format!("Middleware request failed: {}", e)))?;

        let status = response.status().as_u16();
        let body = response
            .json::<serde_json::Value>()
            .await
            .unwrap_or(serde_json::Value::Null);

        Ok(TransportResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CameraDevice;

    fn device() -> CameraDevice {
        CameraDevice {
            asset_id: "cam-7".to_string(),
            hostname: "cam7.ward2.local".to_string(),
            username: "viewer".to_string(),
            password: "secret".to_string(),
            access_key: "ak-123".to_string(),
            middleware_host: "mw.facility.example".to_string(),
            feed_disabled: false,
        }
    }

    #[test]
    fn test_command_url() {
        let transport = HttpTransport::new(Duration::from_secs(10));
        assert_eq!(
            transport.command_url(&device(), &PtzCommand::LockCamera),
            "https://mw.facility.example/api/cameras/cam-7/lock"
        );
        assert_eq!(
            transport.command_url(&device(), &PtzCommand::GetStreamToken),
            "https://mw.facility.example/api/cameras/cam-7/stream-token"
        );
    }

    #[test]
    fn test_auth_digest_fields() {
        let (nonce, created, digest) = HttpTransport::auth_digest(&device());
        assert!(!nonce.is_empty());
        assert!(!digest.is_empty());
        assert!(created.ends_with('Z'));
        // Digest must depend on the nonce
        let (_, _, digest2) = HttpTransport::auth_digest(&device());
        assert_ne!(digest, digest2);
    }
}
