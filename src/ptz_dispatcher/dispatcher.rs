//! Command dispatch and outcome classification

use super::transport::{CommandTransport, TransportResponse};
use super::types::{CommandPayload, DispatchOutcome, LockPayload, PtzCommand, StatusPayload};
use crate::error::{Error, Result};
use crate::models::CameraDevice;
use std::collections::HashMap;
use std::sync::Arc;

/// Sends exactly one typed command and classifies the result,
/// independent of what the command was for.
pub struct PtzDispatcher<T: CommandTransport> {
    transport: Arc<T>,
}

impl<T: CommandTransport> Clone for PtzDispatcher<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T: CommandTransport> PtzDispatcher<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// Dispatch one command to one camera.
    ///
    /// Transport failures become [`DispatchOutcome::Unreachable`]; the only
    /// `Err` paths are configuration and payload shape problems caught on
    /// our side. No retries happen here.
    pub async fn dispatch(
        &self,
        device: &CameraDevice,
        command: &PtzCommand,
    ) -> Result<DispatchOutcome> {
        device.validate()?;

        let response = match self.transport.send(device, command).await {
            Ok(response) => response,
            Err(Error::Network(msg)) => {
                tracing::warn!(
                    camera_id = %device.asset_id,
                    command = ?command,
                    error = %msg,
                    "Middleware unreachable"
                );
                return Ok(DispatchOutcome::Unreachable);
            }
            Err(e) => return Err(e),
        };

        Ok(Self::classify(device, command, response)?)
    }

    fn classify(
        device: &CameraDevice,
        command: &PtzCommand,
        response: TransportResponse,
    ) -> Result<DispatchOutcome> {
        match response.status {
            200..=299 => Ok(DispatchOutcome::Success(Self::parse_payload(
                command,
                response.body,
            )?)),
            409 if command.conflict_expected() => {
                let payload: LockPayload = serde_json::from_value(response.body)?;
                tracing::info!(
                    camera_id = %device.asset_id,
                    holder = %payload.camera_user,
                    "Camera held by another user"
                );
                Ok(DispatchOutcome::Conflict {
                    holder: payload.camera_user,
                    message: payload.message,
                })
            }
            500..=599 => {
                tracing::warn!(
                    camera_id = %device.asset_id,
                    command = ?command,
                    status = response.status,
                    "Middleware reported device failure"
                );
                Ok(DispatchOutcome::Unreachable)
            }
            status => {
                if matches!(command, PtzCommand::GetStreamToken) {
                    tracing::warn!(
                        camera_id = %device.asset_id,
                        status = status,
                        "Stream token request rejected"
                    );
                    Ok(DispatchOutcome::AuthFailed)
                } else {
                    tracing::warn!(
                        camera_id = %device.asset_id,
                        command = ?command,
                        status = status,
                        "Unexpected middleware status"
                    );
                    Ok(DispatchOutcome::Unreachable)
                }
            }
        }
    }

    fn parse_payload(command: &PtzCommand, body: serde_json::Value) -> Result<CommandPayload> {
        match command {
            PtzCommand::LockCamera | PtzCommand::RequestAccess => {
                let payload: LockPayload = serde_json::from_value(body)?;
                Ok(CommandPayload::Lock(payload))
            }
            PtzCommand::GetPresets => {
                let presets: HashMap<String, u32> =
                    serde_json::from_value(body.get("presets").cloned().unwrap_or(body))?;
                Ok(CommandPayload::Presets(presets))
            }
            PtzCommand::GetStreamToken => {
                let token = body
                    .get("token")
                    .and_then(|t| t.as_str())
                    .ok_or_else(|| Error::Internal("Stream token missing in response".into()))?;
                Ok(CommandPayload::StreamToken(token.to_string()))
            }
            PtzCommand::GetStatus => {
                let payload: StatusPayload = serde_json::from_value(body)?;
                Ok(CommandPayload::Status(payload))
            }
            PtzCommand::UnlockCamera
            | PtzCommand::AbsoluteMove(_)
            | PtzCommand::RelativeMove(_) => Ok(CommandPayload::Empty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a fixed queue of responses, one per dispatched command
    struct ScriptedTransport {
        responses: Mutex<VecDeque<Result<TransportResponse>>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Result<TransportResponse>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
            })
        }
    }

    impl CommandTransport for ScriptedTransport {
        async fn send(
            &self,
            _device: &CameraDevice,
            _command: &PtzCommand,
        ) -> Result<TransportResponse> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted response left")
        }
    }

    fn device() -> CameraDevice {
        CameraDevice {
            asset_id: "cam-1".to_string(),
            hostname: "cam1.ward1.local".to_string(),
            username: "dr-sato".to_string(),
            password: "pw".to_string(),
            access_key: "ak".to_string(),
            middleware_host: "mw.example".to_string(),
            feed_disabled: false,
        }
    }

    fn response(status: u16, body: serde_json::Value) -> Result<TransportResponse> {
        Ok(TransportResponse { status, body })
    }

    #[tokio::test]
    async fn test_lock_success() {
        let transport = ScriptedTransport::new(vec![response(
            200,
            json!({"message": "locked", "camera_user": "dr-sato"}),
        )]);
        let dispatcher = PtzDispatcher::new(transport);

        let outcome = dispatcher
            .dispatch(&device(), &PtzCommand::LockCamera)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            DispatchOutcome::Success(CommandPayload::Lock(LockPayload {
                message: "locked".to_string(),
                camera_user: "dr-sato".to_string(),
            }))
        );
    }

    #[tokio::test]
    async fn test_lock_conflict_carries_holder() {
        let transport = ScriptedTransport::new(vec![response(
            409,
            json!({"message": "camera in use", "camera_user": "nurse-tanaka"}),
        )]);
        let dispatcher = PtzDispatcher::new(transport);

        let outcome = dispatcher
            .dispatch(&device(), &PtzCommand::LockCamera)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            DispatchOutcome::Conflict {
                holder: "nurse-tanaka".to_string(),
                message: "camera in use".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_conflict_on_non_lock_command_is_unreachable() {
        let transport = ScriptedTransport::new(vec![response(409, json!({}))]);
        let dispatcher = PtzDispatcher::new(transport);

        let outcome = dispatcher
            .dispatch(&device(), &PtzCommand::GetStatus)
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::Unreachable);
    }

    #[tokio::test]
    async fn test_server_error_is_unreachable() {
        let transport = ScriptedTransport::new(vec![response(500, json!({}))]);
        let dispatcher = PtzDispatcher::new(transport);

        let outcome = dispatcher
            .dispatch(
                &device(),
                &PtzCommand::AbsoluteMove(crate::models::PtzPosition {
                    x: 0.1,
                    y: 0.2,
                    zoom: 0.5,
                }),
            )
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::Unreachable);
    }

    #[tokio::test]
    async fn test_transport_failure_is_unreachable() {
        let transport = ScriptedTransport::new(vec![Err(Error::Network(
            "connection refused".to_string(),
        ))]);
        let dispatcher = PtzDispatcher::new(transport);

        let outcome = dispatcher
            .dispatch(&device(), &PtzCommand::GetStatus)
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::Unreachable);
    }

    #[tokio::test]
    async fn test_stream_token_success() {
        let transport =
            ScriptedTransport::new(vec![response(200, json!({"token": "tok-abc123"}))]);
        let dispatcher = PtzDispatcher::new(transport);

        let outcome = dispatcher
            .dispatch(&device(), &PtzCommand::GetStreamToken)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            DispatchOutcome::Success(CommandPayload::StreamToken("tok-abc123".to_string()))
        );
    }

    #[tokio::test]
    async fn test_stream_token_rejection_is_auth_failure() {
        let transport = ScriptedTransport::new(vec![response(403, json!({}))]);
        let dispatcher = PtzDispatcher::new(transport);

        let outcome = dispatcher
            .dispatch(&device(), &PtzCommand::GetStreamToken)
            .await
            .unwrap();
        assert_eq!(outcome, DispatchOutcome::AuthFailed);
    }

    #[tokio::test]
    async fn test_presets_payload() {
        let transport = ScriptedTransport::new(vec![response(
            200,
            json!({"presets": {"head": 1, "feet": 2}}),
        )]);
        let dispatcher = PtzDispatcher::new(transport);

        let outcome = dispatcher
            .dispatch(&device(), &PtzCommand::GetPresets)
            .await
            .unwrap();
        match outcome {
            DispatchOutcome::Success(CommandPayload::Presets(map)) => {
                assert_eq!(map.get("head"), Some(&1));
                assert_eq!(map.get("feet"), Some(&2));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_device_rejected_before_dispatch() {
        let transport = ScriptedTransport::new(vec![]);
        let dispatcher = PtzDispatcher::new(transport);

        let mut bad = device();
        bad.middleware_host = "https://mw.example".to_string();
        let result = dispatcher.dispatch(&bad, &PtzCommand::GetStatus).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
