//! Lock negotiation service

use super::types::{AccessEvent, AvailabilityAction, ControlSession, LockBelief, LockResult};
use crate::error::Result;
use crate::models::CameraDevice;
use crate::ptz_dispatcher::{
    CommandPayload, CommandTransport, DispatchOutcome, PtzCommand, PtzDispatcher,
};
use tokio::sync::RwLock;

/// Negotiates and tracks exclusive control of one camera for the lifetime
/// of a viewing session.
pub struct LockArbiter<T: CommandTransport> {
    dispatcher: PtzDispatcher<T>,
    device: CameraDevice,
    session: RwLock<ControlSession>,
    belief: RwLock<LockBelief>,
}

impl<T: CommandTransport> LockArbiter<T> {
    pub fn new(dispatcher: PtzDispatcher<T>, device: CameraDevice, user: impl Into<String>) -> Self {
        let session = ControlSession::new(user, device.asset_id.clone());
        Self {
            dispatcher,
            device,
            session: RwLock::new(session),
            belief: RwLock::new(LockBelief::Unlocked),
        }
    }

    /// Current cached belief about the holder
    pub async fn belief(&self) -> LockBelief {
        self.belief.read().await.clone()
    }

    /// Snapshot of the control session
    pub async fn session(&self) -> ControlSession {
        self.session.read().await.clone()
    }

    /// Attempt to take exclusive control.
    ///
    /// Denial carries the actual holder and is a normal outcome. On
    /// unreachable the belief keeps its last known value.
    pub async fn acquire(&self) -> Result<LockResult> {
        let outcome = self
            .dispatcher
            .dispatch(&self.device, &PtzCommand::LockCamera)
            .await?;
        Ok(self.apply_lock_outcome(outcome).await)
    }

    /// Release control; best-effort, must run exactly once on teardown.
    ///
    /// Failures are swallowed since release happens while the viewer is
    /// leaving and nobody can act on an error. A stuck exclusive lock would
    /// block every other viewer until an external timeout, so this is
    /// never skipped and never retried.
    pub async fn release(&self) {
        match self
            .dispatcher
            .dispatch(&self.device, &PtzCommand::UnlockCamera)
            .await
        {
            Ok(DispatchOutcome::Success(_)) => {
                tracing::info!(
                    camera_id = %self.device.asset_id,
                    "Camera lock released"
                );
            }
            Ok(outcome) => {
                tracing::warn!(
                    camera_id = %self.device.asset_id,
                    outcome = ?outcome,
                    "Camera unlock not confirmed"
                );
            }
            Err(e) => {
                tracing::warn!(
                    camera_id = %self.device.asset_id,
                    error = %e,
                    "Camera unlock failed"
                );
            }
        }

        *self.belief.write().await = LockBelief::Unlocked;
        self.session.write().await.acquired_at = None;
    }

    /// Cooperative takeover: ask the middleware to notify the current
    /// holder that access is wanted. Either the device grants immediately
    /// (idle/absent holder, treated exactly like an acquire success), or a
    /// later availability notification tells us to call [`acquire`] again.
    pub async fn request_access(&self) -> Result<LockResult> {
        let outcome = self
            .dispatcher
            .dispatch(&self.device, &PtzCommand::RequestAccess)
            .await?;
        Ok(self.apply_lock_outcome(outcome).await)
    }

    /// Passive handler for the real-time notification channel.
    pub async fn on_availability_event(&self, event: &AccessEvent) -> AvailabilityAction {
        if event.camera_id() != self.device.asset_id {
            return AvailabilityAction::Ignore;
        }

        match event {
            AccessEvent::AccessRequested { requested_by, .. } => {
                // Only the current holder sees the prompt
                if *self.belief.read().await == LockBelief::HeldBySelf {
                    tracing::info!(
                        camera_id = %self.device.asset_id,
                        requested_by = %requested_by,
                        "Access requested by another viewer"
                    );
                    AvailabilityAction::ShowAccessPrompt {
                        requested_by: requested_by.clone(),
                    }
                } else {
                    AvailabilityAction::Ignore
                }
            }
            AccessEvent::CameraAvailable { .. } => {
                let mut belief = self.belief.write().await;
                match *belief {
                    LockBelief::HeldBySelf => AvailabilityAction::Ignore,
                    _ => {
                        *belief = LockBelief::Unlocked;
                        AvailabilityAction::AttemptReacquire
                    }
                }
            }
        }
    }

    /// Fold a lock/access dispatch outcome into the cached belief.
    /// Every real response overwrites whatever we believed before.
    async fn apply_lock_outcome(&self, outcome: DispatchOutcome) -> LockResult {
        match outcome {
            DispatchOutcome::Success(CommandPayload::Lock(payload)) => {
                *self.belief.write().await = LockBelief::HeldBySelf;
                self.session.write().await.acquired_at = Some(chrono::Utc::now());
                tracing::info!(
                    camera_id = %self.device.asset_id,
                    camera_user = %payload.camera_user,
                    "Camera control granted"
                );
                LockResult::Granted
            }
            DispatchOutcome::Success(other) => {
                tracing::warn!(
                    camera_id = %self.device.asset_id,
                    payload = ?other,
                    "Unexpected payload on lock command, keeping belief"
                );
                LockResult::Unreachable
            }
            DispatchOutcome::Conflict { holder, .. } => {
                *self.belief.write().await = LockBelief::HeldByOther(holder.clone());
                LockResult::Denied { holder }
            }
            DispatchOutcome::Unreachable | DispatchOutcome::AuthFailed => {
                // Belief keeps its last known value
                LockResult::Unreachable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::ptz_dispatcher::TransportResponse;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

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

    fn arbiter(responses: Vec<Result<TransportResponse>>) -> LockArbiter<ScriptedTransport> {
        let dispatcher = PtzDispatcher::new(ScriptedTransport::new(responses));
        LockArbiter::new(dispatcher, device(), "dr-sato")
    }

    fn granted(user: &str) -> Result<TransportResponse> {
        Ok(TransportResponse {
            status: 200,
            body: json!({"message": "locked", "camera_user": user}),
        })
    }

    fn conflict(holder: &str) -> Result<TransportResponse> {
        Ok(TransportResponse {
            status: 409,
            body: json!({"message": "camera in use", "camera_user": holder}),
        })
    }

    #[tokio::test]
    async fn test_acquire_granted() {
        let arbiter = arbiter(vec![granted("dr-sato")]);
        assert_eq!(arbiter.acquire().await.unwrap(), LockResult::Granted);
        assert_eq!(arbiter.belief().await, LockBelief::HeldBySelf);
        assert!(arbiter.session().await.acquired_at.is_some());
    }

    #[tokio::test]
    async fn test_acquire_denied_is_not_an_error() {
        let arbiter = arbiter(vec![conflict("nurse-tanaka")]);
        let result = arbiter.acquire().await.unwrap();
        assert_eq!(
            result,
            LockResult::Denied {
                holder: "nurse-tanaka".to_string()
            }
        );
        assert_eq!(
            arbiter.belief().await,
            LockBelief::HeldByOther("nurse-tanaka".to_string())
        );
    }

    #[tokio::test]
    async fn test_acquire_unreachable_keeps_belief() {
        let arbiter = arbiter(vec![
            conflict("nurse-tanaka"),
            Err(Error::Network("timeout".to_string())),
        ]);
        arbiter.acquire().await.unwrap();
        let result = arbiter.acquire().await.unwrap();
        assert_eq!(result, LockResult::Unreachable);
        // Last known value survives
        assert_eq!(
            arbiter.belief().await,
            LockBelief::HeldByOther("nurse-tanaka".to_string())
        );
    }

    #[tokio::test]
    async fn test_release_idempotent() {
        let arbiter = arbiter(vec![
            granted("dr-sato"),
            Ok(TransportResponse {
                status: 200,
                body: json!({}),
            }),
            Err(Error::Network("gone".to_string())),
        ]);
        arbiter.acquire().await.unwrap();

        arbiter.release().await;
        assert_eq!(arbiter.belief().await, LockBelief::Unlocked);

        // Second release with a failing transport still never surfaces
        arbiter.release().await;
        assert_eq!(arbiter.belief().await, LockBelief::Unlocked);
        assert!(arbiter.session().await.acquired_at.is_none());
    }

    #[tokio::test]
    async fn test_release_without_lock_never_fails() {
        let arbiter = arbiter(vec![Err(Error::Network("unreachable".to_string()))]);
        arbiter.release().await;
        assert_eq!(arbiter.belief().await, LockBelief::Unlocked);
    }

    #[tokio::test]
    async fn test_request_access_immediate_grant() {
        let arbiter = arbiter(vec![granted("dr-sato")]);
        assert_eq!(arbiter.request_access().await.unwrap(), LockResult::Granted);
        assert_eq!(arbiter.belief().await, LockBelief::HeldBySelf);
    }

    #[tokio::test]
    async fn test_access_prompt_only_for_holder() {
        let event = AccessEvent::AccessRequested {
            camera_id: "cam-1".to_string(),
            requested_by: "nurse-tanaka".to_string(),
            message: "access wanted".to_string(),
        };

        let holder = arbiter(vec![granted("dr-sato")]);
        holder.acquire().await.unwrap();
        assert_eq!(
            holder.on_availability_event(&event).await,
            AvailabilityAction::ShowAccessPrompt {
                requested_by: "nurse-tanaka".to_string()
            }
        );

        let bystander = arbiter(vec![]);
        assert_eq!(
            bystander.on_availability_event(&event).await,
            AvailabilityAction::Ignore
        );
    }

    #[tokio::test]
    async fn test_availability_triggers_reacquire() {
        let arbiter = arbiter(vec![conflict("nurse-tanaka")]);
        arbiter.acquire().await.unwrap();

        let event = AccessEvent::CameraAvailable {
            camera_id: "cam-1".to_string(),
            message: "camera free".to_string(),
        };
        assert_eq!(
            arbiter.on_availability_event(&event).await,
            AvailabilityAction::AttemptReacquire
        );
        assert_eq!(arbiter.belief().await, LockBelief::Unlocked);
    }

    #[tokio::test]
    async fn test_availability_for_other_camera_ignored() {
        let arbiter = arbiter(vec![]);
        let event = AccessEvent::CameraAvailable {
            camera_id: "cam-99".to_string(),
            message: "camera free".to_string(),
        };
        assert_eq!(
            arbiter.on_availability_event(&event).await,
            AvailabilityAction::Ignore
        );
    }
}
