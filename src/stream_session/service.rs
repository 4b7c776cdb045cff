//! Per-viewer stream session orchestration

use super::types::{
    MoveRequest, PlayerEvent, StreamAlert, StreamSessionView, StreamStatus, MOVE_ALERT_CLEAR_SECS,
};
use crate::asset_store::AssetStore;
use crate::boundary::{compute_boundary, BoundaryRegion};
use crate::error::{Error, Result};
use crate::lock_arbiter::{AccessEvent, AvailabilityAction, LockArbiter, LockBelief, LockResult};
use crate::models::{CameraDevice, Preset, PresetKind, PtzPosition};
use crate::ptz_dispatcher::{
    CommandPayload, CommandTransport, DispatchOutcome, PtzCommand, PtzDispatcher, StatusPayload,
};
use crate::realtime_hub::{HubMessage, PlayerErrorMessage, RealtimeHub, StreamStateMessage};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use uuid::Uuid;

/// Mutable per-session state
struct SessionState {
    status: StreamStatus,
    alert: StreamAlert,
    token: Option<String>,
    playable_url: Option<String>,
    first_frame_at: Option<DateTime<Utc>>,
    boundary: Option<BoundaryRegion>,
}

/// One viewer's camera session
pub struct StreamSession<T: CommandTransport> {
    pub id: Uuid,
    pub viewer: String,
    pub bed_id: String,
    pub device: CameraDevice,
    arbiter: LockArbiter<T>,
    state: RwLock<SessionState>,
    /// Token request generation; a response whose generation no longer
    /// matches is stale and must not touch the session
    generation: AtomicU64,
    /// Moving soft-clear timer, aborted on supersede and teardown
    move_task: Mutex<Option<JoinHandle<()>>>,
}

impl<T: CommandTransport> StreamSession<T> {
    pub async fn view(&self) -> StreamSessionView {
        let state = self.state.read().await;
        StreamSessionView {
            session_id: self.id,
            viewer: self.viewer.clone(),
            bed_id: self.bed_id.clone(),
            camera_id: self.device.asset_id.clone(),
            status: state.status,
            alert: state.alert,
            lock: self.arbiter.belief().await,
            playable_url: state.playable_url.clone(),
            first_frame_at: state.first_frame_at,
        }
    }

    async fn abort_move_task(&self) {
        if let Some(task) = self.move_task.lock().await.take() {
            task.abort();
        }
    }
}

/// Owns every active viewer session
pub struct StreamSessionService<T: CommandTransport> {
    dispatcher: PtzDispatcher<T>,
    assets: Arc<AssetStore>,
    realtime: Arc<RealtimeHub>,
    sessions: RwLock<HashMap<Uuid, Arc<StreamSession<T>>>>,
}

impl<T: CommandTransport> StreamSessionService<T> {
    pub fn new(
        dispatcher: PtzDispatcher<T>,
        assets: Arc<AssetStore>,
        realtime: Arc<RealtimeHub>,
    ) -> Self {
        Self {
            dispatcher,
            assets,
            realtime,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Open a session for a bed: resolve the camera through the asset
    /// service, then hand off to [`open`].
    pub async fn open_bed(&self, viewer: &str, bed_id: &str) -> Result<StreamSessionView> {
        let device = self.assets.get_camera(bed_id).await?;

        let boundary = match self.assets.list_presets(bed_id).await {
            Ok(presets) => presets.iter().find_map(|p| {
                (p.kind == PresetKind::Boundary).then_some(p.boundary).flatten()
            }),
            Err(e) => {
                tracing::warn!(bed_id = %bed_id, error = %e, "Preset lookup failed, no boundary");
                None
            }
        };

        self.open(viewer, bed_id, device, boundary).await
    }

    /// Open a session for a known camera: acquire the lock (denial is
    /// informational), then request a stream token.
    pub async fn open(
        &self,
        viewer: &str,
        bed_id: &str,
        device: CameraDevice,
        boundary: Option<BoundaryRegion>,
    ) -> Result<StreamSessionView> {
        device.validate()?;

        let session = Arc::new(StreamSession {
            id: Uuid::new_v4(),
            viewer: viewer.to_string(),
            bed_id: bed_id.to_string(),
            arbiter: LockArbiter::new(self.dispatcher.clone(), device.clone(), viewer),
            device,
            state: RwLock::new(SessionState {
                status: StreamStatus::Stop,
                alert: StreamAlert::None,
                token: None,
                playable_url: None,
                first_frame_at: None,
                boundary,
            }),
            generation: AtomicU64::new(0),
            move_task: Mutex::new(None),
        });

        if session.device.feed_disabled {
            session.state.write().await.alert = StreamAlert::Offline;
            tracing::info!(
                session_id = %session.id,
                camera_id = %session.device.asset_id,
                "Feed administratively disabled"
            );
            self.sessions
                .write()
                .await
                .insert(session.id, Arc::clone(&session));
            return Ok(session.view().await);
        }

        // A granted lock must not outlive a failed open: the session is
        // only registered once the fallible sequence succeeds, and an
        // error path releases whatever the negotiation acquired
        if let Err(e) = self.negotiate_and_stream(&session).await {
            tracing::warn!(
                session_id = %session.id,
                camera_id = %session.device.asset_id,
                error = %e,
                "Session open failed, releasing lock"
            );
            session.arbiter.release().await;
            return Err(e);
        }

        self.sessions
            .write()
            .await
            .insert(session.id, Arc::clone(&session));

        Ok(session.view().await)
    }

    async fn negotiate_and_stream(&self, session: &Arc<StreamSession<T>>) -> Result<()> {
        match session.arbiter.acquire().await? {
            LockResult::Granted => {}
            LockResult::Denied { holder } => {
                // Informational, not a failure; viewing continues read-only
                tracing::info!(
                    session_id = %session.id,
                    camera_id = %session.device.asset_id,
                    holder = %holder,
                    "Camera control held by another viewer"
                );
            }
            LockResult::Unreachable => {
                session.state.write().await.alert = StreamAlert::HostUnreachable;
                return Ok(());
            }
        }

        let generation = session.generation.load(Ordering::SeqCst);
        self.start_stream(session, generation).await
    }

    /// Request a fresh stream token and apply it, unless the session has
    /// moved on to a newer generation in the meantime (stale response).
    pub(crate) async fn start_stream(
        &self,
        session: &Arc<StreamSession<T>>,
        generation: u64,
    ) -> Result<()> {
        let outcome = self
            .dispatcher
            .dispatch(&session.device, &PtzCommand::GetStreamToken)
            .await?;

        if session.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(
                session_id = %session.id,
                stale_generation = generation,
                "Ignoring stale stream token response"
            );
            return Ok(());
        }

        let mut state = session.state.write().await;
        // Re-check under the write guard: a reset may have bumped the
        // generation while this task was waiting for the lock
        if session.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(
                session_id = %session.id,
                stale_generation = generation,
                "Ignoring stale stream token response"
            );
            return Ok(());
        }
        match outcome {
            DispatchOutcome::Success(CommandPayload::StreamToken(token)) => {
                state.playable_url = Some(format!(
                    "https://{}/stream/{}?token={}",
                    session.device.middleware_host, session.device.asset_id, token
                ));
                state.token = Some(token);
                state.status = StreamStatus::Loading;
                state.alert = StreamAlert::None;
                tracing::info!(
                    session_id = %session.id,
                    camera_id = %session.device.asset_id,
                    "Stream token issued, handing URL to player"
                );
            }
            DispatchOutcome::AuthFailed => {
                state.alert = StreamAlert::AuthenticationError;
            }
            DispatchOutcome::Unreachable => {
                state.alert = StreamAlert::HostUnreachable;
            }
            other => {
                tracing::warn!(
                    session_id = %session.id,
                    outcome = ?other,
                    "Unexpected stream token outcome"
                );
                state.alert = StreamAlert::HostUnreachable;
            }
        }
        drop(state);

        self.publish_state(session).await;
        Ok(())
    }

    /// Full restart of the token sequence. The only retry path, always
    /// user- or event-triggered, never a timer loop.
    pub async fn reset(&self, session_id: Uuid) -> Result<StreamSessionView> {
        let session = self.get(session_id).await?;

        let generation = session.generation.fetch_add(1, Ordering::SeqCst) + 1;
        session.state.write().await.alert = StreamAlert::Loading;

        self.start_stream(&session, generation).await?;
        Ok(session.view().await)
    }

    /// Explicit acquire, used when the viewer retries after a denial or an
    /// unreachable outcome. Never called in a loop.
    pub async fn acquire_lock(&self, session_id: Uuid) -> Result<LockResult> {
        let session = self.get(session_id).await?;
        let result = session.arbiter.acquire().await?;
        self.publish_state(&session).await;
        Ok(result)
    }

    /// Explicit release without closing the session (viewer hands off
    /// control but keeps watching)
    pub async fn release_lock(&self, session_id: Uuid) -> Result<()> {
        let session = self.get(session_id).await?;
        session.arbiter.release().await;
        self.publish_state(&session).await;
        Ok(())
    }

    /// Cooperative takeover request
    pub async fn request_access(&self, session_id: Uuid) -> Result<LockResult> {
        let session = self.get(session_id).await?;
        let result = session.arbiter.request_access().await?;
        self.publish_state(&session).await;
        Ok(result)
    }

    /// Player-reported lifecycle event
    pub async fn player_event(&self, session_id: Uuid, event: PlayerEvent) -> Result<StreamSessionView> {
        let session = self.get(session_id).await?;

        match event {
            PlayerEvent::Play => {
                let mut state = session.state.write().await;
                state.status = StreamStatus::Playing;
                state.alert = StreamAlert::None;
                state.first_frame_at = Some(Utc::now());
                drop(state);
                self.publish_state(&session).await;
            }
            PlayerEvent::Ended => {
                session.state.write().await.status = StreamStatus::Stop;
                self.publish_state(&session).await;
            }
            PlayerEvent::Error { message } => {
                // Propagate only; status stays, alert is the caller's call
                tracing::warn!(
                    session_id = %session.id,
                    camera_id = %session.device.asset_id,
                    error = %message,
                    "Player reported error"
                );
                self.realtime
                    .send_to_user(
                        &session.viewer,
                        HubMessage::PlayerError(PlayerErrorMessage {
                            session_id: session.id,
                            camera_id: session.device.asset_id.clone(),
                            error: message,
                        }),
                    )
                    .await;
            }
        }

        Ok(session.view().await)
    }

    /// Issue a move. Requires this session's lock belief to be
    /// held-by-self; the middleware still enforces real exclusivity.
    pub async fn move_camera(
        &self,
        session_id: Uuid,
        request: MoveRequest,
    ) -> Result<StreamSessionView> {
        let session = self.get(session_id).await?;

        match session.arbiter.belief().await {
            LockBelief::HeldBySelf => {}
            LockBelief::HeldByOther(holder) => {
                return Err(Error::Forbidden(format!(
                    "Camera control held by {}",
                    holder
                )));
            }
            LockBelief::Unlocked => {
                return Err(Error::Forbidden(
                    "Camera control not acquired".to_string(),
                ));
            }
        }

        let command = match request {
            MoveRequest::Absolute(target) => {
                let state = session.state.read().await;
                let target = match state.boundary {
                    Some(region) => {
                        let (x, y) = region.clamp(target.x, target.y);
                        PtzPosition { x, y, zoom: target.zoom }
                    }
                    None => target,
                };
                PtzCommand::AbsoluteMove(target)
            }
            MoveRequest::Relative(delta) => PtzCommand::RelativeMove(delta),
        };

        session.state.write().await.alert = StreamAlert::Moving;
        self.spawn_move_clear(&session).await;

        let outcome = self.dispatcher.dispatch(&session.device, &command).await?;
        match outcome {
            DispatchOutcome::Success(_) => {
                tracing::debug!(
                    session_id = %session.id,
                    command = ?command,
                    "Move accepted"
                );
            }
            DispatchOutcome::Unreachable => {
                session.abort_move_task().await;
                session.state.write().await.alert = StreamAlert::HostUnreachable;
                self.publish_state(&session).await;
            }
            other => {
                tracing::warn!(
                    session_id = %session.id,
                    outcome = ?other,
                    "Unexpected move outcome"
                );
            }
        }

        Ok(session.view().await)
    }

    /// Poll device status. A device failure here surfaces the
    /// host-unreachable alert and triggers an automatic reset.
    pub async fn check_status(&self, session_id: Uuid) -> Result<Option<StatusPayload>> {
        let session = self.get(session_id).await?;

        let outcome = self
            .dispatcher
            .dispatch(&session.device, &PtzCommand::GetStatus)
            .await?;

        match outcome {
            DispatchOutcome::Success(CommandPayload::Status(payload)) => Ok(Some(payload)),
            DispatchOutcome::Unreachable => {
                session.state.write().await.alert = StreamAlert::HostUnreachable;
                self.publish_state(&session).await;
                self.reset(session_id).await?;
                Ok(None)
            }
            other => {
                tracing::warn!(
                    session_id = %session.id,
                    outcome = ?other,
                    "Unexpected status outcome"
                );
                Ok(None)
            }
        }
    }

    /// Save the camera's current position as a named preset for the bed
    pub async fn save_preset(&self, session_id: Uuid, name: &str) -> Result<Preset> {
        let session = self.get(session_id).await?;

        let status = self
            .check_status(session_id)
            .await?
            .ok_or_else(|| Error::Network("Camera unreachable, position unknown".to_string()))?;

        let preset = Preset {
            name: name.to_string(),
            kind: PresetKind::Normal,
            bed_id: session.bed_id.clone(),
            position: Some(status.position),
            boundary: None,
        };
        self.assets.save_preset(&preset).await?;
        Ok(preset)
    }

    /// Recompute the safe travel envelope for a bed from its current
    /// presets, persist it, and apply it to every open session on the bed
    pub async fn regenerate_boundary(&self, bed_id: &str) -> Result<BoundaryRegion> {
        let presets = self.assets.list_presets(bed_id).await?;
        let region = compute_boundary(&presets);
        self.assets.save_boundary(bed_id, &region).await?;

        for session in self.sessions.read().await.values() {
            if session.bed_id == bed_id {
                session.state.write().await.boundary = Some(region);
            }
        }

        tracing::info!(bed_id = %bed_id, ?region, "Boundary regenerated");
        Ok(region)
    }

    /// Route an out-of-band notification to every session it concerns.
    /// On availability, every interested viewer re-acquires; exactly one
    /// wins and the rest see a normal denial.
    pub async fn handle_access_event(&self, event: &AccessEvent) {
        let sessions: Vec<_> = self.sessions.read().await.values().cloned().collect();

        for session in sessions {
            match session.arbiter.on_availability_event(event).await {
                AvailabilityAction::ShowAccessPrompt { requested_by } => {
                    self.realtime
                        .send_to_user(
                            &session.viewer,
                            HubMessage::AccessRequested(crate::realtime_hub::AccessRequestedMessage {
                                camera_id: session.device.asset_id.clone(),
                                requested_by,
                                message: "Camera access requested".to_string(),
                            }),
                        )
                        .await;
                }
                AvailabilityAction::AttemptReacquire => {
                    match session.arbiter.acquire().await {
                        Ok(LockResult::Granted) => {
                            tracing::info!(
                                session_id = %session.id,
                                camera_id = %session.device.asset_id,
                                "Re-acquired camera after availability notice"
                            );
                            self.publish_state(&session).await;
                        }
                        Ok(LockResult::Denied { holder }) => {
                            // Lost the race; expected for all but one viewer
                            tracing::info!(
                                session_id = %session.id,
                                holder = %holder,
                                "Another viewer won the re-acquire race"
                            );
                        }
                        Ok(LockResult::Unreachable) => {
                            tracing::warn!(
                                session_id = %session.id,
                                "Re-acquire attempt found device unreachable"
                            );
                        }
                        Err(e) => {
                            tracing::warn!(
                                session_id = %session.id,
                                error = %e,
                                "Re-acquire attempt failed"
                            );
                        }
                    }
                }
                AvailabilityAction::Ignore => {}
            }
        }
    }

    /// Tear down a session. Release runs unconditionally, independent of
    /// any other outstanding command.
    pub async fn close(&self, session_id: Uuid) -> Result<()> {
        let session = self
            .sessions
            .write()
            .await
            .remove(&session_id)
            .ok_or_else(|| Error::NotFound(format!("Session {} not found", session_id)))?;

        session.abort_move_task().await;
        session.arbiter.release().await;

        tracing::info!(
            session_id = %session.id,
            camera_id = %session.device.asset_id,
            "Session closed"
        );
        Ok(())
    }

    pub async fn view(&self, session_id: Uuid) -> Result<StreamSessionView> {
        Ok(self.get(session_id).await?.view().await)
    }

    async fn get(&self, session_id: Uuid) -> Result<Arc<StreamSession<T>>> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Session {} not found", session_id)))
    }

    /// Arm the moving soft-clear timer, superseding any previous one.
    /// If the alert is still `Moving` after the delay the move is assumed
    /// complete and the alert clears without device confirmation.
    async fn spawn_move_clear(&self, session: &Arc<StreamSession<T>>) {
        let mut guard = session.move_task.lock().await;
        if let Some(previous) = guard.take() {
            previous.abort();
        }

        let session_clone = Arc::clone(session);
        let realtime = Arc::clone(&self.realtime);
        *guard = Some(tokio::spawn(async move {
            sleep(Duration::from_secs(MOVE_ALERT_CLEAR_SECS)).await;

            let mut state = session_clone.state.write().await;
            if state.alert == StreamAlert::Moving {
                state.alert = StreamAlert::None;
                let message = HubMessage::StreamState(StreamStateMessage {
                    session_id: session_clone.id,
                    camera_id: session_clone.device.asset_id.clone(),
                    status: state.status.as_str().to_string(),
                    alert: state.alert.as_str().to_string(),
                });
                drop(state);
                realtime.send_to_user(&session_clone.viewer, message).await;
            }
        }));
    }

    async fn publish_state(&self, session: &Arc<StreamSession<T>>) {
        let state = session.state.read().await;
        let message = HubMessage::StreamState(StreamStateMessage {
            session_id: session.id,
            camera_id: session.device.asset_id.clone(),
            status: state.status.as_str().to_string(),
            alert: state.alert.as_str().to_string(),
        });
        drop(state);

        self.realtime.send_to_user(&session.viewer, message).await;
    }
}
