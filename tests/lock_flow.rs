//! End-to-end lock contention flow
//!
//! Two viewers contend for one bedside camera: A holds the lock, B asks
//! for access, A leaves, the availability notice lets B take over.

use is23_bedcam::asset_store::AssetStore;
use is23_bedcam::error::Result;
use is23_bedcam::lock_arbiter::{AccessEvent, LockBelief, LockResult};
use is23_bedcam::models::CameraDevice;
use is23_bedcam::ptz_dispatcher::{
    CommandTransport, PtzCommand, PtzDispatcher, TransportResponse,
};
use is23_bedcam::realtime_hub::RealtimeHub;
use is23_bedcam::stream_session::StreamSessionService;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Replays middleware responses in call order
struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<TransportResponse>>>,
}

impl ScriptedTransport {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(VecDeque::new()),
        })
    }

    fn push(&self, status: u16, body: serde_json::Value) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(TransportResponse { status, body }));
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
        asset_id: "cam-12".to_string(),
        hostname: "cam12.ward4.local".to_string(),
        username: "ward4".to_string(),
        password: "pw".to_string(),
        access_key: "ak".to_string(),
        middleware_host: "mw.facility.example".to_string(),
        feed_disabled: false,
    }
}

#[tokio::test]
async fn test_two_viewer_contention_and_takeover() {
    let transport = ScriptedTransport::new();
    let realtime = Arc::new(RealtimeHub::new());
    let service = StreamSessionService::new(
        PtzDispatcher::new(Arc::clone(&transport)),
        Arc::new(AssetStore::new(
            "http://assets.example".to_string(),
            Duration::from_secs(5),
        )),
        Arc::clone(&realtime),
    );

    let (_, mut rx_a) = realtime.register("viewer-a".to_string()).await;
    let (_, mut rx_b) = realtime.register("viewer-b".to_string()).await;

    // Viewer A opens: lock granted, stream token issued
    transport.push(200, json!({"message": "locked", "camera_user": "viewer-a"}));
    transport.push(200, json!({"token": "tok-a"}));
    let view_a = service
        .open("viewer-a", "bed-4", device(), None)
        .await
        .unwrap();
    assert_eq!(view_a.lock, LockBelief::HeldBySelf);

    // Viewer B opens: denied with holder A, still gets a watch-only stream
    transport.push(409, json!({"message": "camera in use", "camera_user": "viewer-a"}));
    transport.push(200, json!({"token": "tok-b"}));
    let view_b = service
        .open("viewer-b", "bed-4", device(), None)
        .await
        .unwrap();
    assert_eq!(view_b.lock, LockBelief::HeldByOther("viewer-a".to_string()));

    // B requests access; the middleware keeps A as holder for now
    transport.push(409, json!({"message": "holder notified", "camera_user": "viewer-a"}));
    let result = service.request_access(view_b.session_id).await.unwrap();
    assert_eq!(
        result,
        LockResult::Denied {
            holder: "viewer-a".to_string()
        }
    );

    // The middleware tells us about B's request; only A sees the prompt
    service
        .handle_access_event(&AccessEvent::AccessRequested {
            camera_id: "cam-12".to_string(),
            requested_by: "viewer-b".to_string(),
            message: "access wanted".to_string(),
        })
        .await;

    let mut a_prompted = false;
    while let Ok(msg) = rx_a.try_recv() {
        if msg.contains("access_requested") {
            a_prompted = true;
        }
    }
    assert!(a_prompted, "holder A should receive the access prompt");

    let mut b_prompted = false;
    while let Ok(msg) = rx_b.try_recv() {
        if msg.contains("access_requested") {
            b_prompted = true;
        }
    }
    assert!(!b_prompted, "requester B must not receive the prompt");

    // A disconnects; teardown releases the lock unconditionally
    transport.push(200, json!({"message": "unlocked"}));
    service.close(view_a.session_id).await.unwrap();

    // Availability notice reaches B, who re-acquires and wins
    transport.push(200, json!({"message": "locked", "camera_user": "viewer-b"}));
    service
        .handle_access_event(&AccessEvent::CameraAvailable {
            camera_id: "cam-12".to_string(),
            message: "camera free".to_string(),
        })
        .await;

    let view_b = service.view(view_b.session_id).await.unwrap();
    assert_eq!(view_b.lock, LockBelief::HeldBySelf);
}
