//! IS23 Bedcam Gateway
//!
//! Bedside camera control gateway: mediates between clinical-staff viewer
//! clients and the facility camera middleware.
//!
//! ## Architecture (7 Components)
//!
//! 1. BoundaryComputer - Safe PTZ travel envelope from saved presets
//! 2. PtzDispatcher - Typed command/response protocol to the middleware
//! 3. LockArbiter - Exclusive camera control negotiation
//! 4. StreamSessionService - Per-viewer stream lifecycle and retry/reset
//! 5. AssetStore - Bed/camera/preset data service adapter
//! 6. RealtimeHub - WebSocket distribution to viewer clients
//! 7. WebAPI - REST API endpoints
//!
//! ## Design Principles
//!
//! - The middleware is the single source of truth for lock ownership;
//!   every client-side belief is a cache overwritten by real responses
//! - A lock conflict is a normal outcome of contention, never an error
//! - No automatic retry loops against an unreachable device

pub mod asset_store;
pub mod boundary;
pub mod lock_arbiter;
pub mod ptz_dispatcher;
pub mod realtime_hub;
pub mod stream_session;
pub mod web_api;
pub mod models;
pub mod error;
pub mod state;

pub use error::{Error, Result};
pub use state::AppState;
