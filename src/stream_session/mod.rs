//! StreamSessionService - Viewer Stream Lifecycle
//!
//! ## Responsibilities
//!
//! - One session per viewer per camera: lock on open, release on close
//! - Stream token retrieval and playable URL handoff to the player
//! - Status machine (stop/loading/playing) with orthogonal alert sub-state
//! - Generation-guarded reset so stale token responses are ignored
//! - Moving soft-clear timer as a cancellable task tied to the session

pub mod types;
pub mod service;

pub use types::*;
pub use service::{StreamSession, StreamSessionService};
