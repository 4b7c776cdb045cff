//! LockArbiter - Exclusive Camera Control Negotiation
//!
//! ## Responsibilities
//!
//! - Acquire/release exclusive control of one camera per viewing session
//! - Cooperative takeover via request-access
//! - Cached belief about the current holder, overwritten by every real
//!   middleware response (the middleware stays authoritative)
//!
//! Transport failures are retried only on explicit user action, never in a
//! loop, to avoid command storms against an unreachable device.

pub mod types;
pub mod service;

pub use types::*;
pub use service::LockArbiter;
