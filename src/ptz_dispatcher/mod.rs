//! PtzDispatcher - Camera Middleware Command Protocol
//!
//! ## Responsibilities
//!
//! - Typed command vocabulary to the camera middleware (closed set)
//! - One command in, one classified outcome out
//! - Outcome taxonomy: success / conflict / unreachable / auth failure
//!
//! The dispatcher never retries; retry policy belongs to the callers.

pub mod types;
pub mod transport;
pub mod dispatcher;

pub use types::*;
pub use transport::{CommandTransport, HttpTransport, TransportResponse};
pub use dispatcher::PtzDispatcher;
