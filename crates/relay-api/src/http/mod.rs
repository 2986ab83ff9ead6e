//! HTTP streaming transport.
//!
//! One `POST /api/v1/runtime` endpoint feeds the runtime and streams its
//! events back as server-sent events.

pub mod error;
pub mod handlers;
pub mod router;
