//! Request handlers.

pub mod runtime;
