//! Shared domain types for Relay.
//!
//! This crate contains the core domain types used across the Relay runtime:
//! conversation messages, action descriptors, normalized stream events,
//! request metadata, configuration, and the error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod action;
pub mod config;
pub mod error;
pub mod event;
pub mod message;
pub mod request;
