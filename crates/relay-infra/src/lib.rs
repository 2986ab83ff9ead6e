//! Infrastructure layer for Relay.
//!
//! Contains implementations of the ports defined in `relay-core`: the
//! OpenAI-compatible service adapter, HTTP remote endpoints and agents,
//! remote chains, and the configuration file loader.

pub mod config;
pub mod llm;
pub mod remote;
