//! Runtime orchestration for Relay.
//!
//! This crate defines the ports (service adapters, remote endpoints, chain
//! sources, observers) that the infrastructure layer implements, plus the
//! runtime that ties them together: action merging, the per-request event
//! stream and the streaming normalization state machine. It depends only on
//! `relay-types` -- never on `relay-infra` or any HTTP crate.

pub mod action;
pub mod adapter;
pub mod chain;
pub mod event;
pub mod observer;
pub mod remote;
pub mod runtime;
