//! Observability setup for Relay: tracing subscriber initialisation and
//! GenAI span attribute names.

pub mod genai_attrs;
pub mod tracing_setup;
