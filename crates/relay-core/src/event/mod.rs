//! Per-request event streaming.

pub mod output;
pub mod source;

pub use output::OutputCollector;
pub use source::{EventEmitter, EventStream, RuntimeEventSource};
