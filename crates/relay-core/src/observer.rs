//! Observer port for non-fatal runtime conditions.
//!
//! Failures that must never abort a request (a chain that does not resolve,
//! an unreachable remote endpoint, a failing after-hook) are reported through
//! a [`RuntimeObserver`] instead of being returned. The default
//! [`TracingObserver`] logs them with `tracing::warn!`.

use std::sync::{Mutex, PoisonError};

use relay_types::error::ChainError;

/// A non-fatal condition raised while serving a request.
#[derive(Debug, Clone)]
pub enum RuntimeWarning {
    /// A chain action failed to resolve and was left out of the action list.
    ChainResolutionFailed { error: ChainError },

    /// A remote endpoint could not be queried; its actions are skipped.
    RemoteDiscoveryFailed { endpoint: String, message: String },

    /// The backend stream failed mid-response; the stream was closed early.
    BackendStreamFailed { message: String },

    /// A remote agent's continuation stream yielded an error item.
    ContinuationStreamFailed { agent_name: String, message: String },

    /// The after-request hook returned an error.
    AfterHookFailed { thread_id: String, message: String },

    /// The output messages were never delivered, so the after-hook was skipped.
    OutputMessagesDropped { thread_id: String },
}

/// Receives non-fatal runtime warnings.
pub trait RuntimeObserver: Send + Sync {
    fn warn(&self, warning: RuntimeWarning);
}

/// Logs every warning through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RuntimeObserver for TracingObserver {
    fn warn(&self, warning: RuntimeWarning) {
        match warning {
            RuntimeWarning::ChainResolutionFailed { error } => {
                tracing::warn!(error = %error, "chain action dropped");
            }
            RuntimeWarning::RemoteDiscoveryFailed { endpoint, message } => {
                tracing::warn!(endpoint = %endpoint, error = %message, "remote discovery failed");
            }
            RuntimeWarning::BackendStreamFailed { message } => {
                tracing::warn!(error = %message, "backend stream failed, closing event stream");
            }
            RuntimeWarning::ContinuationStreamFailed {
                agent_name,
                message,
            } => {
                tracing::error!(agent = %agent_name, error = %message, "agent continuation stream error");
            }
            RuntimeWarning::AfterHookFailed { thread_id, message } => {
                tracing::warn!(thread_id = %thread_id, error = %message, "after-request hook failed");
            }
            RuntimeWarning::OutputMessagesDropped { thread_id } => {
                tracing::warn!(thread_id = %thread_id, "output messages never delivered, after-request hook skipped");
            }
        }
    }
}

/// Collects warnings in memory so callers can inspect them.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    warnings: Mutex<Vec<RuntimeWarning>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the warnings recorded so far.
    pub fn warnings(&self) -> Vec<RuntimeWarning> {
        self.warnings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl RuntimeObserver for RecordingObserver {
    fn warn(&self, warning: RuntimeWarning) {
        self.warnings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(warning);
    }
}
