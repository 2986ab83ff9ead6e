use thiserror::Error;

/// Errors converting wire messages into runtime messages.
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("invalid arguments for action '{name}': {reason}")]
    InvalidArguments { name: String, reason: String },

    #[error("invalid state for agent '{agent_name}': {reason}")]
    InvalidState { agent_name: String, reason: String },
}

/// Errors from a service adapter or its backend.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("provider error: {message}")]
    Provider { message: String },

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("event source error: {0}")]
    EventSource(#[from] EventSourceError),
}

/// A lifecycle hook failed.
#[derive(Debug, Clone, Error)]
#[error("hook failed: {message}")]
pub struct HookError {
    pub message: String,
}

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A configured chain could not be turned into an action.
///
/// `Clone` because chain resolution is shared across requests.
#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error("failed to load chain '{name}': {message}")]
    Load { name: String, message: String },

    #[error("chain '{name}' returned an invalid schema: {message}")]
    InvalidSchema { name: String, message: String },
}

/// Errors talking to a remote endpoint or agent.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("request to '{endpoint}' failed: {message}")]
    Request { endpoint: String, message: String },

    #[error("'{endpoint}' responded with HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("deserialization error: {0}")]
    Deserialization(String),

    #[error("stream error: {0}")]
    Stream(String),
}

/// Errors executing an action handler.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("action '{name}' failed: {message}")]
    Execution { name: String, message: String },

    #[error("invalid arguments for action '{name}': {message}")]
    InvalidArguments { name: String, message: String },
}

/// Misuse of a single-use event source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventSourceError {
    #[error("event source is already streaming")]
    AlreadyStreaming,

    #[error("event source already has a subscriber")]
    AlreadySubscribed,
}

/// Errors surfaced to the caller of `Runtime::process`.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("no agent state messages found")]
    NoAgentState,

    #[error("agent '{agent_name}' not found")]
    AgentNotFound { agent_name: String },

    #[error("agent '{agent_name}' cannot continue a session")]
    UnsupportedAgent { agent_name: String },

    #[error("invalid message: {0}")]
    InvalidMessage(#[from] MessageError),

    #[error("adapter error: {0}")]
    Adapter(#[from] AdapterError),

    #[error("agent continuation failed: {0}")]
    Continuation(#[from] RemoteError),

    #[error("{0}")]
    Hook(#[from] HookError),

    #[error("{0}")]
    EventSource(#[from] EventSourceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_error_display() {
        let err = RuntimeError::AgentNotFound {
            agent_name: "researcher".to_string(),
        };
        assert_eq!(err.to_string(), "agent 'researcher' not found");

        let err = RuntimeError::NoAgentState;
        assert_eq!(err.to_string(), "no agent state messages found");
    }

    #[test]
    fn test_adapter_error_converts_into_runtime_error() {
        let err: RuntimeError = AdapterError::AuthenticationFailed.into();
        assert!(matches!(err, RuntimeError::Adapter(AdapterError::AuthenticationFailed)));
        assert_eq!(err.to_string(), "adapter error: authentication failed");
    }

    #[test]
    fn test_chain_error_display() {
        let err = ChainError::Load {
            name: "summarize".to_string(),
            message: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("summarize"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_remote_status_error_display() {
        let err = RemoteError::Status {
            endpoint: "research".to_string(),
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "'research' responded with HTTP 502: bad gateway");
    }
}
