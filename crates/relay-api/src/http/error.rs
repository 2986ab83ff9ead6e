//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use relay_types::error::{AdapterError, EventSourceError, RuntimeError};

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// The runtime refused or failed the request before streaming.
    Runtime(RuntimeError),
}

impl From<RuntimeError> for AppError {
    fn from(e: RuntimeError) -> Self {
        AppError::Runtime(e)
    }
}

impl From<EventSourceError> for AppError {
    fn from(e: EventSourceError) -> Self {
        AppError::Runtime(RuntimeError::EventSource(e))
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Runtime(RuntimeError::NoAgentState) => (StatusCode::BAD_REQUEST, "NO_AGENT_STATE"),
            AppError::Runtime(RuntimeError::AgentNotFound { .. }) => (StatusCode::NOT_FOUND, "AGENT_NOT_FOUND"),
            AppError::Runtime(RuntimeError::UnsupportedAgent { .. }) => {
                (StatusCode::BAD_REQUEST, "UNSUPPORTED_AGENT")
            }
            AppError::Runtime(RuntimeError::InvalidMessage(_)) => (StatusCode::BAD_REQUEST, "INVALID_MESSAGE"),
            AppError::Runtime(RuntimeError::Hook(_)) => (StatusCode::FORBIDDEN, "REQUEST_REJECTED"),
            AppError::Runtime(RuntimeError::Adapter(AdapterError::RateLimited { .. })) => {
                (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED")
            }
            AppError::Runtime(RuntimeError::Adapter(AdapterError::InvalidRequest(_))) => {
                (StatusCode::BAD_REQUEST, "ADAPTER_INVALID_REQUEST")
            }
            AppError::Runtime(RuntimeError::Adapter(_)) => (StatusCode::BAD_GATEWAY, "ADAPTER_ERROR"),
            AppError::Runtime(RuntimeError::Continuation(_)) => (StatusCode::BAD_GATEWAY, "CONTINUATION_FAILED"),
            AppError::Runtime(RuntimeError::EventSource(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "EVENT_SOURCE_ERROR")
            }
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Runtime(e) => write!(f, "{e}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.parts();
        if status.is_server_error() {
            tracing::error!(code, error = %self, "request failed");
        } else {
            tracing::warn!(code, error = %self, "request rejected");
        }

        let body = json!({
            "data": null,
            "meta": {
                "timestamp": chrono::Utc::now().to_rfc3339(),
            },
            "errors": [{
                "code": code,
                "message": self.to_string(),
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_types::error::HookError;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (AppError::from(RuntimeError::NoAgentState), StatusCode::BAD_REQUEST),
            (
                AppError::from(RuntimeError::AgentNotFound {
                    agent_name: "planner".into(),
                }),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::from(RuntimeError::Hook(HookError::new("denied"))),
                StatusCode::FORBIDDEN,
            ),
            (
                AppError::from(RuntimeError::Adapter(AdapterError::RateLimited { retry_after_ms: None })),
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                AppError::from(RuntimeError::Adapter(AdapterError::AuthenticationFailed)),
                StatusCode::BAD_GATEWAY,
            ),
            (
                AppError::from(EventSourceError::AlreadySubscribed),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[tokio::test]
    async fn test_second_subscription_is_event_source_error() {
        let source = relay_core::event::RuntimeEventSource::new(4);
        let _reader = source.events().unwrap();
        let err = AppError::from(source.events().unwrap_err());

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["errors"][0]["code"], "EVENT_SOURCE_ERROR");
        assert!(body["data"].is_null());
    }

    #[test]
    fn test_display_uses_inner_error() {
        let err = AppError::from(RuntimeError::AgentNotFound {
            agent_name: "planner".into(),
        });
        assert_eq!(err.to_string(), "agent 'planner' not found");
    }
}
