//! OpenAI-compatible service adapter.
//!
//! A single [`OpenAiCompatibleAdapter`] serves OpenAI, Unify and any other
//! endpoint that speaks the Chat Completions protocol, selected by base URL.
//! Requests are sent with `reqwest`; the SSE response is decoded by
//! [`streaming::completion_chunks`] and normalized into the request's event
//! source by [`drive_completion_stream`].

pub mod config;
pub mod streaming;
pub mod types;

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Value, json};
use uuid::Uuid;

use relay_core::adapter::{AdapterRequest, AdapterResponse, ServiceAdapter, drive_completion_stream};
use relay_types::action::ActionDescriptor;
use relay_types::error::AdapterError;
use relay_types::message::{Message, MessageKind, MessageRole};
use relay_types::request::{ForwardedParameters, ToolChoice};

use self::config::{OpenAiCompatConfig, openai_defaults, unify_defaults};
use self::streaming::completion_chunks;
use self::types::{
    ApiErrorBody, ChatCompletionRequest, ChatFunction, ChatFunctionCall, ChatMessage, ChatTool,
    ChatToolCall,
};

/// Service adapter for any OpenAI-compatible Chat Completions API.
///
/// Does NOT derive Debug: the API key lives inside.
pub struct OpenAiCompatibleAdapter {
    client: reqwest::Client,
    provider_name: String,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
}

impl OpenAiCompatibleAdapter {
    pub fn new(config: OpenAiCompatConfig) -> Result<Self, AdapterError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| AdapterError::Provider {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            provider_name: config.provider_name,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            model: config.model,
        })
    }

    pub fn openai(api_key: SecretString, model: &str) -> Result<Self, AdapterError> {
        Self::new(openai_defaults(api_key, model))
    }

    pub fn unify(api_key: SecretString, model: &str) -> Result<Self, AdapterError> {
        Self::new(unify_defaults(api_key, model))
    }

    /// The default model used when none is forwarded.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_request(
        &self,
        messages: &[Message],
        actions: &[ActionDescriptor],
        forwarded: Option<&ForwardedParameters>,
    ) -> ChatCompletionRequest {
        let forwarded = forwarded.cloned().unwrap_or_default();
        ChatCompletionRequest {
            model: forwarded.model.unwrap_or_else(|| self.model.clone()),
            messages: messages.iter().filter_map(to_chat_message).collect(),
            stream: true,
            tools: actions.iter().map(to_chat_tool).collect(),
            max_tokens: forwarded.max_tokens,
            stop: forwarded.stop.filter(|s| !s.is_empty()),
            temperature: forwarded.temperature,
            tool_choice: forwarded.tool_choice.as_ref().map(tool_choice_value),
        }
    }
}

impl ServiceAdapter for OpenAiCompatibleAdapter {
    fn name(&self) -> &str {
        &self.provider_name
    }

    async fn process(&self, request: AdapterRequest) -> Result<AdapterResponse, AdapterError> {
        let body = self.build_request(
            &request.messages,
            &request.actions,
            request.forwarded_parameters.as_ref(),
        );
        tracing::debug!(
            provider = %self.provider_name,
            model = %body.model,
            messages = body.messages.len(),
            tools = body.tools.len(),
            "sending chat completion request"
        );

        let mut http = self.client.post(self.url()).json(&body);
        if let Some(key) = &self.api_key {
            http = http.bearer_auth(key.expose_secret());
        }
        let response = http.send().await.map_err(|e| AdapterError::Provider {
            message: format!("HTTP request failed: {e}"),
        })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_ms = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(|secs| secs * 1000);
            let error_body = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), &error_body, retry_after_ms));
        }

        let chunks = completion_chunks(response.bytes_stream());
        let observer = request.observer.clone();
        request
            .event_source
            .stream(move |emitter| drive_completion_stream(chunks, emitter, observer))?;

        Ok(AdapterResponse {
            thread_id: request
                .thread_id
                .unwrap_or_else(|| Uuid::now_v7().to_string()),
            run_id: request.run_id,
        })
    }
}

/// Map a non-2xx response to an [`AdapterError`].
fn status_error(status: u16, body: &str, retry_after_ms: Option<u64>) -> AdapterError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.to_string());
    match status {
        401 | 403 => AdapterError::AuthenticationFailed,
        429 => AdapterError::RateLimited { retry_after_ms },
        400 | 404 | 422 => AdapterError::InvalidRequest(message),
        _ => AdapterError::Provider {
            message: format!("HTTP {status}: {message}"),
        },
    }
}

/// Map a runtime message into the provider's format.
///
/// Agent-state messages have no provider counterpart and are dropped.
fn to_chat_message(message: &Message) -> Option<ChatMessage> {
    let chat = match &message.kind {
        MessageKind::Text { role, content } => match role {
            MessageRole::System => ChatMessage::System {
                content: content.clone(),
            },
            MessageRole::User => ChatMessage::User {
                content: content.clone(),
            },
            MessageRole::Assistant => ChatMessage::Assistant {
                content: Some(content.clone()),
                tool_calls: Vec::new(),
            },
        },
        MessageKind::ActionExecution {
            name, arguments, ..
        } => ChatMessage::Assistant {
            content: None,
            tool_calls: vec![ChatToolCall {
                id: message.id.clone(),
                kind: "function",
                function: ChatFunctionCall {
                    name: name.clone(),
                    arguments: arguments.to_string(),
                },
            }],
        },
        MessageKind::Result {
            action_execution_id,
            result,
            ..
        } => ChatMessage::Tool {
            content: result.clone(),
            tool_call_id: action_execution_id.clone(),
        },
        MessageKind::AgentState { .. } => return None,
    };
    Some(chat)
}

fn to_chat_tool(action: &ActionDescriptor) -> ChatTool {
    ChatTool {
        kind: "function",
        function: ChatFunction {
            name: action.name.clone(),
            description: action.description.clone(),
            parameters: action.json_schema.clone(),
        },
    }
}

fn tool_choice_value(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::Auto => json!("auto"),
        ToolChoice::None => json!("none"),
        ToolChoice::Required => json!("required"),
        ToolChoice::Function { name } => json!({
            "type": "function",
            "function": { "name": name },
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::Router;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::post;
    use futures_util::StreamExt;
    use relay_core::event::RuntimeEventSource;
    use relay_core::observer::RecordingObserver;
    use relay_types::event::RuntimeEvent;
    use relay_types::message::ActionExecutionScope;
    use tokio::sync::Mutex;

    fn adapter(base_url: &str) -> OpenAiCompatibleAdapter {
        OpenAiCompatibleAdapter::new(OpenAiCompatConfig {
            provider_name: "test".to_string(),
            base_url: base_url.to_string(),
            api_key: Some(SecretString::from("sk-test".to_string())),
            model: "gpt-4o".to_string(),
        })
        .unwrap()
    }

    fn request(source: &RuntimeEventSource, thread_id: Option<&str>) -> AdapterRequest {
        AdapterRequest {
            messages: vec![Message::text(MessageRole::User, "hi")],
            actions: vec![],
            thread_id: thread_id.map(str::to_string),
            run_id: None,
            event_source: source.clone(),
            forwarded_parameters: None,
            observer: Arc::new(RecordingObserver::new()),
        }
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn test_openai_factory() {
        let adapter = OpenAiCompatibleAdapter::openai(SecretString::from("sk".to_string()), "gpt-4o").unwrap();
        assert_eq!(adapter.name(), "openai");
        assert_eq!(adapter.model(), "gpt-4o");
        assert_eq!(adapter.url(), "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn test_unify_factory_url() {
        let adapter = OpenAiCompatibleAdapter::unify(SecretString::from("k".to_string()), "gpt-4o@openai").unwrap();
        assert_eq!(adapter.name(), "unify");
        assert_eq!(adapter.url(), "https://api.unify.ai/v0/chat/completions");
    }

    #[test]
    fn test_message_mapping() {
        let messages = vec![
            Message::text(MessageRole::System, "be brief"),
            Message::new(MessageKind::ActionExecution {
                name: "search".to_string(),
                arguments: json!({"q": "rust"}),
                scope: ActionExecutionScope::Server,
            }),
            Message::new(MessageKind::Result {
                action_execution_id: "call_1".to_string(),
                action_name: "search".to_string(),
                result: "found".to_string(),
            }),
            Message::new(MessageKind::AgentState {
                thread_id: "t".to_string(),
                agent_name: "a".to_string(),
                node_name: "n".to_string(),
                role: MessageRole::Assistant,
                state: json!({}),
                running: false,
            }),
        ];

        let request = adapter("http://unused").build_request(&messages, &[], None);
        assert_eq!(request.messages.len(), 3);
        assert!(matches!(request.messages[0], ChatMessage::System { .. }));
        match &request.messages[1] {
            ChatMessage::Assistant { content, tool_calls } => {
                assert!(content.is_none());
                assert_eq!(tool_calls[0].id, messages[1].id);
                assert_eq!(tool_calls[0].function.arguments, r#"{"q":"rust"}"#);
            }
            other => panic!("expected assistant tool call, got {other:?}"),
        }
        assert_eq!(
            request.messages[2],
            ChatMessage::Tool {
                content: "found".to_string(),
                tool_call_id: "call_1".to_string(),
            }
        );
    }

    #[test]
    fn test_forwarded_parameters_override_defaults() {
        let forwarded = ForwardedParameters {
            model: Some("gpt-4o-mini".to_string()),
            max_tokens: Some(256),
            stop: Some(vec![]),
            temperature: Some(0.2),
            tool_choice: Some(ToolChoice::Function {
                name: "search".to_string(),
            }),
        };
        let actions = vec![ActionDescriptor::new("search", "Search", json!({"type": "object"}))];

        let request = adapter("http://unused").build_request(&[], &actions, Some(&forwarded));
        assert_eq!(request.model, "gpt-4o-mini");
        assert_eq!(request.max_tokens, Some(256));
        assert!(request.stop.is_none());
        assert_eq!(request.temperature, Some(0.2));
        assert_eq!(request.tools.len(), 1);
        assert_eq!(
            request.tool_choice,
            Some(json!({"type": "function", "function": {"name": "search"}}))
        );
    }

    #[test]
    fn test_status_error_mapping() {
        assert!(matches!(status_error(401, "", None), AdapterError::AuthenticationFailed));
        assert!(matches!(
            status_error(429, "", Some(2000)),
            AdapterError::RateLimited {
                retry_after_ms: Some(2000)
            }
        ));
        match status_error(400, r#"{"error":{"message":"bad tool schema"}}"#, None) {
            AdapterError::InvalidRequest(message) => assert_eq!(message, "bad tool schema"),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(matches!(status_error(500, "oops", None), AdapterError::Provider { .. }));
    }

    #[tokio::test]
    async fn test_process_streams_normalized_events() {
        let seen = Arc::new(Mutex::new(None::<(String, Value)>));
        let seen_in_handler = seen.clone();
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move |headers: HeaderMap, axum::Json(body): axum::Json<Value>| {
                let seen = seen_in_handler.clone();
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    *seen.lock().await = Some((auth, body));
                    (
                        [("content-type", "text/event-stream")],
                        concat!(
                            "data: {\"id\":\"c1\",\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\n",
                            "data: {\"id\":\"c1\",\"choices\":[{\"delta\":{\"tool_calls\":[{\"id\":\"call_1\",\"function\":{\"name\":\"search\",\"arguments\":\"{}\"}}]}}]}\n\n",
                            "data: [DONE]\n\n",
                        ),
                    )
                }
            }),
        );
        let base_url = serve(app).await;

        let source = RuntimeEventSource::new(16);
        let events = source.events().unwrap();
        let response = adapter(&format!("{base_url}/v1"))
            .process(request(&source, Some("t1")))
            .await
            .unwrap();
        assert_eq!(response.thread_id, "t1");

        let collected: Vec<RuntimeEvent> = events.collect().await;
        let kinds: Vec<&str> = collected.iter().map(RuntimeEvent::event_type).collect();
        assert_eq!(
            kinds,
            vec![
                "text_message_start",
                "text_message_content",
                "text_message_end",
                "action_execution_start",
                "action_execution_args",
                "action_execution_end",
                "complete",
            ]
        );

        let (auth, body) = seen.lock().await.clone().unwrap();
        assert_eq!(auth, "Bearer sk-test");
        assert_eq!(body["stream"], true);
        assert!(body.get("tools").is_none());
    }

    #[tokio::test]
    async fn test_process_maps_http_errors() {
        let app = Router::new().route(
            "/chat/completions",
            post(|| async { (StatusCode::UNAUTHORIZED, "nope").into_response() }),
        );
        let base_url = serve(app).await;

        let source = RuntimeEventSource::new(4);
        let err = adapter(&base_url)
            .process(request(&source, None))
            .await
            .unwrap_err();
        assert!(matches!(err, AdapterError::AuthenticationFailed));
        // The writer was never taken.
        assert!(source.emitter().is_ok());
    }

    #[tokio::test]
    async fn test_process_generates_thread_id() {
        let app = Router::new().route(
            "/chat/completions",
            post(|| async { ([("content-type", "text/event-stream")], "data: [DONE]\n\n") }),
        );
        let base_url = serve(app).await;

        let source = RuntimeEventSource::new(4);
        let events = source.events().unwrap();
        let response = adapter(&base_url).process(request(&source, None)).await.unwrap();
        assert!(!response.thread_id.is_empty());

        let collected: Vec<RuntimeEvent> = events.collect().await;
        assert_eq!(collected, vec![RuntimeEvent::Complete]);
    }
}
