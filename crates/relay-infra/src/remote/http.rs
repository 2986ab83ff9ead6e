//! HTTP remote endpoint.
//!
//! Discovery, action execution and agent runs are plain JSON POSTs below the
//! endpoint URL. Agent runs answer with newline-delimited JSON runtime
//! events, parsed incrementally from the response body.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::Value;

use relay_core::action::Action;
use relay_core::remote::{
    AgentContinuation, DiscoveryContext, RemoteEndpoint, RemoteEventStream, RemoteExecutable,
};
use relay_types::config::RemoteEndpointConfig;
use relay_types::error::{ActionError, RemoteError};
use relay_types::event::RuntimeEvent;
use relay_types::request::Properties;

use super::types::{
    ExecuteActionRequest, ExecuteAgentRequest, InfoRequest, InfoResponse, RemoteActionInfo,
    RemoteAgentInfo,
};

/// A remote endpoint reached over HTTP.
#[derive(Clone)]
pub struct HttpRemoteEndpoint {
    connection: Arc<Connection>,
}

struct Connection {
    name: String,
    url: String,
    client: reqwest::Client,
    headers: HeaderMap,
}

impl HttpRemoteEndpoint {
    /// Build an endpoint from config. Header entries that are not valid
    /// HTTP headers are skipped with a warning.
    pub fn new(config: &RemoteEndpointConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| RemoteError::Request {
                endpoint: config.name.clone(),
                message: format!("failed to create HTTP client: {e}"),
            })?;

        let mut headers = HeaderMap::new();
        for (key, value) in &config.headers {
            match (
                HeaderName::from_bytes(key.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => tracing::warn!(endpoint = %config.name, header = %key, "skipping invalid header"),
            }
        }

        Ok(Self {
            connection: Arc::new(Connection {
                name: config.name.clone(),
                url: config.url.trim_end_matches('/').to_string(),
                client,
                headers,
            }),
        })
    }

    fn remote_action(&self, info: RemoteActionInfo, properties: &Properties) -> RemoteExecutable {
        let connection = self.connection.clone();
        let properties = properties.clone();
        let name = info.name.clone();
        RemoteExecutable::action(Action::new(
            info.name,
            info.description,
            info.parameters,
            move |arguments| {
                let connection = connection.clone();
                let properties = properties.clone();
                let name = name.clone();
                async move {
                    let result = connection.execute_action(&name, &arguments, &properties).await;
                    result.map_err(|e| ActionError::Execution {
                        name,
                        message: e.to_string(),
                    })
                }
            },
        ))
    }

    fn remote_agent(&self, info: RemoteAgentInfo, properties: &Properties) -> RemoteExecutable {
        let connection = self.connection.clone();
        let handler_properties = properties.clone();
        let name = info.name.clone();
        let action = Action::new(info.name, info.description, Vec::new(), move |arguments| {
            let connection = connection.clone();
            let properties = handler_properties.clone();
            let name = name.clone();
            async move {
                let result = connection.run_agent(&name, &arguments, &properties).await;
                result.map_err(|e| ActionError::Execution {
                    name,
                    message: e.to_string(),
                })
            }
        });

        let agent = HttpAgent {
            connection: self.connection.clone(),
            properties: properties.clone(),
        };
        RemoteExecutable::agent(action, Arc::new(agent))
    }
}

impl RemoteEndpoint for HttpRemoteEndpoint {
    fn name(&self) -> &str {
        &self.connection.name
    }

    async fn discover(&self, ctx: &DiscoveryContext) -> Result<Vec<RemoteExecutable>, RemoteError> {
        let body = InfoRequest {
            properties: &ctx.properties,
            messages: &ctx.messages,
        };
        let response = self.connection.post("info", &body).await?;
        let info: InfoResponse = response
            .json()
            .await
            .map_err(|e| RemoteError::Deserialization(format!("info response: {e}")))?;

        tracing::debug!(
            endpoint = %self.connection.name,
            actions = info.actions.len(),
            agents = info.agents.len(),
            "remote endpoint info received"
        );

        let mut executables = Vec::with_capacity(info.actions.len() + info.agents.len());
        for action in info.actions {
            executables.push(self.remote_action(action, &ctx.properties));
        }
        for agent in info.agents {
            executables.push(self.remote_agent(agent, &ctx.properties));
        }
        Ok(executables)
    }
}

impl Connection {
    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<reqwest::Response, RemoteError> {
        let response = self
            .client
            .post(format!("{}/{path}", self.url))
            .headers(self.headers.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| RemoteError::Request {
                endpoint: self.name.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                endpoint: self.name.clone(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Returns the body's `result` field, or the whole body if absent.
    async fn execute_action(
        &self,
        name: &str,
        arguments: &Value,
        properties: &Properties,
    ) -> Result<Value, RemoteError> {
        let body = ExecuteActionRequest {
            name,
            arguments,
            properties,
        };
        let response = self.post("actions/execute", &body).await?;
        let mut body: Value = response
            .json()
            .await
            .map_err(|e| RemoteError::Deserialization(format!("action result: {e}")))?;

        if body.get("result").is_some() {
            Ok(body["result"].take())
        } else {
            Ok(body)
        }
    }

    /// Start a fresh agent run and wait for it to finish.
    ///
    /// Returns the last agent state the run reported, or `null`.
    async fn run_agent(
        &self,
        name: &str,
        state: &Value,
        properties: &Properties,
    ) -> Result<Value, RemoteError> {
        let body = ExecuteAgentRequest {
            name,
            state,
            thread_id: None,
            node_name: None,
            properties,
        };
        let response = self.post("agents/execute", &body).await?;
        let mut events = ndjson_events(response.bytes_stream());

        let mut last_state = Value::Null;
        while let Some(event) = events.next().await {
            match event? {
                RuntimeEvent::AgentStateMessage { state, .. } => last_state = state,
                RuntimeEvent::Complete => break,
                _ => {}
            }
        }
        Ok(last_state)
    }
}

/// Continuation capability for an agent discovered on an HTTP endpoint.
struct HttpAgent {
    connection: Arc<Connection>,
    properties: Properties,
}

impl AgentContinuation for HttpAgent {
    fn continue_session<'a>(
        &'a self,
        agent_name: &'a str,
        state: Value,
        thread_id: &'a str,
        node_name: &'a str,
    ) -> BoxFuture<'a, Result<RemoteEventStream, RemoteError>> {
        Box::pin(async move {
            tracing::debug!(
                endpoint = %self.connection.name,
                agent = %agent_name,
                thread_id = %thread_id,
                node = %node_name,
                "continuing agent session"
            );
            let body = ExecuteAgentRequest {
                name: agent_name,
                state: &state,
                thread_id: Some(thread_id),
                node_name: Some(node_name),
                properties: &self.properties,
            };
            let response = self.connection.post("agents/execute", &body).await?;
            Ok(ndjson_events(response.bytes_stream()))
        })
    }
}

/// Longest agent event line accepted from a remote, newline excluded.
const MAX_LINE_BYTES: usize = 8 * 1024 * 1024;

/// Decode a newline-delimited JSON body into runtime events.
///
/// A line that fails to parse yields an error and decoding continues with
/// the next line. A body read failure, or a line longer than
/// `MAX_LINE_BYTES`, yields an error and ends the stream.
pub fn ndjson_events<S, B, E>(bytes: S) -> RemoteEventStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    ndjson_events_with_limit(bytes, MAX_LINE_BYTES)
}

fn ndjson_events_with_limit<S, B, E>(bytes: S, max_line: usize) -> RemoteEventStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut bytes = std::pin::pin!(bytes);
        let mut buffer: Vec<u8> = Vec::new();
        // Bytes of `buffer` already known to hold no newline.
        let mut scanned = 0;

        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(RemoteError::Stream(format!("response body read: {e}")));
                    return;
                }
            };
            buffer.extend_from_slice(chunk.as_ref());

            while let Some(offset) = buffer[scanned..].iter().position(|b| *b == b'\n') {
                let newline = scanned + offset;
                if newline > max_line {
                    yield Err(line_too_long(max_line));
                    return;
                }
                let line: Vec<u8> = buffer.drain(..=newline).collect();
                scanned = 0;
                if let Some(event) = parse_line(&line) {
                    yield event;
                }
            }
            scanned = buffer.len();

            if buffer.len() > max_line {
                yield Err(line_too_long(max_line));
                return;
            }
        }

        // Trailing line without a newline.
        if let Some(event) = parse_line(&buffer) {
            yield event;
        }
    })
}

fn line_too_long(max_line: usize) -> RemoteError {
    RemoteError::Stream(format!("agent event line exceeds {max_line} bytes"))
}

fn parse_line(line: &[u8]) -> Option<Result<RuntimeEvent, RemoteError>> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return None;
    }
    Some(
        serde_json::from_slice(line)
            .map_err(|e| RemoteError::Deserialization(format!("agent event: {e}"))),
    )
}
