//! Runtime streaming handler.
//!
//! `POST /api/v1/runtime` hands the request to the runtime and streams the
//! resulting events as SSE:
//!
//! - `session`: `{thread_id, run_id, actions}` once the runtime accepted the request
//! - one event per runtime event, named after its type, with the event as JSON data
//!
//! The stream ends after `complete`. Output messages are rebuilt from the
//! events and handed to the runtime's after-request hook.

use std::convert::Infallible;
use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use tokio::sync::oneshot;
use tracing::Instrument;
use tracing::field::Empty;

use relay_core::action::Action;
use relay_core::event::OutputCollector;
use relay_core::runtime::RuntimeRequest;
use relay_observe::genai_attrs::{
    GEN_AI_AGENT_NAME, GEN_AI_CONVERSATION_ID, GEN_AI_OPERATION_NAME, GEN_AI_PROVIDER_NAME,
    GEN_AI_REQUEST_MAX_TOKENS, GEN_AI_REQUEST_MODEL, GEN_AI_REQUEST_TEMPERATURE, OP_CHAT,
    OP_INVOKE_AGENT, RELAY_ACTIONS_OFFERED, RELAY_EVENTS_STREAMED,
};
use relay_types::action::ActionDescriptor;
use relay_types::event::RuntimeEvent;
use relay_types::message::MessageInput;
use relay_types::request::{AgentSession, ForwardedParameters, Properties};

use crate::http::error::AppError;
use crate::state::AppState;

/// Request body for `POST /api/v1/runtime`.
#[derive(Debug, Deserialize)]
pub struct RuntimeRequestBody {
    #[serde(default)]
    pub messages: Vec<MessageInput>,
    /// Client-declared actions.
    #[serde(default)]
    pub actions: Vec<ActionDescriptor>,
    #[serde(default)]
    pub agent_session: Option<AgentSession>,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub forwarded_parameters: Option<ForwardedParameters>,
    #[serde(default)]
    pub properties: Properties,
}

/// POST /api/v1/runtime
pub async fn stream_runtime(
    State(state): State<AppState>,
    Json(body): Json<RuntimeRequestBody>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let span = tracing::info_span!(
        "relay.request",
        gen_ai.operation.name = Empty,
        gen_ai.provider.name = Empty,
        gen_ai.request.model = Empty,
        gen_ai.request.temperature = Empty,
        gen_ai.request.max_tokens = Empty,
        gen_ai.conversation.id = Empty,
        gen_ai.agent.name = Empty,
        relay.actions.offered = Empty,
        relay.events.streamed = Empty,
    );
    match &body.agent_session {
        Some(session) => {
            span.record(GEN_AI_OPERATION_NAME, OP_INVOKE_AGENT);
            span.record(GEN_AI_AGENT_NAME, session.agent_name.as_str());
        }
        None => {
            span.record(GEN_AI_OPERATION_NAME, OP_CHAT);
            span.record(GEN_AI_PROVIDER_NAME, state.service_adapter.name());
        }
    }
    if let Some(params) = &body.forwarded_parameters {
        if let Some(model) = &params.model {
            span.record(GEN_AI_REQUEST_MODEL, model.as_str());
        }
        if let Some(temperature) = params.temperature {
            span.record(GEN_AI_REQUEST_TEMPERATURE, temperature);
        }
        if let Some(max_tokens) = params.max_tokens {
            span.record(GEN_AI_REQUEST_MAX_TOKENS, max_tokens);
        }
    }

    let client_actions = body.actions.len();
    let (output_tx, output_rx) = oneshot::channel();
    let request = RuntimeRequest {
        service_adapter: state.service_adapter.clone(),
        messages: body.messages,
        actions: body.actions,
        agent_session: body.agent_session,
        thread_id: body.thread_id,
        run_id: body.run_id,
        forwarded_parameters: body.forwarded_parameters,
        properties: body.properties,
        output_messages: output_rx,
    };

    let response = state.runtime.process(request).instrument(span.clone()).await?;
    let events = response.event_source.events()?;

    span.record(GEN_AI_CONVERSATION_ID, response.thread_id.as_str());
    span.record(RELAY_ACTIONS_OFFERED, (response.actions.len() + client_actions) as u64);

    let session_json = serde_json::json!({
        "thread_id": response.thread_id,
        "run_id": response.run_id,
        "actions": response.actions.iter().map(Action::descriptor).collect::<Vec<_>>(),
    });

    let sse_stream = async_stream::stream! {
        yield Ok::<_, Infallible>(Event::default().event("session").data(session_json.to_string()));

        let mut events = events;
        let mut collector = OutputCollector::new();
        let mut streamed: u64 = 0;

        while let Some(event) = events.next().await {
            collector.observe(&event);
            streamed += 1;

            let data = serde_json::to_string(&event).unwrap_or_default();
            yield Ok(Event::default().event(event.event_type()).data(data));

            if matches!(event, RuntimeEvent::Complete) {
                break;
            }
        }

        span.record(RELAY_EVENTS_STREAMED, streamed);
        if output_tx.send(collector.finish()).is_err() {
            tracing::debug!(parent: &span, "runtime no longer waiting for output messages");
        }
    };

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}
