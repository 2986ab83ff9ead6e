//! The request orchestrator.
//!
//! [`Runtime::process`] serves one request along one of two paths:
//!
//! - **Plain turn** (no agent session): gather actions from every source,
//!   run the before-hook, and hand the turn to the request's service adapter.
//! - **Continuation** (agent session present): find the remote agent named by
//!   the session, resume it with the state carried by the last agent-state
//!   message, and forward its events.
//!
//! Both paths return as soon as event production has started. The
//! after-hook runs in the background once the caller delivers the output
//! messages.

mod continuation;
pub mod hooks;

use std::sync::Arc;

use relay_types::action::ActionDescriptor;
use relay_types::error::RuntimeError;
use relay_types::message::{Message, MessageInput, convert_input_to_messages};
use relay_types::request::{AgentSession, ForwardedParameters, Properties};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::action::{Action, ActionsProvider, flatten_no_duplicates, merge_actions};
use crate::adapter::{AdapterRequest, BoxServiceAdapter};
use crate::chain::{ChainSource, SharedChain, resolve_chains};
use crate::event::RuntimeEventSource;
use crate::observer::{RuntimeObserver, RuntimeWarning, TracingObserver};
use crate::remote::{BoxRemoteEndpoint, DiscoveryContext, RemoteEndpoint, discover_all};

pub use hooks::{AfterRequestHook, AfterRequestOptions, BeforeRequestHook, BeforeRequestOptions, Middleware};

const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

/// One inbound request.
pub struct RuntimeRequest {
    /// Backend for plain turns. Unused on the continuation path.
    pub service_adapter: Arc<BoxServiceAdapter>,
    pub messages: Vec<MessageInput>,
    /// Client-declared actions.
    pub actions: Vec<ActionDescriptor>,
    pub agent_session: Option<AgentSession>,
    pub thread_id: Option<String>,
    pub run_id: Option<String>,
    pub forwarded_parameters: Option<ForwardedParameters>,
    pub properties: Properties,
    /// Resolves to the final output messages once the caller has them.
    pub output_messages: oneshot::Receiver<Vec<Message>>,
}

impl RuntimeRequest {
    /// A plain-turn request with everything else left empty.
    pub fn new(
        service_adapter: Arc<BoxServiceAdapter>,
        messages: Vec<MessageInput>,
        output_messages: oneshot::Receiver<Vec<Message>>,
    ) -> Self {
        Self {
            service_adapter,
            messages,
            actions: Vec::new(),
            agent_session: None,
            thread_id: None,
            run_id: None,
            forwarded_parameters: None,
            properties: Properties::new(),
            output_messages,
        }
    }
}

impl std::fmt::Debug for RuntimeRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeRequest")
            .field("service_adapter", &self.service_adapter.name())
            .field("messages", &self.messages.len())
            .field("actions", &self.actions.len())
            .field("agent_session", &self.agent_session)
            .field("thread_id", &self.thread_id)
            .field("run_id", &self.run_id)
            .finish_non_exhaustive()
    }
}

/// What the caller gets back before any event has necessarily been produced.
#[derive(Debug)]
pub struct RuntimeResponse {
    pub thread_id: String,
    pub run_id: Option<String>,
    pub event_source: RuntimeEventSource,
    /// Server-side actions offered on this turn. Empty for continuations.
    pub actions: Vec<Action>,
}

/// The request orchestrator. Cheap to share behind an `Arc`.
pub struct Runtime {
    actions: ActionsProvider,
    chains: Vec<SharedChain>,
    remote_endpoints: Vec<BoxRemoteEndpoint>,
    middleware: Middleware,
    observer: Arc<dyn RuntimeObserver>,
    event_channel_capacity: usize,
}

impl Runtime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::default()
    }

    /// Serve one request.
    pub async fn process(&self, request: RuntimeRequest) -> Result<RuntimeResponse, RuntimeError> {
        match request.agent_session.clone() {
            Some(session) => self.process_agent_session(request, session).await,
            None => self.process_turn(request).await,
        }
    }

    async fn process_turn(&self, request: RuntimeRequest) -> Result<RuntimeResponse, RuntimeError> {
        let RuntimeRequest {
            service_adapter,
            messages,
            actions: client_actions,
            thread_id,
            run_id,
            forwarded_parameters,
            properties,
            output_messages,
            ..
        } = request;

        let inputs: Vec<MessageInput> = messages.into_iter().filter(|m| !m.is_agent_state()).collect();
        let input_messages = convert_input_to_messages(inputs)?;

        let chain_actions = resolve_chains(&self.chains, self.observer.as_ref()).await;
        let ctx = DiscoveryContext {
            properties: properties.clone(),
            messages: input_messages.clone(),
        };
        let remote_actions = discover_all(&self.remote_endpoints, &ctx, self.observer.as_ref())
            .await
            .into_iter()
            .map(|executable| executable.action)
            .collect();
        let local_actions = self.actions.resolve(&properties);

        let actions = merge_actions(local_actions, chain_actions, remote_actions);
        let descriptors = flatten_no_duplicates(actions.iter().map(Action::descriptor).chain(client_actions));

        tracing::debug!(
            adapter = %service_adapter.name(),
            server_actions = actions.len(),
            offered_actions = descriptors.len(),
            "processing turn"
        );

        self.middleware
            .before_request(BeforeRequestOptions {
                thread_id: thread_id.clone(),
                run_id: run_id.clone(),
                input_messages: input_messages.clone(),
                properties: properties.clone(),
            })
            .await?;

        let event_source = RuntimeEventSource::new(self.event_channel_capacity);
        let response = service_adapter
            .process(AdapterRequest {
                messages: input_messages.clone(),
                actions: descriptors,
                thread_id,
                run_id,
                event_source: event_source.clone(),
                forwarded_parameters,
                observer: Arc::clone(&self.observer),
            })
            .await
            .map_err(|e| {
                tracing::error!(adapter = %service_adapter.name(), error = %e, "service adapter failed");
                e
            })?;

        let thread_id = if response.thread_id.is_empty() {
            Uuid::now_v7().to_string()
        } else {
            response.thread_id
        };

        self.schedule_after_request(
            thread_id.clone(),
            response.run_id.clone(),
            input_messages,
            properties,
            output_messages,
        );

        Ok(RuntimeResponse {
            thread_id,
            run_id: response.run_id,
            event_source,
            actions,
        })
    }

    async fn process_agent_session(
        &self,
        request: RuntimeRequest,
        session: AgentSession,
    ) -> Result<RuntimeResponse, RuntimeError> {
        let RuntimeRequest {
            messages,
            thread_id,
            properties,
            output_messages,
            ..
        } = request;

        let messages = convert_input_to_messages(messages)?;
        let state = messages
            .iter()
            .rev()
            .find_map(Message::agent_state)
            .cloned()
            .ok_or(RuntimeError::NoAgentState)?;

        let ctx = DiscoveryContext {
            properties: properties.clone(),
            messages: messages.iter().filter(|m| !m.is_agent_state()).cloned().collect(),
        };
        let executables = discover_all(&self.remote_endpoints, &ctx, self.observer.as_ref()).await;
        let agent = executables
            .into_iter()
            .find(|e| e.name() == session.agent_name)
            .ok_or_else(|| RuntimeError::AgentNotFound {
                agent_name: session.agent_name.clone(),
            })?;
        let resumable = agent.continuation().ok_or_else(|| RuntimeError::UnsupportedAgent {
            agent_name: session.agent_name.clone(),
        })?;

        self.middleware
            .before_request(BeforeRequestOptions {
                thread_id: Some(session.thread_id.clone()),
                run_id: None,
                input_messages: messages.clone(),
                properties: properties.clone(),
            })
            .await?;

        tracing::info!(
            agent = %session.agent_name,
            node = %session.node_name,
            thread_id = %session.thread_id,
            "continuing agent session"
        );

        let remote_events = resumable
            .continue_session(&session.agent_name, state, &session.thread_id, &session.node_name)
            .await
            .map_err(|e| {
                tracing::error!(agent = %session.agent_name, error = %e, "agent continuation failed");
                e
            })?;

        let event_source = RuntimeEventSource::new(self.event_channel_capacity);
        let observer = Arc::clone(&self.observer);
        let agent_name = session.agent_name.clone();
        event_source.stream(move |emitter| {
            continuation::forward_agent_events(remote_events, emitter, observer, agent_name)
        })?;

        let thread_id = thread_id.unwrap_or(session.thread_id);
        self.schedule_after_request(thread_id.clone(), None, messages, properties, output_messages);

        Ok(RuntimeResponse {
            thread_id,
            run_id: None,
            event_source,
            actions: Vec::new(),
        })
    }

    /// Run the after-hook in the background once the output messages arrive.
    fn schedule_after_request(
        &self,
        thread_id: String,
        run_id: Option<String>,
        input_messages: Vec<Message>,
        properties: Properties,
        output_messages: oneshot::Receiver<Vec<Message>>,
    ) {
        let Some(hook) = self.middleware.after.clone() else {
            return;
        };
        let observer = Arc::clone(&self.observer);

        tokio::spawn(async move {
            let Ok(output_messages) = output_messages.await else {
                observer.warn(RuntimeWarning::OutputMessagesDropped { thread_id });
                return;
            };
            let options = AfterRequestOptions {
                thread_id: thread_id.clone(),
                run_id,
                input_messages,
                output_messages,
                properties,
            };
            if let Err(e) = hook(options).await {
                observer.warn(RuntimeWarning::AfterHookFailed {
                    thread_id,
                    message: e.to_string(),
                });
            }
        });
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("chains", &self.chains)
            .field("remote_endpoints", &self.remote_endpoints)
            .field("middleware", &self.middleware)
            .field("event_channel_capacity", &self.event_channel_capacity)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Runtime`].
pub struct RuntimeBuilder {
    actions: ActionsProvider,
    chains: Vec<SharedChain>,
    remote_endpoints: Vec<BoxRemoteEndpoint>,
    middleware: Middleware,
    observer: Arc<dyn RuntimeObserver>,
    event_channel_capacity: usize,
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self {
            actions: ActionsProvider::default(),
            chains: Vec::new(),
            remote_endpoints: Vec::new(),
            middleware: Middleware::default(),
            observer: Arc::new(TracingObserver),
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl RuntimeBuilder {
    pub fn actions(mut self, actions: ActionsProvider) -> Self {
        self.actions = actions;
        self
    }

    pub fn chain<C: ChainSource + 'static>(mut self, chain: C) -> Self {
        self.chains.push(SharedChain::new(chain));
        self
    }

    pub fn remote_endpoint<E: RemoteEndpoint + 'static>(mut self, endpoint: E) -> Self {
        self.remote_endpoints.push(BoxRemoteEndpoint::new(endpoint));
        self
    }

    pub fn middleware(mut self, middleware: Middleware) -> Self {
        self.middleware = middleware;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn RuntimeObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }

    pub fn build(self) -> Runtime {
        Runtime {
            actions: self.actions,
            chains: self.chains,
            remote_endpoints: self.remote_endpoints,
            middleware: self.middleware,
            observer: self.observer,
            event_channel_capacity: self.event_channel_capacity,
        }
    }
}
