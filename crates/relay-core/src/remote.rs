//! Remote endpoints: discoverable actions and continuable agents.
//!
//! A [`RemoteEndpoint`] is queried per request for the executables it offers.
//! Each [`RemoteExecutable`] is an [`Action`]; agents additionally carry an
//! [`AgentContinuation`] capability that resumes an existing session and
//! yields a stream of runtime events.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::Stream;
use futures_util::future::BoxFuture;
use relay_types::error::RemoteError;
use relay_types::event::RuntimeEvent;
use relay_types::message::Message;
use relay_types::request::Properties;
use serde_json::Value;

use crate::action::Action;
use crate::observer::{RuntimeObserver, RuntimeWarning};

/// Raw event stream produced by a continued agent session.
pub type RemoteEventStream = Pin<Box<dyn Stream<Item = Result<RuntimeEvent, RemoteError>> + Send + 'static>>;

/// What a remote endpoint sees when asked for its executables.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryContext {
    pub properties: Properties,
    pub messages: Vec<Message>,
}

/// Capability to resume an existing agent session.
pub trait AgentContinuation: Send + Sync {
    fn continue_session<'a>(
        &'a self,
        agent_name: &'a str,
        state: Value,
        thread_id: &'a str,
        node_name: &'a str,
    ) -> BoxFuture<'a, Result<RemoteEventStream, RemoteError>>;
}

/// An action offered by a remote endpoint, optionally backed by an agent.
#[derive(Clone)]
pub struct RemoteExecutable {
    pub action: Action,
    agent: Option<Arc<dyn AgentContinuation>>,
}

impl RemoteExecutable {
    /// A plain remote action.
    pub fn action(action: Action) -> Self {
        Self {
            action,
            agent: None,
        }
    }

    /// A remote agent whose sessions can be continued.
    pub fn agent(action: Action, continuation: Arc<dyn AgentContinuation>) -> Self {
        Self {
            action,
            agent: Some(continuation),
        }
    }

    pub fn name(&self) -> &str {
        &self.action.name
    }

    /// The continuation capability, if this executable is an agent.
    pub fn continuation(&self) -> Option<Arc<dyn AgentContinuation>> {
        self.agent.clone()
    }
}

impl std::fmt::Debug for RemoteExecutable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteExecutable")
            .field("name", &self.action.name)
            .field("agent", &self.agent.is_some())
            .finish()
    }
}

/// A source of remote executables.
pub trait RemoteEndpoint: Send + Sync {
    fn name(&self) -> &str;

    fn discover(
        &self,
        ctx: &DiscoveryContext,
    ) -> impl Future<Output = Result<Vec<RemoteExecutable>, RemoteError>> + Send;
}

/// Object-safe version of [`RemoteEndpoint`] with boxed futures.
pub trait RemoteEndpointDyn: Send + Sync {
    fn name(&self) -> &str;

    fn discover_boxed<'a>(
        &'a self,
        ctx: &'a DiscoveryContext,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RemoteExecutable>, RemoteError>> + Send + 'a>>;
}

impl<T: RemoteEndpoint> RemoteEndpointDyn for T {
    fn name(&self) -> &str {
        RemoteEndpoint::name(self)
    }

    fn discover_boxed<'a>(
        &'a self,
        ctx: &'a DiscoveryContext,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RemoteExecutable>, RemoteError>> + Send + 'a>> {
        Box::pin(self.discover(ctx))
    }
}

/// Type-erased remote endpoint, so a runtime can hold endpoints of
/// different concrete types.
pub struct BoxRemoteEndpoint {
    inner: Box<dyn RemoteEndpointDyn>,
}

impl BoxRemoteEndpoint {
    pub fn new<T: RemoteEndpoint + 'static>(endpoint: T) -> Self {
        Self {
            inner: Box::new(endpoint),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub async fn discover(&self, ctx: &DiscoveryContext) -> Result<Vec<RemoteExecutable>, RemoteError> {
        self.inner.discover_boxed(ctx).await
    }
}

impl std::fmt::Debug for BoxRemoteEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxRemoteEndpoint")
            .field("name", &self.name())
            .finish()
    }
}

/// Query every endpoint concurrently and concatenate their executables.
///
/// An endpoint that fails is skipped and reported to the observer. Order
/// follows `endpoints`, then each endpoint's own order.
pub async fn discover_all(
    endpoints: &[BoxRemoteEndpoint],
    ctx: &DiscoveryContext,
    observer: &dyn RuntimeObserver,
) -> Vec<RemoteExecutable> {
    let results =
        futures_util::future::join_all(endpoints.iter().map(|endpoint| endpoint.discover(ctx))).await;

    let mut executables = Vec::new();
    for (endpoint, result) in endpoints.iter().zip(results) {
        match result {
            Ok(found) => {
                tracing::debug!(endpoint = %endpoint.name(), count = found.len(), "remote executables discovered");
                executables.extend(found);
            }
            Err(e) => observer.warn(RuntimeWarning::RemoteDiscoveryFailed {
                endpoint: endpoint.name().to_string(),
                message: e.to_string(),
            }),
        }
    }
    executables
}
