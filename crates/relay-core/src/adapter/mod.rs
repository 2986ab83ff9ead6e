//! Service adapter port.
//!
//! A service adapter turns one plain turn into backend calls and streams the
//! normalized result into the request's event source. Adapters use RPITIT
//! (`impl Future` in trait), so dynamic dispatch goes through
//! [`BoxServiceAdapter`].

pub mod normalize;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use relay_types::action::ActionDescriptor;
use relay_types::error::AdapterError;
use relay_types::message::Message;
use relay_types::request::ForwardedParameters;

use crate::event::RuntimeEventSource;
use crate::observer::RuntimeObserver;

pub use normalize::{CompletionChunk, StreamMode, StreamNormalizer, ToolCallDelta, drive_completion_stream};

/// Everything an adapter needs to serve one turn.
pub struct AdapterRequest {
    pub messages: Vec<Message>,
    pub actions: Vec<ActionDescriptor>,
    pub thread_id: Option<String>,
    pub run_id: Option<String>,
    pub event_source: RuntimeEventSource,
    pub forwarded_parameters: Option<ForwardedParameters>,
    /// Where the adapter reports in-stream failures.
    pub observer: Arc<dyn RuntimeObserver>,
}

impl std::fmt::Debug for AdapterRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRequest")
            .field("messages", &self.messages.len())
            .field("actions", &self.actions.len())
            .field("thread_id", &self.thread_id)
            .field("run_id", &self.run_id)
            .field("forwarded_parameters", &self.forwarded_parameters)
            .finish_non_exhaustive()
    }
}

/// Identifiers of the turn an adapter started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterResponse {
    pub thread_id: String,
    pub run_id: Option<String>,
}

/// A completion backend.
///
/// `process` returns once the turn is accepted; event production continues
/// in a task started through the request's event source.
pub trait ServiceAdapter: Send + Sync {
    fn name(&self) -> &str;

    fn process(
        &self,
        request: AdapterRequest,
    ) -> impl Future<Output = Result<AdapterResponse, AdapterError>> + Send;
}

/// Object-safe version of [`ServiceAdapter`] with boxed futures.
pub trait ServiceAdapterDyn: Send + Sync {
    fn name(&self) -> &str;

    fn process_boxed(
        &self,
        request: AdapterRequest,
    ) -> Pin<Box<dyn Future<Output = Result<AdapterResponse, AdapterError>> + Send + '_>>;
}

impl<T: ServiceAdapter> ServiceAdapterDyn for T {
    fn name(&self) -> &str {
        ServiceAdapter::name(self)
    }

    fn process_boxed(
        &self,
        request: AdapterRequest,
    ) -> Pin<Box<dyn Future<Output = Result<AdapterResponse, AdapterError>> + Send + '_>> {
        Box::pin(self.process(request))
    }
}

/// Type-erased service adapter for runtime backend selection.
pub struct BoxServiceAdapter {
    inner: Box<dyn ServiceAdapterDyn>,
}

impl BoxServiceAdapter {
    pub fn new<T: ServiceAdapter + 'static>(adapter: T) -> Self {
        Self {
            inner: Box::new(adapter),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub async fn process(&self, request: AdapterRequest) -> Result<AdapterResponse, AdapterError> {
        self.inner.process_boxed(request).await
    }
}

impl std::fmt::Debug for BoxServiceAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxServiceAdapter")
            .field("name", &self.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::TracingObserver;
    use futures_util::StreamExt;
    use relay_types::event::RuntimeEvent;

    struct CannedAdapter;

    impl ServiceAdapter for CannedAdapter {
        fn name(&self) -> &str {
            "canned"
        }

        async fn process(&self, request: AdapterRequest) -> Result<AdapterResponse, AdapterError> {
            request.event_source.stream(|emitter| async move {
                emitter.send_text_message_start("m1").await;
                emitter.send_text_message_content("ok").await;
                emitter.send_text_message_end().await;
                emitter.complete().await;
            })?;
            Ok(AdapterResponse {
                thread_id: request.thread_id.unwrap_or_else(|| "generated".to_string()),
                run_id: request.run_id,
            })
        }
    }

    #[tokio::test]
    async fn test_box_adapter_delegates() {
        let adapter = BoxServiceAdapter::new(CannedAdapter);
        assert_eq!(adapter.name(), "canned");

        let source = RuntimeEventSource::new(8);
        let response = adapter
            .process(AdapterRequest {
                messages: vec![],
                actions: vec![],
                thread_id: Some("t1".to_string()),
                run_id: None,
                event_source: source.clone(),
                forwarded_parameters: None,
                observer: Arc::new(TracingObserver),
            })
            .await
            .unwrap();

        assert_eq!(response.thread_id, "t1");
        let events: Vec<RuntimeEvent> = source.events().unwrap().collect().await;
        assert_eq!(events.len(), 4);
        assert_eq!(events.last(), Some(&RuntimeEvent::Complete));
    }
}
