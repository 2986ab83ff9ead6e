//! Single-producer, single-consumer event stream for one request.
//!
//! A `RuntimeEventSource` is created per request and shared between the
//! producer (a service adapter or a continuation forwarder) and the transport
//! that renders events. It is backed by a bounded `tokio::sync::mpsc` channel,
//! so a slow reader applies backpressure to the producer instead of buffering
//! without limit.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use relay_types::error::EventSourceError;
use relay_types::event::RuntimeEvent;
use relay_types::message::MessageRole;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;

/// The reader half of a [`RuntimeEventSource`].
pub type EventStream = ReceiverStream<RuntimeEvent>;

/// Handle to one request's event stream.
///
/// Cloning the handle shares the same underlying channel; the writer and the
/// reader can each be taken exactly once.
#[derive(Clone)]
pub struct RuntimeEventSource {
    inner: Arc<Channel>,
}

struct Channel {
    sender: Mutex<Option<mpsc::Sender<RuntimeEvent>>>,
    receiver: Mutex<Option<mpsc::Receiver<RuntimeEvent>>>,
}

impl RuntimeEventSource {
    /// Create an event source whose channel holds at most `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            inner: Arc::new(Channel {
                sender: Mutex::new(Some(sender)),
                receiver: Mutex::new(Some(receiver)),
            }),
        }
    }

    /// Run `producer` as an independent task, handing it the single writer.
    ///
    /// Fails with [`EventSourceError::AlreadyStreaming`] if the writer has
    /// already been taken.
    pub fn stream<F, Fut>(&self, producer: F) -> Result<JoinHandle<()>, EventSourceError>
    where
        F: FnOnce(EventEmitter) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let emitter = self.emitter()?;
        Ok(tokio::spawn(async move { producer(emitter).await }))
    }

    /// Take the single writer without spawning a task.
    pub fn emitter(&self) -> Result<EventEmitter, EventSourceError> {
        let sender = self
            .inner
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(EventSourceError::AlreadyStreaming)?;
        Ok(EventEmitter { sender })
    }

    /// Take the single reader.
    ///
    /// Fails with [`EventSourceError::AlreadySubscribed`] on a second call.
    pub fn events(&self) -> Result<EventStream, EventSourceError> {
        let receiver = self
            .inner
            .receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(EventSourceError::AlreadySubscribed)?;
        Ok(ReceiverStream::new(receiver))
    }
}

impl std::fmt::Debug for RuntimeEventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let writer_taken = self
            .inner
            .sender
            .lock()
            .map(|s| s.is_none())
            .unwrap_or(true);
        let reader_taken = self
            .inner
            .receiver
            .lock()
            .map(|r| r.is_none())
            .unwrap_or(true);
        f.debug_struct("RuntimeEventSource")
            .field("writer_taken", &writer_taken)
            .field("reader_taken", &reader_taken)
            .finish()
    }
}

/// The writer half of a [`RuntimeEventSource`].
///
/// Not `Clone`: one producer per stream. [`EventEmitter::complete`] consumes
/// the emitter, so `Complete` is sent at most once.
#[derive(Debug)]
pub struct EventEmitter {
    sender: mpsc::Sender<RuntimeEvent>,
}

impl EventEmitter {
    /// Send an event, waiting for channel capacity.
    ///
    /// If the reader is gone the event is dropped silently.
    pub async fn send(&self, event: RuntimeEvent) {
        if self.sender.send(event).await.is_err() {
            tracing::trace!("event reader dropped, discarding event");
        }
    }

    /// Whether the reader has gone away.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Resolves once the reader has gone away.
    pub async fn closed(&self) {
        self.sender.closed().await;
    }

    pub async fn send_text_message_start(&self, message_id: impl Into<String>) {
        self.send(RuntimeEvent::TextMessageStart {
            message_id: message_id.into(),
        })
        .await;
    }

    pub async fn send_text_message_content(&self, content: impl Into<String>) {
        self.send(RuntimeEvent::TextMessageContent {
            content: content.into(),
        })
        .await;
    }

    pub async fn send_text_message_end(&self) {
        self.send(RuntimeEvent::TextMessageEnd).await;
    }

    pub async fn send_action_execution_start(
        &self,
        action_execution_id: impl Into<String>,
        action_name: impl Into<String>,
    ) {
        self.send(RuntimeEvent::ActionExecutionStart {
            action_execution_id: action_execution_id.into(),
            action_name: action_name.into(),
        })
        .await;
    }

    pub async fn send_action_execution_args(&self, args: impl Into<String>) {
        self.send(RuntimeEvent::ActionExecutionArgs { args: args.into() })
            .await;
    }

    pub async fn send_action_execution_end(&self) {
        self.send(RuntimeEvent::ActionExecutionEnd).await;
    }

    pub async fn send_action_execution_result(
        &self,
        action_execution_id: impl Into<String>,
        action_name: impl Into<String>,
        result: impl Into<String>,
    ) {
        self.send(RuntimeEvent::ActionExecutionResult {
            action_execution_id: action_execution_id.into(),
            action_name: action_name.into(),
            result: result.into(),
        })
        .await;
    }

    /// Send an agent state snapshot.
    #[allow(clippy::too_many_arguments)]
    pub async fn send_agent_state(
        &self,
        thread_id: impl Into<String>,
        agent_name: impl Into<String>,
        node_name: impl Into<String>,
        run_id: Option<String>,
        active: bool,
        state: Value,
        running: bool,
    ) {
        self.send(RuntimeEvent::AgentStateMessage {
            thread_id: thread_id.into(),
            agent_name: agent_name.into(),
            node_name: node_name.into(),
            run_id,
            active,
            role: MessageRole::Assistant,
            state,
            running,
        })
        .await;
    }

    /// Send the terminal `Complete` event and close the stream.
    pub async fn complete(self) {
        self.send(RuntimeEvent::Complete).await;
    }
}
