//! Streaming normalization state machine.
//!
//! Backends stream interleaved text and tool-call deltas. The normalizer
//! turns them into a well-nested event sequence: at most one span (text
//! message or action execution) is open at a time, every span that opens is
//! closed, and the stream ends with exactly one `Complete`.
//!
//! A tool-call delta whose id differs from the open call's id starts a new
//! call. Providers only send the id on a call's first delta, so later deltas
//! without an id continue the open call.

use std::sync::Arc;

use futures_util::{Stream, StreamExt};
use relay_types::error::AdapterError;
use relay_types::event::RuntimeEvent;

use crate::event::EventEmitter;
use crate::observer::{RuntimeObserver, RuntimeWarning};

/// One provider delta, reduced to what the state machine needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionChunk {
    /// Provider's id for the response; becomes the text message id.
    pub id: String,
    pub content: Option<String>,
    pub tool_call: Option<ToolCallDelta>,
}

impl CompletionChunk {
    pub fn text(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: Some(content.into()),
            tool_call: None,
        }
    }

    pub fn tool_call(id: impl Into<String>, delta: ToolCallDelta) -> Self {
        Self {
            id: id.into(),
            content: None,
            tool_call: Some(delta),
        }
    }
}

/// A fragment of a streamed tool call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCallDelta {
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments: Option<String>,
}

/// Which span is currently open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StreamMode {
    #[default]
    None,
    Message,
    Function,
}

/// Per-request normalization state.
#[derive(Debug, Default)]
pub struct StreamNormalizer {
    mode: StreamMode,
    current_call_id: Option<String>,
}

impl StreamNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> StreamMode {
        self.mode
    }

    /// Events produced by one chunk, in emission order.
    pub fn process(&mut self, chunk: &CompletionChunk) -> Vec<RuntimeEvent> {
        let mut events = Vec::new();
        let new_call = self.new_call_id(chunk).map(str::to_string);

        match self.mode {
            StreamMode::Message if new_call.is_some() => {
                events.push(RuntimeEvent::TextMessageEnd);
                self.mode = StreamMode::None;
            }
            StreamMode::Function if chunk.tool_call.is_none() || new_call.is_some() => {
                events.push(RuntimeEvent::ActionExecutionEnd);
                self.mode = StreamMode::None;
                self.current_call_id = None;
            }
            _ => {}
        }

        if self.mode == StreamMode::None {
            if let Some(call_id) = new_call {
                let name = chunk
                    .tool_call
                    .as_ref()
                    .and_then(|t| t.name.clone())
                    .unwrap_or_default();
                events.push(RuntimeEvent::ActionExecutionStart {
                    action_execution_id: call_id.clone(),
                    action_name: name,
                });
                self.current_call_id = Some(call_id);
                self.mode = StreamMode::Function;
            } else if non_empty(chunk.content.as_deref()).is_some() {
                events.push(RuntimeEvent::TextMessageStart {
                    message_id: chunk.id.clone(),
                });
                self.mode = StreamMode::Message;
            }
        }

        match self.mode {
            StreamMode::Message => {
                if let Some(content) = non_empty(chunk.content.as_deref()) {
                    events.push(RuntimeEvent::TextMessageContent {
                        content: content.to_string(),
                    });
                }
            }
            StreamMode::Function => {
                let arguments = chunk.tool_call.as_ref().and_then(|t| non_empty(t.arguments.as_deref()));
                if let Some(args) = arguments {
                    events.push(RuntimeEvent::ActionExecutionArgs {
                        args: args.to_string(),
                    });
                }
            }
            StreamMode::None => {}
        }

        events
    }

    /// Close whatever span is still open. Does not emit `Complete`.
    pub fn finish(&mut self) -> Option<RuntimeEvent> {
        let closing = match self.mode {
            StreamMode::Message => Some(RuntimeEvent::TextMessageEnd),
            StreamMode::Function => Some(RuntimeEvent::ActionExecutionEnd),
            StreamMode::None => None,
        };
        self.mode = StreamMode::None;
        self.current_call_id = None;
        closing
    }

    fn new_call_id<'c>(&self, chunk: &'c CompletionChunk) -> Option<&'c str> {
        let id = chunk
            .tool_call
            .as_ref()
            .and_then(|t| non_empty(t.id.as_deref()))?;
        match (&self.mode, &self.current_call_id) {
            (StreamMode::Function, Some(current)) if current == id => None,
            _ => Some(id),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

/// Normalize a backend chunk stream into `emitter`.
///
/// A stream error is reported to `observer` and ends the stream early. The
/// open span is always closed and `Complete` is always sent. Stops pulling
/// from the backend once the reader has gone away.
pub async fn drive_completion_stream<S>(stream: S, emitter: EventEmitter, observer: Arc<dyn RuntimeObserver>)
where
    S: Stream<Item = Result<CompletionChunk, AdapterError>> + Send,
{
    let mut stream = std::pin::pin!(stream);
    let mut normalizer = StreamNormalizer::new();

    loop {
        let item = tokio::select! {
            _ = emitter.closed() => {
                tracing::debug!("event reader dropped, abandoning backend stream");
                return;
            }
            item = stream.next() => item,
        };

        match item {
            Some(Ok(chunk)) => {
                for event in normalizer.process(&chunk) {
                    emitter.send(event).await;
                }
            }
            Some(Err(e)) => {
                observer.warn(RuntimeWarning::BackendStreamFailed {
                    message: e.to_string(),
                });
                break;
            }
            None => break,
        }
    }

    if let Some(closing) = normalizer.finish() {
        emitter.send(closing).await;
    }
    emitter.complete().await;
}
