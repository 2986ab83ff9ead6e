//! Chat Completions SSE stream to [`CompletionChunk`] adapter.
//!
//! Each `data:` line carries one JSON chunk; the literal `[DONE]` ends the
//! stream. Only the first choice and its first tool-call delta are used,
//! which is all the normalizer needs.

use std::fmt::Display;

use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt};

use relay_core::adapter::{CompletionChunk, ToolCallDelta};
use relay_types::error::AdapterError;

use super::types::ChatCompletionChunk;

const DONE_SENTINEL: &str = "[DONE]";

/// Decode an SSE byte stream into completion chunks.
///
/// Chunks without choices (usage reports) are skipped.
pub fn completion_chunks<S, B, E>(
    bytes: S,
) -> impl Stream<Item = Result<CompletionChunk, AdapterError>> + Send + 'static
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    async_stream::try_stream! {
        let mut events = std::pin::pin!(bytes.eventsource());

        while let Some(event) = events.next().await {
            let event = event.map_err(|e| AdapterError::Stream(e.to_string()))?;
            if event.data.trim() == DONE_SENTINEL {
                break;
            }
            if let Some(chunk) = parse_chunk(&event.data)? {
                yield chunk;
            }
        }
    }
}

/// Parse one `data:` payload.
pub fn parse_chunk(data: &str) -> Result<Option<CompletionChunk>, AdapterError> {
    let chunk: ChatCompletionChunk = serde_json::from_str(data)
        .map_err(|e| AdapterError::Deserialization(format!("chat completion chunk: {e}")))?;
    Ok(to_completion_chunk(chunk))
}

fn to_completion_chunk(chunk: ChatCompletionChunk) -> Option<CompletionChunk> {
    let ChatCompletionChunk { id, choices } = chunk;
    let delta = choices.into_iter().next()?.delta;

    let tool_call = delta
        .tool_calls
        .and_then(|calls| calls.into_iter().next())
        .map(|call| {
            let (name, arguments) = call
                .function
                .map(|f| (f.name, f.arguments))
                .unwrap_or_default();
            ToolCallDelta {
                id: call.id,
                name,
                arguments,
            }
        });

    Some(CompletionChunk {
        id,
        content: delta.content,
        tool_call,
    })
}
