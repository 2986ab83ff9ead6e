//! Forwarding a continued agent session into an event source.

use std::sync::Arc;

use futures_util::StreamExt;
use relay_types::event::RuntimeEvent;

use crate::event::EventEmitter;
use crate::observer::{RuntimeObserver, RuntimeWarning};
use crate::remote::RemoteEventStream;

/// Pull events from a remote agent and forward them to `emitter`.
///
/// Error items are reported and skipped. The stream completes when the
/// source is exhausted or yields its own `Complete`. Once the reader is gone
/// the source is no longer polled.
pub(crate) async fn forward_agent_events(
    mut source: RemoteEventStream,
    emitter: EventEmitter,
    observer: Arc<dyn RuntimeObserver>,
    agent_name: String,
) {
    let mut forwarded = 0usize;
    loop {
        let item = tokio::select! {
            _ = emitter.closed() => {
                tracing::debug!(agent = %agent_name, forwarded, "event reader dropped, abandoning agent stream");
                return;
            }
            item = source.next() => item,
        };

        match item {
            Some(Ok(RuntimeEvent::Complete)) | None => break,
            Some(Ok(event)) => {
                emitter.send(event).await;
                forwarded += 1;
            }
            Some(Err(e)) => observer.warn(RuntimeWarning::ContinuationStreamFailed {
                agent_name: agent_name.clone(),
                message: e.to_string(),
            }),
        }
    }

    tracing::debug!(agent = %agent_name, forwarded, "agent stream finished");
    emitter.complete().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::RuntimeEventSource;
    use crate::observer::RecordingObserver;
    use relay_types::error::RemoteError;

    fn content(text: &str) -> RuntimeEvent {
        RuntimeEvent::TextMessageContent {
            content: text.to_string(),
        }
    }

    #[tokio::test]
    async fn errors_are_logged_and_skipped() {
        let source = RuntimeEventSource::new(8);
        let events = source.events().unwrap();
        let observer = Arc::new(RecordingObserver::new());
        let remote: RemoteEventStream = Box::pin(futures_util::stream::iter(vec![
            Ok(RuntimeEvent::TextMessageStart {
                message_id: "m1".to_string(),
            }),
            Err(RemoteError::Stream("bad line".to_string())),
            Ok(content("hi")),
            Ok(RuntimeEvent::TextMessageEnd),
        ]));

        forward_agent_events(remote, source.emitter().unwrap(), observer.clone(), "researcher".to_string())
            .await;

        let collected: Vec<RuntimeEvent> = events.collect().await;
        assert_eq!(collected.len(), 4);
        assert_eq!(collected[1], content("hi"));
        assert_eq!(collected[3], RuntimeEvent::Complete);
        assert_eq!(observer.warnings().len(), 1);
    }

    #[tokio::test]
    async fn upstream_complete_is_not_duplicated() {
        let source = RuntimeEventSource::new(8);
        let events = source.events().unwrap();
        let remote: RemoteEventStream = Box::pin(futures_util::stream::iter(vec![
            Ok(content("a")),
            Ok(RuntimeEvent::Complete),
            Ok(content("after")),
        ]));

        forward_agent_events(
            remote,
            source.emitter().unwrap(),
            Arc::new(RecordingObserver::new()),
            "researcher".to_string(),
        )
        .await;

        let collected: Vec<RuntimeEvent> = events.collect().await;
        assert_eq!(collected, vec![content("a"), RuntimeEvent::Complete]);
    }

    #[tokio::test]
    async fn stops_pulling_when_reader_dropped() {
        let source = RuntimeEventSource::new(1);
        drop(source.events().unwrap());
        let remote: RemoteEventStream =
            Box::pin(futures_util::stream::repeat_with(|| Ok(content("x"))));

        tokio::time::timeout(
            std::time::Duration::from_secs(1),
            forward_agent_events(
                remote,
                source.emitter().unwrap(),
                Arc::new(RecordingObserver::new()),
                "researcher".to_string(),
            ),
        )
        .await
        .expect("forwarder should stop once the reader is gone");
    }
}
