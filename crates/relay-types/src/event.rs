//! Normalized runtime events.
//!
//! `RuntimeEvent` is the provider-independent event type every backend
//! response is translated into. A well-formed sequence never has two open
//! spans at once: each `*Start` is closed by its matching `*End` before the
//! next `*Start`, and `Complete` appears at most once, last.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::MessageRole;

/// A single event on a runtime event stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    /// A text message span opens.
    TextMessageStart { message_id: String },

    /// A chunk of text within the open message span.
    TextMessageContent { content: String },

    /// The open text message span closes.
    TextMessageEnd,

    /// An action call span opens.
    ActionExecutionStart {
        action_execution_id: String,
        action_name: String,
    },

    /// A fragment of the open action call's JSON arguments.
    ActionExecutionArgs { args: String },

    /// The open action call span closes.
    ActionExecutionEnd,

    /// The result of a server-side action execution.
    ActionExecutionResult {
        action_execution_id: String,
        action_name: String,
        result: String,
    },

    /// A state snapshot from a remote agent.
    AgentStateMessage {
        thread_id: String,
        agent_name: String,
        node_name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        run_id: Option<String>,
        #[serde(default)]
        active: bool,
        role: MessageRole,
        state: Value,
        running: bool,
    },

    /// The stream is finished. Terminal.
    Complete,
}

impl RuntimeEvent {
    /// Stable snake_case name of the event kind (matches the serde tag).
    pub fn event_type(&self) -> &'static str {
        match self {
            RuntimeEvent::TextMessageStart { .. } => "text_message_start",
            RuntimeEvent::TextMessageContent { .. } => "text_message_content",
            RuntimeEvent::TextMessageEnd => "text_message_end",
            RuntimeEvent::ActionExecutionStart { .. } => "action_execution_start",
            RuntimeEvent::ActionExecutionArgs { .. } => "action_execution_args",
            RuntimeEvent::ActionExecutionEnd => "action_execution_end",
            RuntimeEvent::ActionExecutionResult { .. } => "action_execution_result",
            RuntimeEvent::AgentStateMessage { .. } => "agent_state_message",
            RuntimeEvent::Complete => "complete",
        }
    }

    pub fn is_start(&self) -> bool {
        matches!(
            self,
            RuntimeEvent::TextMessageStart { .. } | RuntimeEvent::ActionExecutionStart { .. }
        )
    }

    pub fn is_end(&self) -> bool {
        matches!(
            self,
            RuntimeEvent::TextMessageEnd | RuntimeEvent::ActionExecutionEnd
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_matches_serde_tag() {
        let events = vec![
            RuntimeEvent::TextMessageStart {
                message_id: "m1".to_string(),
            },
            RuntimeEvent::TextMessageContent {
                content: "hi".to_string(),
            },
            RuntimeEvent::TextMessageEnd,
            RuntimeEvent::ActionExecutionStart {
                action_execution_id: "a".to_string(),
                action_name: "f".to_string(),
            },
            RuntimeEvent::ActionExecutionArgs {
                args: "{}".to_string(),
            },
            RuntimeEvent::ActionExecutionEnd,
            RuntimeEvent::Complete,
        ];

        for event in events {
            let json = serde_json::to_value(&event).unwrap();
            assert_eq!(json["type"], event.event_type());
        }
    }

    #[test]
    fn test_start_end_classification() {
        assert!(RuntimeEvent::TextMessageStart { message_id: "m".into() }.is_start());
        assert!(RuntimeEvent::ActionExecutionEnd.is_end());
        assert!(!RuntimeEvent::Complete.is_start());
        assert!(!RuntimeEvent::Complete.is_end());
    }

    #[test]
    fn test_agent_state_event_deserializes_without_optional_fields() {
        let raw = r#"{"type":"agent_state_message","thread_id":"t","agent_name":"a","node_name":"n","role":"assistant","state":{"k":1},"running":true}"#;
        let event: RuntimeEvent = serde_json::from_str(raw).unwrap();
        match event {
            RuntimeEvent::AgentStateMessage { run_id, active, running, .. } => {
                assert!(run_id.is_none());
                assert!(!active);
                assert!(running);
            }
            other => panic!("expected AgentStateMessage, got {other:?}"),
        }
    }
}
