//! Rebuilding output messages from a streamed response.
//!
//! The after-request hook wants the turn's output as messages, while the
//! transport only sees events. [`OutputCollector`] folds the events back
//! into messages as they pass by.

use chrono::Utc;
use relay_types::event::RuntimeEvent;
use relay_types::message::{ActionExecutionScope, Message, MessageKind, MessageRole};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug)]
struct OpenText {
    id: String,
    content: String,
}

#[derive(Debug)]
struct OpenAction {
    id: String,
    name: String,
    args: String,
}

/// Folds runtime events into output messages.
#[derive(Debug, Default)]
pub struct OutputCollector {
    messages: Vec<Message>,
    text: Option<OpenText>,
    action: Option<OpenAction>,
}

impl OutputCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, event: &RuntimeEvent) {
        match event {
            RuntimeEvent::TextMessageStart { message_id } => {
                self.close_open();
                self.text = Some(OpenText {
                    id: message_id.clone(),
                    content: String::new(),
                });
            }
            RuntimeEvent::TextMessageContent { content } => {
                self.text
                    .get_or_insert_with(|| OpenText {
                        id: Uuid::now_v7().to_string(),
                        content: String::new(),
                    })
                    .content
                    .push_str(content);
            }
            RuntimeEvent::TextMessageEnd => self.close_text(),
            RuntimeEvent::ActionExecutionStart {
                action_execution_id,
                action_name,
            } => {
                self.close_open();
                self.action = Some(OpenAction {
                    id: action_execution_id.clone(),
                    name: action_name.clone(),
                    args: String::new(),
                });
            }
            RuntimeEvent::ActionExecutionArgs { args } => {
                if let Some(action) = self.action.as_mut() {
                    action.args.push_str(args);
                }
            }
            RuntimeEvent::ActionExecutionEnd => self.close_action(),
            RuntimeEvent::ActionExecutionResult {
                action_execution_id,
                action_name,
                result,
            } => self.push(
                Uuid::now_v7().to_string(),
                MessageKind::Result {
                    action_execution_id: action_execution_id.clone(),
                    action_name: action_name.clone(),
                    result: result.clone(),
                },
            ),
            RuntimeEvent::AgentStateMessage {
                thread_id,
                agent_name,
                node_name,
                role,
                state,
                running,
                ..
            } => self.push(
                Uuid::now_v7().to_string(),
                MessageKind::AgentState {
                    thread_id: thread_id.clone(),
                    agent_name: agent_name.clone(),
                    node_name: node_name.clone(),
                    role: *role,
                    state: state.clone(),
                    running: *running,
                },
            ),
            RuntimeEvent::Complete => self.close_open(),
        }
    }

    /// The collected messages, closing anything still open.
    pub fn finish(mut self) -> Vec<Message> {
        self.close_open();
        self.messages
    }

    fn close_open(&mut self) {
        self.close_text();
        self.close_action();
    }

    fn close_text(&mut self) {
        if let Some(text) = self.text.take() {
            self.push(
                text.id,
                MessageKind::Text {
                    role: MessageRole::Assistant,
                    content: text.content,
                },
            );
        }
    }

    fn close_action(&mut self) {
        if let Some(action) = self.action.take() {
            // Arguments that are not valid JSON are kept verbatim as a string.
            let arguments = if action.args.trim().is_empty() {
                Value::Object(Default::default())
            } else {
                serde_json::from_str(&action.args).unwrap_or(Value::String(action.args))
            };
            self.push(
                action.id,
                MessageKind::ActionExecution {
                    name: action.name,
                    arguments,
                    scope: ActionExecutionScope::default(),
                },
            );
        }
    }

    fn push(&mut self, id: String, kind: MessageKind) {
        self.messages.push(Message {
            id,
            created_at: Utc::now(),
            kind,
        });
    }
}
