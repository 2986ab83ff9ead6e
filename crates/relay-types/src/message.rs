//! Conversation message types.
//!
//! Messages arrive from the transport layer as [`MessageInput`] records, where
//! structured payloads (action arguments, agent state) are still JSON-encoded
//! strings. [`convert_input_to_messages`] parses them once at the boundary into
//! [`Message`] values that the rest of the runtime treats as immutable.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::MessageError;

/// Role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(MessageRole::System),
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// Where an action execution is carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionExecutionScope {
    #[default]
    Client,
    Server,
    PassThrough,
}

/// A conversation message with its shared identity fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: MessageKind,
}

/// The variant-specific payload of a [`Message`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageKind {
    /// Plain text authored by a user, the assistant or the system.
    Text { role: MessageRole, content: String },

    /// A request to execute an action with parsed arguments.
    ActionExecution {
        name: String,
        arguments: Value,
        #[serde(default)]
        scope: ActionExecutionScope,
    },

    /// The result of a previously requested action execution.
    Result {
        action_execution_id: String,
        action_name: String,
        result: String,
    },

    /// A snapshot of a remote agent's state.
    AgentState {
        thread_id: String,
        agent_name: String,
        node_name: String,
        role: MessageRole,
        state: Value,
        running: bool,
    },
}

impl Message {
    /// Build a message with a fresh id and the current timestamp.
    pub fn new(kind: MessageKind) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            created_at: Utc::now(),
            kind,
        }
    }

    /// Shorthand for a text message.
    pub fn text(role: MessageRole, content: impl Into<String>) -> Self {
        Self::new(MessageKind::Text {
            role,
            content: content.into(),
        })
    }

    pub fn is_agent_state(&self) -> bool {
        matches!(self.kind, MessageKind::AgentState { .. })
    }

    /// The parsed agent state, if this is an agent-state message.
    pub fn agent_state(&self) -> Option<&Value> {
        match &self.kind {
            MessageKind::AgentState { state, .. } => Some(state),
            _ => None,
        }
    }
}

/// Wire form of a message as received from the transport layer.
///
/// `id` and `created_at` are optional on the wire and generated during
/// conversion when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub kind: MessageInputKind,
}

/// Variant payload of a [`MessageInput`]. Structured fields are JSON strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageInputKind {
    Text {
        role: MessageRole,
        content: String,
    },
    ActionExecution {
        name: String,
        arguments: String,
        #[serde(default)]
        scope: ActionExecutionScope,
    },
    Result {
        action_execution_id: String,
        action_name: String,
        result: String,
    },
    AgentState {
        thread_id: String,
        agent_name: String,
        node_name: String,
        role: MessageRole,
        state: String,
        #[serde(default)]
        running: bool,
    },
}

impl MessageInput {
    pub fn new(kind: MessageInputKind) -> Self {
        Self {
            id: None,
            created_at: None,
            kind,
        }
    }

    pub fn is_agent_state(&self) -> bool {
        matches!(self.kind, MessageInputKind::AgentState { .. })
    }
}

impl TryFrom<MessageInput> for Message {
    type Error = MessageError;

    fn try_from(input: MessageInput) -> Result<Self, Self::Error> {
        let kind = match input.kind {
            MessageInputKind::Text { role, content } => MessageKind::Text { role, content },
            MessageInputKind::ActionExecution {
                name,
                arguments,
                scope,
            } => {
                let arguments = parse_payload(&arguments).map_err(|e| {
                    MessageError::InvalidArguments {
                        name: name.clone(),
                        reason: e.to_string(),
                    }
                })?;
                MessageKind::ActionExecution {
                    name,
                    arguments,
                    scope,
                }
            }
            MessageInputKind::Result {
                action_execution_id,
                action_name,
                result,
            } => MessageKind::Result {
                action_execution_id,
                action_name,
                result,
            },
            MessageInputKind::AgentState {
                thread_id,
                agent_name,
                node_name,
                role,
                state,
                running,
            } => {
                let state = parse_payload(&state).map_err(|e| MessageError::InvalidState {
                    agent_name: agent_name.clone(),
                    reason: e.to_string(),
                })?;
                MessageKind::AgentState {
                    thread_id,
                    agent_name,
                    node_name,
                    role,
                    state,
                    running,
                }
            }
        };

        Ok(Message {
            id: input.id.unwrap_or_else(|| Uuid::now_v7().to_string()),
            created_at: input.created_at.unwrap_or_else(Utc::now),
            kind,
        })
    }
}

/// An empty payload string parses to an empty object.
fn parse_payload(raw: &str) -> Result<Value, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(raw)
}

/// Convert wire messages into runtime messages, preserving order.
///
/// Fails on the first message whose JSON payload does not parse.
pub fn convert_input_to_messages(inputs: Vec<MessageInput>) -> Result<Vec<Message>, MessageError> {
    inputs.into_iter().map(Message::try_from).collect()
}
