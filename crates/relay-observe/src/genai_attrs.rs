//! OpenTelemetry GenAI semantic convention attribute names.
//!
//! Spans declare these fields with dotted literals (`gen_ai.request.model =
//! tracing::field::Empty`) and fill them later with `Span::record` using the
//! constants below, so the names stay in one place.

/// The operation being performed (see the `OP_*` values).
pub const GEN_AI_OPERATION_NAME: &str = "gen_ai.operation.name";

/// The backend adapter serving the request (e.g. "openai").
pub const GEN_AI_PROVIDER_NAME: &str = "gen_ai.provider.name";

/// Model override forwarded by the client, if any.
pub const GEN_AI_REQUEST_MODEL: &str = "gen_ai.request.model";

pub const GEN_AI_REQUEST_TEMPERATURE: &str = "gen_ai.request.temperature";

pub const GEN_AI_REQUEST_MAX_TOKENS: &str = "gen_ai.request.max_tokens";

/// Conversation thread the request belongs to.
pub const GEN_AI_CONVERSATION_ID: &str = "gen_ai.conversation.id";

/// Name of the remote agent being continued.
pub const GEN_AI_AGENT_NAME: &str = "gen_ai.agent.name";

/// Number of actions offered to the backend.
pub const RELAY_ACTIONS_OFFERED: &str = "relay.actions.offered";

/// Number of events streamed to the client.
pub const RELAY_EVENTS_STREAMED: &str = "relay.events.streamed";

// --- Operation name values ---

/// A plain chat turn handled by a service adapter.
pub const OP_CHAT: &str = "chat";

/// Continuation of an existing remote agent session.
pub const OP_INVOKE_AGENT: &str = "invoke_agent";
