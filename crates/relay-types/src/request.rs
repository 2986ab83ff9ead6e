//! Request metadata shared between the transport layer and the runtime.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque request-scoped context properties, passed through to hooks,
/// dynamic action providers and remote endpoints.
pub type Properties = Map<String, Value>;

/// Identifies an existing remote agent run to continue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSession {
    pub thread_id: String,
    pub agent_name: String,
    pub node_name: String,
}

/// How a backend should pick among the offered actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    Auto,
    None,
    Required,
    /// Force a specific action by name.
    Function { name: String },
}

/// Parameters the client forwards to the backend untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForwardedParameters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forwarded_parameters_defaults() {
        let params: ForwardedParameters = serde_json::from_str("{}").unwrap();
        assert_eq!(params, ForwardedParameters::default());
    }

    #[test]
    fn test_tool_choice_function_serde() {
        let choice = ToolChoice::Function {
            name: "search".to_string(),
        };
        let json = serde_json::to_string(&choice).unwrap();
        assert_eq!(json, r#"{"function":{"name":"search"}}"#);
        let parsed: ToolChoice = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, choice);

        let auto: ToolChoice = serde_json::from_str("\"auto\"").unwrap();
        assert_eq!(auto, ToolChoice::Auto);
    }
}
