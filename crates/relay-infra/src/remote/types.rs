//! Wire types for remote endpoints and chains.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use relay_types::action::Parameter;
use relay_types::message::Message;
use relay_types::request::Properties;

/// Body of `POST {url}/info`.
#[derive(Debug, Serialize)]
pub struct InfoRequest<'a> {
    pub properties: &'a Properties,
    pub messages: &'a [Message],
}

/// What an endpoint offers.
#[derive(Debug, Default, Deserialize)]
pub struct InfoResponse {
    #[serde(default)]
    pub actions: Vec<RemoteActionInfo>,
    #[serde(default)]
    pub agents: Vec<RemoteAgentInfo>,
}

#[derive(Debug, Deserialize)]
pub struct RemoteActionInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

#[derive(Debug, Deserialize)]
pub struct RemoteAgentInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Body of `POST {url}/actions/execute`.
#[derive(Debug, Serialize)]
pub struct ExecuteActionRequest<'a> {
    pub name: &'a str,
    pub arguments: &'a Value,
    pub properties: &'a Properties,
}

/// Body of `POST {url}/agents/execute`.
///
/// A fresh run omits `threadId` and `nodeName`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteAgentRequest<'a> {
    pub name: &'a str,
    pub state: &'a Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_name: Option<&'a str>,
    pub properties: &'a Properties,
}

/// Body of `POST {url}/invoke` on a chain.
#[derive(Debug, Serialize)]
pub struct InvokeRequest {
    pub input: Value,
}

#[derive(Debug, Deserialize)]
pub struct InvokeResponse {
    #[serde(default)]
    pub output: Value,
}
