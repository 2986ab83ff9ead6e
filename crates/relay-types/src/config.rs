//! Runtime configuration types for Relay.
//!
//! `RuntimeConfig` represents the top-level `relay.toml` that selects the
//! completion backend and lists remote endpoints and chains. All fields have
//! sensible defaults.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Top-level configuration for a Relay runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Capacity of each request's bounded event channel.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// The completion backend used for plain turns.
    #[serde(default)]
    pub adapter: AdapterConfig,

    /// Remote endpoints that expose actions and agents.
    #[serde(default)]
    pub remote_endpoints: Vec<RemoteEndpointConfig>,

    /// Remote chain services exposed as single actions.
    #[serde(default)]
    pub chains: Vec<ChainConfig>,
}

fn default_event_channel_capacity() -> usize {
    256
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
            adapter: AdapterConfig::default(),
            remote_endpoints: Vec::new(),
            chains: Vec::new(),
        }
    }
}

/// Known OpenAI-compatible backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterProvider {
    #[default]
    #[serde(rename = "openai")]
    OpenAi,
    Unify,
    /// Any OpenAI-compatible endpoint; requires `base_url`.
    Custom,
}

impl fmt::Display for AdapterProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdapterProvider::OpenAi => write!(f, "openai"),
            AdapterProvider::Unify => write!(f, "unify"),
            AdapterProvider::Custom => write!(f, "custom"),
        }
    }
}

/// Configuration of the completion backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    #[serde(default)]
    pub provider: AdapterProvider,
    /// Model identifier sent with each request.
    #[serde(default = "default_model")]
    pub model: String,
    /// Override of the provider's default base URL.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            provider: AdapterProvider::default(),
            model: default_model(),
            base_url: None,
            api_key_env: default_api_key_env(),
        }
    }
}

/// A remote endpoint serving discoverable actions and agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteEndpointConfig {
    pub name: String,
    pub url: String,
    /// Extra headers sent with every request to the endpoint.
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

/// A remote chain service exposed as a single action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub name: String,
    pub description: String,
    pub url: String,
}
