//! Remote chains served LangServe-style.
//!
//! The chain's input schema is fetched once from `GET {url}/input_schema`
//! and turned into the action's parameters. Invocation posts to
//! `{url}/invoke` and returns the response's `output`.

use std::time::Duration;

use serde_json::Value;

use relay_core::action::Action;
use relay_core::chain::ChainSource;
use relay_types::action::{Parameter, ParameterType};
use relay_types::config::ChainConfig;
use relay_types::error::{ActionError, ChainError};

use super::types::{InvokeRequest, InvokeResponse};

/// Name of the parameter used when the schema is not an object.
const SINGLE_INPUT: &str = "input";

/// A chain reached over HTTP.
pub struct RemoteChain {
    name: String,
    description: String,
    url: String,
    client: reqwest::Client,
}

impl RemoteChain {
    pub fn new(config: &ChainConfig) -> Result<Self, ChainError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| ChainError::Load {
                name: config.name.clone(),
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            name: config.name.clone(),
            description: config.description.clone(),
            url: config.url.trim_end_matches('/').to_string(),
            client,
        })
    }

    async fn fetch_schema(&self) -> Result<Value, ChainError> {
        let load_error = |message: String| ChainError::Load {
            name: self.name.clone(),
            message,
        };

        let response = self
            .client
            .get(format!("{}/input_schema", self.url))
            .send()
            .await
            .map_err(|e| load_error(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(load_error(format!("HTTP {status}")));
        }

        response.json().await.map_err(|e| ChainError::InvalidSchema {
            name: self.name.clone(),
            message: e.to_string(),
        })
    }
}

impl ChainSource for RemoteChain {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self) -> Result<Action, ChainError> {
        let schema = self.fetch_schema().await?;
        let parameters = schema_parameters(&schema);
        let single_input = !is_object_schema(&schema);

        tracing::info!(chain = %self.name, parameters = parameters.len(), "chain loaded");

        let client = self.client.clone();
        let url = format!("{}/invoke", self.url);
        let name = self.name.clone();
        Ok(Action::new(
            self.name.clone(),
            self.description.clone(),
            parameters,
            move |arguments: Value| {
                let client = client.clone();
                let url = url.clone();
                let name = name.clone();
                let input = chain_input(arguments, single_input);
                async move {
                    invoke(&client, &url, input)
                        .await
                        .map_err(|message| ActionError::Execution { name, message })
                }
            },
        ))
    }
}

async fn invoke(client: &reqwest::Client, url: &str, input: Value) -> Result<Value, String> {
    let response = client
        .post(url)
        .json(&InvokeRequest { input })
        .send()
        .await
        .map_err(|e| e.to_string())?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(format!("HTTP {status}: {body}"));
    }

    let body: InvokeResponse = response.json().await.map_err(|e| e.to_string())?;
    Ok(body.output)
}

/// Unwrap the `input` argument of a single-input chain.
fn chain_input(arguments: Value, single_input: bool) -> Value {
    if !single_input {
        return arguments;
    }
    match arguments {
        Value::Object(mut map) => map.remove(SINGLE_INPUT).unwrap_or(Value::Null),
        other => other,
    }
}

fn is_object_schema(schema: &Value) -> bool {
    schema["type"] == "object" && schema["properties"].as_object().is_some_and(|p| !p.is_empty())
}

/// Derive action parameters from a JSON schema.
///
/// Object schemas contribute one parameter per property, required when
/// listed in `required`. Anything else becomes a single required `input`.
pub fn schema_parameters(schema: &Value) -> Vec<Parameter> {
    if !is_object_schema(schema) {
        return vec![Parameter {
            name: SINGLE_INPUT.to_string(),
            kind: parameter_type(schema),
            description: Some(
                describe(schema).unwrap_or_else(|| "The input to the chain".to_string()),
            ),
            required: Some(true),
            ..Default::default()
        }];
    }

    let required: Vec<&str> = schema["required"]
        .as_array()
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    schema["properties"]
        .as_object()
        .map(|properties| {
            properties
                .iter()
                .map(|(name, property)| Parameter {
                    name: name.clone(),
                    kind: parameter_type(property),
                    description: describe(property),
                    required: Some(required.contains(&name.as_str())),
                    ..Default::default()
                })
                .collect()
        })
        .unwrap_or_default()
}

fn describe(schema: &Value) -> Option<String> {
    schema["description"]
        .as_str()
        .or_else(|| schema["title"].as_str())
        .map(str::to_string)
}

fn parameter_type(schema: &Value) -> ParameterType {
    match schema["type"].as_str() {
        Some("number" | "integer") => ParameterType::Number,
        Some("boolean") => ParameterType::Boolean,
        Some("object") => ParameterType::Object,
        Some("array") => match schema["items"]["type"].as_str() {
            Some("number" | "integer") => ParameterType::NumberArray,
            Some("boolean") => ParameterType::BooleanArray,
            Some("object") => ParameterType::ObjectArray,
            _ => ParameterType::StringArray,
        },
        _ => ParameterType::String,
    }
}
