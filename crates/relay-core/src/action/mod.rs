//! Server-side actions and the providers that supply them.
//!
//! An [`Action`] is a named, described, parameterised callable. Actions come
//! from several sources (configured, chain-derived, remotely discovered) and
//! are merged into one list per request by [`merge::merge_actions`].

pub mod merge;

use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use relay_types::action::{ActionDescriptor, Parameter, parameters_to_json_schema};
use relay_types::error::ActionError;
use relay_types::request::Properties;
use serde_json::Value;

pub use merge::{flatten_no_duplicates, merge_actions};

/// Boxed future returned by an action handler.
pub type ActionFuture = BoxFuture<'static, Result<Value, ActionError>>;

/// Type-erased action handler.
pub type ActionHandler = Arc<dyn Fn(Value) -> ActionFuture + Send + Sync>;

/// A callable action exposed to the backend.
#[derive(Clone)]
pub struct Action {
    pub name: String,
    pub description: String,
    pub parameters: Vec<Parameter>,
    handler: ActionHandler,
}

impl Action {
    pub fn new<F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Vec<Parameter>,
        handler: F,
    ) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ActionError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: Arc::new(move |arguments| handler(arguments).boxed()),
        }
    }

    /// The handler-less descriptor sent to backends.
    pub fn descriptor(&self) -> ActionDescriptor {
        ActionDescriptor::new(
            self.name.clone(),
            self.description.clone(),
            parameters_to_json_schema(&self.parameters),
        )
    }

    /// Run the handler with already-parsed arguments.
    pub async fn execute(&self, arguments: Value) -> Result<Value, ActionError> {
        tracing::debug!(action = %self.name, "executing action");
        (self.handler)(arguments).await
    }
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters.len())
            .finish()
    }
}

/// Supplies the configured actions for a request.
///
/// Invoked once per request with that request's properties; never cached.
/// A fixed list is a provider that ignores its input.
#[derive(Clone)]
pub struct ActionsProvider {
    resolve: Arc<dyn Fn(&Properties) -> Vec<Action> + Send + Sync>,
}

impl ActionsProvider {
    /// The same actions for every request.
    pub fn fixed(actions: Vec<Action>) -> Self {
        Self::dynamic(move |_| actions.clone())
    }

    /// Actions computed from each request's properties.
    pub fn dynamic<F>(resolve: F) -> Self
    where
        F: Fn(&Properties) -> Vec<Action> + Send + Sync + 'static,
    {
        Self {
            resolve: Arc::new(resolve),
        }
    }

    pub fn resolve(&self, properties: &Properties) -> Vec<Action> {
        (self.resolve)(properties)
    }
}

impl Default for ActionsProvider {
    fn default() -> Self {
        Self::fixed(Vec::new())
    }
}

impl std::fmt::Debug for ActionsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionsProvider").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn echo(name: &str) -> Action {
        Action::new(
            name,
            "Echo the arguments back",
            vec![Parameter::string("text", "Text to echo")],
            |arguments| async move { Ok(arguments) },
        )
    }

    #[tokio::test]
    async fn test_execute_calls_handler() {
        let action = echo("echo");
        let result = action.execute(json!({"text": "hi"})).await.unwrap();
        assert_eq!(result, json!({"text": "hi"}));
    }

    #[tokio::test]
    async fn test_execute_propagates_handler_error() {
        let action = Action::new("fail", "Always fails", vec![], |_| async {
            Err(ActionError::Execution {
                name: "fail".to_string(),
                message: "boom".to_string(),
            })
        });
        let err = action.execute(json!({})).await.unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_descriptor_carries_schema() {
        let descriptor = echo("echo").descriptor();
        assert_eq!(descriptor.name, "echo");
        assert_eq!(descriptor.json_schema["properties"]["text"]["type"], "string");
        assert_eq!(descriptor.json_schema["required"], json!(["text"]));
    }

    #[test]
    fn test_fixed_provider_ignores_properties() {
        let provider = ActionsProvider::fixed(vec![echo("a"), echo("b")]);
        let mut props = Properties::new();
        props.insert("tenant".to_string(), json!("acme"));

        let names: Vec<String> = provider.resolve(&props).into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_dynamic_provider_reads_properties() {
        let provider = ActionsProvider::dynamic(|props| {
            if props.get("admin") == Some(&json!(true)) {
                vec![echo("delete_user")]
            } else {
                vec![]
            }
        });

        assert!(provider.resolve(&Properties::new()).is_empty());

        let mut props = Properties::new();
        props.insert("admin".to_string(), json!(true));
        assert_eq!(provider.resolve(&props)[0].name, "delete_user");
    }
}
