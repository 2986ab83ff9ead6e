//! Request lifecycle hooks.

use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use relay_types::error::HookError;
use relay_types::message::Message;
use relay_types::request::Properties;

/// Passed to the before-request hook.
#[derive(Debug, Clone)]
pub struct BeforeRequestOptions {
    pub thread_id: Option<String>,
    pub run_id: Option<String>,
    pub input_messages: Vec<Message>,
    pub properties: Properties,
}

/// Passed to the after-request hook once the output messages are known.
#[derive(Debug, Clone)]
pub struct AfterRequestOptions {
    pub thread_id: String,
    pub run_id: Option<String>,
    pub input_messages: Vec<Message>,
    pub output_messages: Vec<Message>,
    pub properties: Properties,
}

pub type BeforeRequestHook =
    Arc<dyn Fn(BeforeRequestOptions) -> BoxFuture<'static, Result<(), HookError>> + Send + Sync>;

pub type AfterRequestHook =
    Arc<dyn Fn(AfterRequestOptions) -> BoxFuture<'static, Result<(), HookError>> + Send + Sync>;

/// Optional hooks run around every request.
///
/// A before-hook error aborts the request. An after-hook error is only
/// reported to the observer.
#[derive(Clone, Default)]
pub struct Middleware {
    pub(crate) before: Option<BeforeRequestHook>,
    pub(crate) after: Option<AfterRequestHook>,
}

impl Middleware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_before_request<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(BeforeRequestOptions) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HookError>> + Send + 'static,
    {
        self.before = Some(Arc::new(move |options| hook(options).boxed()));
        self
    }

    pub fn on_after_request<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(AfterRequestOptions) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), HookError>> + Send + 'static,
    {
        self.after = Some(Arc::new(move |options| hook(options).boxed()));
        self
    }

    pub(crate) async fn before_request(&self, options: BeforeRequestOptions) -> Result<(), HookError> {
        match &self.before {
            Some(hook) => hook(options).await,
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Middleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Middleware")
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> BeforeRequestOptions {
        BeforeRequestOptions {
            thread_id: None,
            run_id: None,
            input_messages: vec![],
            properties: Properties::new(),
        }
    }

    #[tokio::test]
    async fn missing_before_hook_succeeds() {
        assert!(Middleware::new().before_request(options()).await.is_ok());
    }

    #[tokio::test]
    async fn before_hook_error_is_returned() {
        let middleware = Middleware::new().on_before_request(|_| async { Err(HookError::new("denied")) });
        let err = middleware.before_request(options()).await.unwrap_err();
        assert_eq!(err.message, "denied");
    }
}
