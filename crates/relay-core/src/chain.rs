//! Chain sources: remote services exposed as a single action.
//!
//! A chain's action has to be loaded (its schema fetched) before it can be
//! offered. Loading happens at most once per runtime: [`SharedChain`] wraps
//! the load in a shared future that every request awaits.

use std::future::Future;

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use relay_types::error::ChainError;

use crate::action::Action;
use crate::observer::{RuntimeObserver, RuntimeWarning};

/// Something that can produce an [`Action`] asynchronously.
pub trait ChainSource: Send + Sync {
    fn name(&self) -> &str;

    fn load(&self) -> impl Future<Output = Result<Action, ChainError>> + Send;
}

/// A chain whose load result is computed once and shared.
#[derive(Clone)]
pub struct SharedChain {
    name: String,
    resolution: Shared<BoxFuture<'static, Result<Action, ChainError>>>,
}

impl SharedChain {
    /// Wrap a chain source. Loading starts the first time it is awaited.
    pub fn new<C: ChainSource + 'static>(source: C) -> Self {
        let name = source.name().to_string();
        let resolution = async move { source.load().await }.boxed().shared();
        Self { name, resolution }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Await the shared load result.
    pub async fn resolve(&self) -> Result<Action, ChainError> {
        self.resolution.clone().await
    }
}

impl std::fmt::Debug for SharedChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedChain")
            .field("name", &self.name)
            .field("resolved", &self.resolution.peek().is_some())
            .finish()
    }
}

/// Resolve every chain concurrently, dropping failures.
///
/// Each failure is reported to the observer. Order follows `chains`.
pub async fn resolve_chains(chains: &[SharedChain], observer: &dyn RuntimeObserver) -> Vec<Action> {
    let results = futures_util::future::join_all(chains.iter().map(SharedChain::resolve)).await;
    results
        .into_iter()
        .filter_map(|result| match result {
            Ok(action) => Some(action),
            Err(error) => {
                observer.warn(RuntimeWarning::ChainResolutionFailed { error });
                None
            }
        })
        .collect()
}
