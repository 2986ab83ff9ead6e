//! Application state shared across HTTP handlers.

use std::sync::Arc;

use relay_core::adapter::BoxServiceAdapter;
use relay_core::runtime::{AfterRequestOptions, BeforeRequestOptions, Middleware, Runtime};
use relay_infra::config::resolve_api_key;
use relay_infra::llm::create_service_adapter;
use relay_infra::remote::{HttpRemoteEndpoint, RemoteChain};
use relay_types::config::RuntimeConfig;

/// Shared state: the runtime and the adapter that serves plain turns.
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<Runtime>,
    pub service_adapter: Arc<BoxServiceAdapter>,
}

impl AppState {
    /// Build the runtime and adapter from configuration.
    pub fn init(config: &RuntimeConfig) -> anyhow::Result<Self> {
        let api_key = resolve_api_key(&config.adapter);
        let service_adapter = create_service_adapter(&config.adapter, api_key)?;

        let mut builder = Runtime::builder()
            .event_channel_capacity(config.event_channel_capacity)
            .middleware(logging_middleware());

        for endpoint in &config.remote_endpoints {
            builder = builder.remote_endpoint(HttpRemoteEndpoint::new(endpoint)?);
        }
        for chain in &config.chains {
            builder = builder.chain(RemoteChain::new(chain)?);
        }

        tracing::info!(
            adapter = %service_adapter.name(),
            remote_endpoints = config.remote_endpoints.len(),
            chains = config.chains.len(),
            "runtime initialized"
        );

        Ok(Self::new(builder.build(), service_adapter))
    }

    pub fn new(runtime: Runtime, service_adapter: BoxServiceAdapter) -> Self {
        Self {
            runtime: Arc::new(runtime),
            service_adapter: Arc::new(service_adapter),
        }
    }
}

/// Request lifecycle hooks that only log.
fn logging_middleware() -> Middleware {
    Middleware::new()
        .on_before_request(|options: BeforeRequestOptions| async move {
            tracing::debug!(
                thread_id = ?options.thread_id,
                run_id = ?options.run_id,
                messages = options.input_messages.len(),
                "request accepted"
            );
            Ok(())
        })
        .on_after_request(|options: AfterRequestOptions| async move {
            tracing::info!(
                thread_id = %options.thread_id,
                input_messages = options.input_messages.len(),
                output_messages = options.output_messages.len(),
                "request finished"
            );
            Ok(())
        })
}
