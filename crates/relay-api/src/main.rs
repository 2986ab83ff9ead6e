//! Relay CLI and HTTP streaming server entry point.
//!
//! Binary name: `relay`
//!
//! Parses CLI arguments, loads the runtime configuration, then either prints
//! the resolved configuration or starts the SSE server.

mod cli;
mod http;
mod state;

use clap::Parser;

use relay_infra::config::{load_runtime_config, resolve_api_key};
use relay_observe::tracing_setup::{TracingOptions, init_tracing, shutdown_tracing};

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(&TracingOptions {
        default_directive: cli.default_directive().to_string(),
        json: cli.json_logs,
        enable_otel: cli.otel,
    })
    .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    let config = load_runtime_config(&cli.config).await;

    let result = match cli.command {
        Commands::CheckConfig => check_config(&cli, &config),
        Commands::Serve { port, ref host } => serve(&config, host, port).await,
    };

    shutdown_tracing();
    result
}

fn check_config(cli: &Cli, config: &relay_types::config::RuntimeConfig) -> anyhow::Result<()> {
    let check_mark = |ok: bool| {
        if ok {
            format!("{}", console::style("✓").green())
        } else {
            format!("{}", console::style("✗").red())
        }
    };

    println!();
    println!(
        "  Configuration from {}",
        console::style(cli.config.display()).cyan()
    );
    println!();
    println!(
        "  {} adapter: {} ({})",
        check_mark(true),
        config.adapter.provider,
        config.adapter.model
    );
    println!(
        "  {} API key in ${}",
        check_mark(resolve_api_key(&config.adapter).is_some()),
        config.adapter.api_key_env
    );
    for endpoint in &config.remote_endpoints {
        println!("  {} remote endpoint '{}' at {}", check_mark(true), endpoint.name, endpoint.url);
    }
    for chain in &config.chains {
        println!("  {} chain '{}' at {}", check_mark(true), chain.name, chain.url);
    }
    println!("  {} event channel capacity: {}", check_mark(true), config.event_channel_capacity);
    println!();

    // Building the state validates the adapter and every endpoint.
    AppState::init(config)?;
    Ok(())
}

async fn serve(config: &relay_types::config::RuntimeConfig, host: &str, port: u16) -> anyhow::Result<()> {
    let state = AppState::init(config)?;

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!(
        "  {} Relay listening on {}",
        console::style("⚡").bold(),
        console::style(format!("http://{addr}")).cyan()
    );
    println!("  {}", console::style("Press Ctrl+C to stop").dim());

    let router = http::router::build_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    println!("\n  Server stopped.");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
