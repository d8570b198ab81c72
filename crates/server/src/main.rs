use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use transfer_relay_core::{
    create_result_sink, load_config, validate_config, BlackholeWatcher, HttpMetainfoFetcher,
    InfoHashResolver, PutioClient, RemoteService, RpcAdapter, SanitizedConfig,
    TransferOrchestrator,
};
use transfer_relay_server::{api::create_router, state::AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("RELAY_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let sanitized = SanitizedConfig::from(&config);
    info!(
        "Configuration loaded successfully: {}",
        serde_json::to_string(&sanitized).unwrap_or_default()
    );

    // Remote transfer service
    let remote: Arc<dyn RemoteService> = Arc::new(
        PutioClient::new(config.putio.clone()).context("Failed to create put.io client")?,
    );
    info!("Using remote service {} at {}", remote.name(), config.putio.api_url);

    // Info-hash resolver, shared by the orchestrator and the RPC adapter
    let fetcher = Arc::new(
        HttpMetainfoFetcher::new(Duration::from_secs(u64::from(config.putio.timeout_secs)))
            .context("Failed to create metainfo fetcher")?,
    );
    let resolver = Arc::new(InfoHashResolver::new(fetcher));

    // Result sink
    let (results, result_logger) = create_result_sink(config.orchestrator.result_buffer);
    let logger_handle = tokio::spawn(result_logger.run());

    let orchestrator = TransferOrchestrator::new(
        config.orchestrator.clone(),
        Arc::clone(&remote),
        resolver,
        results,
    );
    if config.orchestrator.max_concurrent_transfers == 0 {
        info!("No limit on concurrent transfers");
    } else {
        info!(
            "At most {} concurrent transfers",
            config.orchestrator.max_concurrent_transfers
        );
    }

    // Blackhole watcher; a missing watch directory is fatal
    let watcher_handle = BlackholeWatcher::new(config.blackhole.clone(), orchestrator.clone())
        .start()
        .context("Failed to start blackhole watcher")?;

    // Create app state
    let adapter = RpcAdapter::new(remote, orchestrator, config.blackhole.download_dir.clone());
    let state = Arc::new(AppState::new(sanitized, adapter));

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    watcher_handle.abort();
    // In-flight submissions hold result handles, so the logger is not awaited.
    logger_handle.abort();

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
