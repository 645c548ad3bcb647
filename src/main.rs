//! isstrack Binary Entry Point
//!
//! This binary runs the complete ISS tracking service.
//! Core functionality is provided by the `isstrack` library crate.

use clap::Parser;
use isstrack::{
    config::{AppConfig, parse_duration},
    engine::Tracker,
    server::{AppState, create_router},
    source::HttpSource,
    storage::StorageBuilder,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// isstrack - ISS position ingestion, retention and query service
#[derive(Parser, Debug)]
#[command(name = "isstrack", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        default_value = isstrack::config::DEFAULT_CONFIG_PATH,
        env = "ISSTRACK_CONFIG"
    )]
    config: String,

    /// Server bind address (overrides config file)
    #[arg(long, env = "ISSTRACK_SERVER_BIND")]
    server_bind: Option<String>,

    /// Server port (overrides config file)
    #[arg(long, env = "ISSTRACK_SERVER_PORT")]
    server_port: Option<u16>,

    /// Database URL (overrides config file)
    #[arg(long, env = "ISSTRACK_DB_URL")]
    db_url: Option<String>,

    /// Upstream snapshot URL (overrides config file)
    #[arg(long, env = "ISSTRACK_SOURCE_URL")]
    source_url: Option<String>,

    /// Maximum readings kept (overrides config file)
    #[arg(long, env = "ISSTRACK_MAX_RECORDS")]
    max_records: Option<u64>,

    /// Sample interval, e.g. "60s" (overrides config file)
    #[arg(long, env = "ISSTRACK_SAMPLE_INTERVAL", value_parser = parse_duration)]
    sample_interval: Option<Duration>,

    /// Trim interval, e.g. "30m" (overrides config file)
    #[arg(long, env = "ISSTRACK_TRIM_INTERVAL", value_parser = parse_duration)]
    trim_interval: Option<Duration>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,isstrack=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("isstrack - ISS position tracker");

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration from file
    tracing::info!("Loading configuration from: {}", cli.config);
    let mut config = AppConfig::load_or_default(&cli.config)?;

    // Apply CLI/env overrides (CLI > ENV > config file)
    if let Some(bind) = cli.server_bind {
        config.server.bind = bind;
    }
    if let Some(port) = cli.server_port {
        config.server.port = port;
    }
    if let Some(url) = cli.db_url {
        config.database.url = isstrack::config::expand_env_vars(&url);
    }
    if let Some(url) = cli.source_url {
        config.source.url = url;
    }
    if let Some(max_records) = cli.max_records {
        config.retention.max_records = max_records;
    }
    if let Some(interval) = cli.sample_interval {
        config.sampler.interval = interval;
    }
    if let Some(interval) = cli.trim_interval {
        config.retention.interval = interval;
    }
    config.validate()?;

    tracing::info!(
        bind = %config.server.bind,
        port = config.server.port,
        source = %config.source.url,
        max_records = config.retention.max_records,
        sample_interval = ?config.sampler.interval,
        trim_interval = ?config.retention.interval,
        "Configuration loaded"
    );

    // Build storage layer; failure here is the only fatal store condition
    tracing::info!("Initializing storage at: {}", config.database.url);
    let handles = StorageBuilder::new(&config.database.url)
        .max_connections(config.database.max_connections)
        .build()
        .await?;
    tracing::info!("Storage initialized");

    // Wire and start the engine
    let source = Arc::new(HttpSource::new(config.source.clone())?);
    let mut tracker = Tracker::new(source, Arc::clone(&handles.store), config.tracker_options());
    tracker.start()?;

    // Create web server state
    let app_state = AppState {
        query: tracker.query(),
        sampler: Arc::clone(tracker.sampler()),
    };

    // Build Axum router
    let app = create_router(app_state);

    // Parse bind address
    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port).parse()?;

    tracing::info!("Web server listening on: http://{}", addr);
    tracing::info!("Press Ctrl+C to shutdown");

    // Start server with graceful shutdown
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(tracker))
        .await?;

    // In-flight requests have drained; the pool can close now.
    tracing::info!("Shutting down storage...");
    if let Err(e) = handles.shutdown().await {
        tracing::error!("Failed to shutdown storage: {}", e);
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Setup graceful shutdown signal handler.
async fn shutdown_signal(tracker: Tracker) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal");
        }
    }

    tracing::info!("Stopping sampler and trimmer...");
    if let Err(e) = tracker.shutdown().await {
        tracing::error!("Failed to stop scheduler: {}", e);
    }
}
