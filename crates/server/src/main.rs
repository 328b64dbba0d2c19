mod api;
mod metrics;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use steward_core::{
    load_config, validate_config, HttpTrackerSource, LabelPolicy, ReconciliationLoop,
    TorrentClient, TrackerCatalogue, TransmissionClient,
};

use api::create_router;
use state::AppState;

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
    let config_path = std::env::var("STEWARD_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Tracker catalogue: {}", config.catalogue.url);
    info!("Label rules: {}", config.labels.len());

    // Create tracker catalogue
    let source = HttpTrackerSource::new(
        config.catalogue.url.clone(),
        Duration::from_millis(config.catalogue.fetch_timeout_ms),
    )
    .context("Failed to create tracker list client")?;
    let catalogue = Arc::new(TrackerCatalogue::from_config(
        Arc::new(source),
        &config.catalogue,
    ));

    // Create torrent client if configured
    let torrent_client: Option<Arc<dyn TorrentClient>> = match &config.transmission {
        Some(tr_config) => {
            info!("Initializing Transmission client at {}", tr_config.url);
            Some(Arc::new(
                TransmissionClient::new(tr_config.clone())
                    .context("Failed to create Transmission client")?,
            ))
        }
        None => {
            info!("No torrent client configured");
            None
        }
    };

    // Create reconciliation loop if enabled
    let reconciler = match (&torrent_client, config.reconciler.enabled) {
        (Some(client), true) => {
            info!("Initializing reconciliation loop");
            Some(Arc::new(ReconciliationLoop::new(
                config.reconciler.clone(),
                Duration::from_secs(config.catalogue.refresh_interval_secs),
                Arc::clone(client),
                Arc::clone(&catalogue),
                LabelPolicy::from_config(&config.labels),
            )))
        }
        (Some(_), false) => {
            info!("Reconciler disabled in config");
            None
        }
        (None, _) => {
            warn!("Reconciliation disabled: no torrent client configured");
            None
        }
    };

    // Start in the background; the initial catalogue fetch may take a while
    let starter = reconciler.clone().map(|reconciler| {
        tokio::spawn(async move {
            reconciler.start().await;
        })
    });

    // Create app state
    let state = Arc::new(AppState::new(
        config.clone(),
        Arc::clone(&catalogue),
        reconciler.clone(),
    ));

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

    // Stop reconciliation loop if running
    info!("Server shutting down...");
    if let Some(starter) = starter {
        if let Err(e) = starter.await {
            error!("Reconciliation loop failed to start: {}", e);
        }
    }
    if let Some(ref reconciler) = reconciler {
        info!("Stopping reconciliation loop...");
        reconciler.stop().await;
    }

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
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
