//! # Collector Daemon
//!
//! Startup, task wiring, and graceful shutdown for the mesh telemetry
//! collector.

use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use url::Url;

use mesh_collector::config::{self, CollectorConfig};
use mesh_collector::http::{self, AppState};
use mesh_collector::source;
use mesh_core::BaseLocation;
use mesh_db::{Database, DbConfig};
use mesh_ingest::{IngestWorker, Reconciler, ReconcilerSettings};
use mesh_sync::{SyncScheduler, UplinkClient};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting mesh telemetry collector...");

    // Load configuration; any violation here is fatal
    let config_path = config::config_path();
    let config = CollectorConfig::load(&config_path)?;
    info!(
        path = %config_path.display(),
        db = %config.database.path.display(),
        timezone = %config.display.timezone,
        "Configuration loaded"
    );

    let base = BaseLocation {
        latitude: config.base.latitude,
        longitude: config.base.longitude,
    };

    // Open the store (creates the file and runs migrations)
    let db = Database::new(DbConfig::new(&config.database.path)).await?;
    info!("Store ready");

    // Write path: reconciler behind the single-consumer ingest worker
    let reconciler = Reconciler::new(
        db.clone(),
        base,
        ReconcilerSettings {
            temperature_unit: config.ingest.temperature_unit,
        },
    );
    let (worker, ingest) = IngestWorker::new(reconciler);
    let ingest_task = tokio::spawn(worker.run());

    // Transport stand-in: decoded events as NDJSON on stdin
    let source_task = tokio::spawn(source::run_stdin_source(ingest.clone()));

    // Export path: periodic uplink to the aggregator, if configured
    let uplink = match &config.uplink {
        Some(section) => Some(UplinkClient::new(Url::parse(&section.endpoint)?)),
        None => None,
    };
    let (interval, shutdown_timeout) = config
        .uplink
        .as_ref()
        .map(|s| (s.interval(), s.shutdown_timeout()))
        .unwrap_or_default();
    let (scheduler, sync) = SyncScheduler::new(db.clone(), uplink, interval, shutdown_timeout);
    let sync_task = tokio::spawn(scheduler.run());

    // Read path: HTTP API
    let state = AppState {
        db: db.clone(),
        base,
        radius_miles: config.base.radius_miles,
    };
    let app = http::router(state);
    let listener = tokio::net::TcpListener::bind(config.http.bind_address()).await?;
    info!(addr = %listener.local_addr()?, "HTTP API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Ordered shutdown: stop accepting events, drain what was accepted,
    // run the final bounded export, then release the store.
    info!("Shutting down: draining ingestion and flushing export");
    source_task.abort();
    let _ = ingest.shutdown().await;
    let _ = ingest_task.await;
    let _ = sync.shutdown().await;
    let _ = sync_task.await;
    db.close().await;

    info!("Collector shutdown complete");
    Ok(())
}

/// Resolves when the process receives ctrl-c.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
    }
}
