//! # Outbound Sync Scheduler
//!
//! Periodically exports unsynced node rows to the remote aggregator, and
//! runs one final bounded export at shutdown.
//!
//! ## Export Cycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SyncScheduler cycle                              │
//! │                                                                         │
//! │  interval tick (or shutdown)                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. snapshot = nodes.unsynced()      ← taken first; no store handle    │
//! │       │                                 is held across the network     │
//! │       ├── empty? log + done                                            │
//! │       ▼                                                                 │
//! │  2. POST snapshot to aggregator                                        │
//! │       │                                                                 │
//! │       ├── HTTP 200 ──► 3. nodes.mark_synced(snapshot)                  │
//! │       │                   (revision-guarded: rows written after the    │
//! │       │                    snapshot stay unsynced)                     │
//! │       │                                                                 │
//! │       └── anything else ──► leave batch unsynced, log, retry next      │
//! │                             tick (plus whatever is newly unsynced)     │
//! │                                                                         │
//! │  No endpoint configured ⇒ the scheduler is a configuration no-op.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use mesh_db::Database;

use crate::error::{SyncError, SyncResult};
use crate::uplink::UplinkClient;

// =============================================================================
// Scheduler
// =============================================================================

/// Periodic exporter of unsynced node state.
pub struct SyncScheduler {
    /// Store handle.
    db: Database,

    /// Uplink client; `None` disables the scheduler entirely.
    uplink: Option<UplinkClient>,

    /// Interval between export cycles.
    interval: Duration,

    /// Bound on the final export during shutdown.
    shutdown_timeout: Duration,

    /// Shutdown receiver.
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle for stopping the scheduler.
#[derive(Clone)]
pub struct SyncSchedulerHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl SyncSchedulerHandle {
    /// Triggers the final export pass and graceful shutdown.
    pub async fn shutdown(&self) -> SyncResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| SyncError::ChannelClosed)
    }
}

impl SyncScheduler {
    /// Creates a scheduler and its handle. Pass `None` for `uplink` when
    /// no aggregator endpoint is configured.
    pub fn new(
        db: Database,
        uplink: Option<UplinkClient>,
        interval: Duration,
        shutdown_timeout: Duration,
    ) -> (Self, SyncSchedulerHandle) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let scheduler = SyncScheduler {
            db,
            uplink,
            interval,
            shutdown_timeout,
            shutdown_rx,
        };
        let handle = SyncSchedulerHandle { shutdown_tx };

        (scheduler, handle)
    }

    /// Runs the export loop. Spawn as a background task.
    pub async fn run(mut self) {
        let Some(uplink) = self.uplink.take() else {
            info!("No aggregator endpoint configured; outbound sync disabled");
            return;
        };

        info!(
            endpoint = %uplink.endpoint(),
            interval_secs = self.interval.as_secs(),
            "Sync scheduler starting"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = Self::run_once(&self.db, &uplink).await {
                        warn!(error = %e, "Export failed; batch left unsynced for retry");
                    }
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Sync scheduler shutting down; running final export");
                    match tokio::time::timeout(
                        self.shutdown_timeout,
                        Self::run_once(&self.db, &uplink),
                    )
                    .await
                    {
                        Ok(Ok(_)) => {}
                        Ok(Err(e)) => warn!(error = %e, "Final export failed"),
                        Err(_) => warn!(
                            timeout_secs = self.shutdown_timeout.as_secs(),
                            "Final export timed out; shutting down regardless"
                        ),
                    }
                    break;
                }
            }
        }

        info!("Sync scheduler stopped");
    }

    /// One export cycle: snapshot, push, mark. Returns how many rows were
    /// marked synced.
    pub async fn run_once(db: &Database, uplink: &UplinkClient) -> SyncResult<usize> {
        let snapshot = db.nodes().unsynced().await?;
        if snapshot.is_empty() {
            debug!("No unsynced nodes; skipping export");
            return Ok(0);
        }

        // Snapshot is in hand; the network call below holds nothing on the
        // store, so the reconciler keeps writing freely while we wait.
        uplink.push(&snapshot).await?;

        let marked = db.nodes().mark_synced(&snapshot).await?;
        info!(exported = snapshot.len(), marked, "Exported node state to aggregator");

        Ok(marked)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use chrono::Utc;
    use std::sync::{Arc, Mutex};
    use url::Url;

    use mesh_core::NodeUpdate;
    use mesh_db::DbConfig;

    #[derive(Clone, Default)]
    struct FakeAggregator {
        bodies: Arc<Mutex<Vec<serde_json::Value>>>,
        status: StatusCode,
    }

    async fn receive(
        State(state): State<FakeAggregator>,
        Json(body): Json<serde_json::Value>,
    ) -> StatusCode {
        state.bodies.lock().unwrap().push(body);
        state.status
    }

    /// Binds a fake aggregator on an ephemeral port and returns its URL.
    async fn fake_aggregator(status: StatusCode) -> (Url, FakeAggregator) {
        let state = FakeAggregator {
            bodies: Arc::new(Mutex::new(Vec::new())),
            status,
        };

        let app = Router::new()
            .route("/sync", post(receive))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let url = Url::parse(&format!("http://{addr}/sync")).unwrap();
        (url, state)
    }

    async fn db_with_unsynced(node_ids: &[&str]) -> Database {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        for node_id in node_ids {
            let mut update = NodeUpdate::new(Utc::now());
            update.voltage = Some(3.7);
            db.nodes().apply_update(node_id, &update).await.unwrap();
        }
        db
    }

    #[tokio::test]
    async fn test_successful_export_marks_batch_synced() {
        let db = db_with_unsynced(&["!a", "!b"]).await;
        let (url, aggregator) = fake_aggregator(StatusCode::OK).await;
        let uplink = UplinkClient::new(url);

        let marked = SyncScheduler::run_once(&db, &uplink).await.unwrap();

        assert_eq!(marked, 2);
        assert!(db.nodes().unsynced().await.unwrap().is_empty());
        assert_eq!(aggregator.bodies.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rejected_export_leaves_batch_unsynced() {
        let db = db_with_unsynced(&["!a"]).await;
        let (url, _aggregator) = fake_aggregator(StatusCode::INTERNAL_SERVER_ERROR).await;
        let uplink = UplinkClient::new(url);

        let result = SyncScheduler::run_once(&db, &uplink).await;

        assert!(matches!(result, Err(SyncError::Rejected { status: 500 })));
        assert_eq!(db.nodes().unsynced().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_leaves_batch_unsynced() {
        let db = db_with_unsynced(&["!a"]).await;
        // nothing listens here
        let uplink = UplinkClient::new(Url::parse("http://127.0.0.1:1/sync").unwrap());

        let result = SyncScheduler::run_once(&db, &uplink).await;

        assert!(matches!(result, Err(SyncError::Transport(_))));
        assert_eq!(db.nodes().unsynced().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_batch_is_a_no_op() {
        let db = db_with_unsynced(&[]).await;
        let (url, aggregator) = fake_aggregator(StatusCode::OK).await;
        let uplink = UplinkClient::new(url);

        let marked = SyncScheduler::run_once(&db, &uplink).await.unwrap();

        assert_eq!(marked, 0);
        assert!(aggregator.bodies.lock().unwrap().is_empty(), "no request expected");
    }

    #[tokio::test]
    async fn test_payload_excludes_internal_bookkeeping() {
        let db = db_with_unsynced(&["!a"]).await;
        let (url, aggregator) = fake_aggregator(StatusCode::OK).await;
        let uplink = UplinkClient::new(url);

        SyncScheduler::run_once(&db, &uplink).await.unwrap();

        let bodies = aggregator.bodies.lock().unwrap();
        let entries = bodies[0].as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["node_id"], "!a");
        assert_eq!(entries[0]["voltage"], 3.7);
        assert!(entries[0].get("synced").is_none());
        assert!(entries[0].get("revision").is_none());
    }

    #[tokio::test]
    async fn test_row_mutated_during_export_stays_unsynced() {
        let db = db_with_unsynced(&["!a"]).await;
        let (url, _aggregator) = fake_aggregator(StatusCode::OK).await;
        let uplink = UplinkClient::new(url);

        // simulate the race: snapshot, then a reconciler write, then push+mark
        let snapshot = db.nodes().unsynced().await.unwrap();
        let mut update = NodeUpdate::new(Utc::now());
        update.voltage = Some(3.5);
        db.nodes().apply_update("!a", &update).await.unwrap();

        uplink.push(&snapshot).await.unwrap();
        let marked = db.nodes().mark_synced(&snapshot).await.unwrap();

        assert_eq!(marked, 0);
        assert_eq!(db.nodes().unsynced().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_scheduler_exits_immediately() {
        let db = db_with_unsynced(&["!a"]).await;
        let (scheduler, _handle) = SyncScheduler::new(
            db.clone(),
            None,
            Duration::from_secs(60),
            Duration::from_secs(5),
        );

        // returns without ticking; nothing was exported or marked
        scheduler.run().await;
        assert_eq!(db.nodes().unsynced().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_runs_final_export() {
        let db = db_with_unsynced(&["!a"]).await;
        let (url, _aggregator) = fake_aggregator(StatusCode::OK).await;

        let (scheduler, handle) = SyncScheduler::new(
            db.clone(),
            Some(UplinkClient::new(url)),
            // long interval: only the shutdown flush can explain the export
            Duration::from_secs(3600),
            Duration::from_secs(5),
        );

        let task = tokio::spawn(scheduler.run());
        // the first tick fires immediately; wait for it to complete, then
        // queue more work that only the final flush can pick up
        tokio::time::sleep(Duration::from_millis(200)).await;
        let mut update = NodeUpdate::new(Utc::now());
        update.temperature = Some(19.0);
        db.nodes().apply_update("!b", &update).await.unwrap();

        handle.shutdown().await.unwrap();
        task.await.unwrap();

        assert!(db.nodes().unsynced().await.unwrap().is_empty());
    }
}
