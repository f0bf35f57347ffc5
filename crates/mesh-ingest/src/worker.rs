//! # Ingest Worker
//!
//! The single consumer of the inbound event stream. The transport pushes
//! decoded events into a channel; this worker drains it one event at a
//! time, which serializes all store writes and preserves arrival order -
//! the ordering guarantee the coalesce contract depends on.
//!
//! Modeled as a cancellable task with an explicit stop signal, not a
//! detached thread: shutdown drains whatever is already queued, then
//! exits.

use tokio::sync::mpsc;
use tracing::info;

use crate::error::{IngestError, IngestResult};
use crate::event::TelemetryEvent;
use crate::reconciler::Reconciler;

/// Buffered events tolerated before submitters are backpressured.
const EVENT_QUEUE_DEPTH: usize = 256;

// =============================================================================
// Worker
// =============================================================================

/// Owns the reconciler and the receiving half of the event channel.
pub struct IngestWorker {
    /// The write-path engine.
    reconciler: Reconciler,

    /// Inbound decoded events.
    event_rx: mpsc::Receiver<TelemetryEvent>,

    /// Shutdown signal.
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle for feeding and stopping the ingest worker.
#[derive(Clone)]
pub struct IngestHandle {
    event_tx: mpsc::Sender<TelemetryEvent>,
    shutdown_tx: mpsc::Sender<()>,
}

impl IngestHandle {
    /// Submits one decoded event for reconciliation.
    pub async fn submit(&self, event: TelemetryEvent) -> IngestResult<()> {
        self.event_tx
            .send(event)
            .await
            .map_err(|_| IngestError::ChannelClosed)
    }

    /// Signals the worker to drain and stop.
    pub async fn shutdown(&self) -> IngestResult<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| IngestError::ChannelClosed)
    }
}

impl IngestWorker {
    /// Creates a worker and its handle.
    pub fn new(reconciler: Reconciler) -> (Self, IngestHandle) {
        let (event_tx, event_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let worker = IngestWorker {
            reconciler,
            event_rx,
            shutdown_rx,
        };
        let handle = IngestHandle {
            event_tx,
            shutdown_tx,
        };

        (worker, handle)
    }

    /// Runs the ingestion loop. Spawn as a background task.
    pub async fn run(mut self) {
        info!("Ingest worker starting");

        loop {
            tokio::select! {
                Some(event) = self.event_rx.recv() => {
                    self.reconciler.reconcile(event).await;
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Ingest worker shutting down");
                    break;
                }
            }
        }

        // Events accepted before the stop signal still get applied.
        while let Ok(event) = self.event_rx.try_recv() {
            self.reconciler.reconcile(event).await;
        }

        info!("Ingest worker stopped");
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciler::ReconcilerSettings;
    use mesh_core::BaseLocation;
    use mesh_db::{Database, DbConfig};

    async fn worker() -> (IngestWorker, IngestHandle, Database) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let reconciler = Reconciler::new(
            db.clone(),
            BaseLocation {
                latitude: 43.6008608,
                longitude: -116.2750972,
            },
            ReconcilerSettings::default(),
        );
        let (worker, handle) = IngestWorker::new(reconciler);
        (worker, handle, db)
    }

    fn named_event(sender: &str, short_name: &str) -> TelemetryEvent {
        TelemetryEvent {
            sender_id: Some(sender.to_string()),
            short_name: Some(short_name.to_string()),
            ..TelemetryEvent::default()
        }
    }

    #[tokio::test]
    async fn test_submitted_events_reach_the_store() {
        let (worker, handle, db) = worker().await;
        let task = tokio::spawn(worker.run());

        handle.submit(named_event("!a", "AAA")).await.unwrap();
        handle.submit(named_event("!b", "BBB")).await.unwrap();
        handle.shutdown().await.unwrap();
        task.await.unwrap();

        let snapshot = db.nodes().snapshot_all().await.unwrap();
        assert_eq!(snapshot.len(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_drains_queued_events() {
        let (worker, handle, db) = worker().await;

        // queue before the worker ever runs, then stop immediately
        handle.submit(named_event("!late", "LTE")).await.unwrap();
        handle.shutdown().await.unwrap();

        worker.run().await;

        assert!(db.nodes().get("!late").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_submit_after_worker_stopped_errors() {
        let (worker, handle, _db) = worker().await;
        let task = tokio::spawn(worker.run());

        handle.shutdown().await.unwrap();
        task.await.unwrap();

        let result = handle.submit(named_event("!x", "X")).await;
        assert!(matches!(result, Err(IngestError::ChannelClosed)));
    }
}
