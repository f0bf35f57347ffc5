//! # Sync Error Types
//!
//! Error types for the export path. Export failures never propagate into
//! ingestion; the scheduler logs them and retries the batch on the next
//! cycle.

use thiserror::Error;

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Export path failures.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The store could not serve the snapshot or the mark.
    #[error(transparent)]
    Db(#[from] mesh_db::DbError),

    /// The aggregator endpoint was unreachable.
    #[error("uplink transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The aggregator answered with something other than HTTP 200.
    #[error("uplink rejected export with HTTP {status}")]
    Rejected { status: u16 },

    /// The scheduler has stopped and its channel is closed.
    #[error("sync scheduler channel closed")]
    ChannelClosed,
}
