//! # Ingest Error Types
//!
//! The reconciler itself contains its failures (drop-and-log, skip-field);
//! the only errors that escape this crate are channel-plumbing ones.

use thiserror::Error;

/// Result type alias for ingest operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Errors from the ingest worker plumbing.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The worker has stopped and its channel is closed.
    #[error("ingest worker channel closed")]
    ChannelClosed,
}
