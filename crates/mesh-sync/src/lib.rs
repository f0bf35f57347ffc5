//! # mesh-sync: Outbound Export for the Mesh Telemetry Collector
//!
//! The export path: unsynced node rows flow from the store to a remote
//! aggregator on a fixed interval, with one final bounded pass at
//! shutdown.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Export Architecture                             │
//! │                                                                         │
//! │  ┌────────────────┐   interval    ┌────────────────────────────────┐   │
//! │  │ SyncScheduler  │ ────────────► │ run_once:                      │   │
//! │  │                │               │   unsynced() snapshot          │   │
//! │  │ shutdown ──────┼── final pass  │   POST to aggregator           │   │
//! │  │ (bounded)      │               │   mark_synced(snapshot)        │   │
//! │  └────────────────┘               └───────────────┬────────────────┘   │
//! │                                                   │                     │
//! │                                                   ▼                     │
//! │                                      remote aggregator (HTTP 200)      │
//! │                                                                         │
//! │  The reconciler only ever sets synced=false; this crate only ever     │
//! │  sets it true, and only for the exact snapshot it pushed.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`scheduler`] - Interval loop + shutdown flush
//! - [`uplink`] - HTTP client for the aggregator endpoint
//! - [`error`] - Sync error types

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod scheduler;
pub mod uplink;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{SyncError, SyncResult};
pub use scheduler::{SyncScheduler, SyncSchedulerHandle};
pub use uplink::UplinkClient;
