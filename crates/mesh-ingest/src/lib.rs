//! # mesh-ingest: Telemetry Reconciliation for the Mesh Telemetry Collector
//!
//! The write path: decoded radio events come in, presence-aware partial
//! updates go into the store, and qualifying events leave a sample in the
//! trend log.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Ingestion Architecture                            │
//! │                                                                         │
//! │  transport (out of scope)                                              │
//! │       │ decoded TelemetryEvent                                         │
//! │       ▼                                                                 │
//! │  ┌────────────────┐    mpsc     ┌────────────────────────────────┐     │
//! │  │  IngestHandle  │ ──────────► │  IngestWorker                  │     │
//! │  │  submit()      │             │                                │     │
//! │  │  shutdown()    │             │  one event at a time:          │     │
//! │  └────────────────┘             │  Reconciler::reconcile()       │     │
//! │                                 │    normalize → coalesce →      │     │
//! │                                 │    derive distance → trend     │     │
//! │                                 └───────────────┬────────────────┘     │
//! │                                                 ▼                       │
//! │                                            mesh-db                      │
//! │                                                                         │
//! │  Single consumer ⇒ writes to any given node are serialized in          │
//! │  arrival order, which is exactly the last-writer-wins contract.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`event`] - Decoded wire event shape
//! - [`reconciler`] - The merge engine
//! - [`worker`] - mpsc-fed ingestion task + handle
//! - [`error`] - Ingest error types

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod event;
pub mod reconciler;
pub mod worker;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{IngestError, IngestResult};
pub use event::TelemetryEvent;
pub use reconciler::{Reconciler, ReconcilerSettings, TemperatureUnit};
pub use worker::{IngestHandle, IngestWorker};
