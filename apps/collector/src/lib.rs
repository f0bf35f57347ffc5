//! # Mesh Collector
//!
//! Daemon wiring for the mesh telemetry collector.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Collector Tasks                                 │
//! │                                                                         │
//! │  ┌───────────────┐   ┌───────────────┐   ┌───────────────────────────┐ │
//! │  │ stdin source  │──►│ IngestWorker  │──►│         mesh-db           │ │
//! │  │ (transport    │   │ (write path)  │   │  nodes + trend, SQLite    │ │
//! │  │  stand-in)    │   └───────────────┘   └──────────┬────────────────┘ │
//! │  └───────────────┘                                  │                  │
//! │                                          ┌──────────┴──────────┐       │
//! │                                          ▼                     ▼       │
//! │                                 ┌───────────────┐    ┌───────────────┐ │
//! │                                 │ axum HTTP API │    │ SyncScheduler │ │
//! │                                 │ (read path)   │    │ (export path) │ │
//! │                                 └───────────────┘    └───────────────┘ │
//! │                                                                         │
//! │  Shutdown (ctrl-c): stop source → drain ingest → final bounded        │
//! │  export → close pool.                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod http;
pub mod source;

// Re-exports
pub use config::{CollectorConfig, ConfigError};
pub use http::AppState;
