//! # mesh-db: Storage Layer for the Mesh Telemetry Collector
//!
//! This crate provides database access for the collector. It uses SQLite
//! for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Collector Data Flow                              │
//! │                                                                         │
//! │  Reconciler (write path)      HTTP API (read path)     Sync scheduler  │
//! │       │                             │                        │          │
//! │       ▼                             ▼                        ▼          │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                      mesh-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │  (node.rs,    │    │  (embedded)  │  │   │
//! │  │   │               │    │   trend.rs)   │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ NodeRepo      │    │ 001_init.sql │  │   │
//! │  │   │ WAL mode      │    │ TrendRepo     │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (one "latest" row per node + trend log)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (node, trend)

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::node::NodeRepository;
pub use repository::trend::TrendRepository;
