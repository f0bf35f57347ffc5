//! # Repository Module
//!
//! Database repository implementations for the collector store.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Reconciler / HTTP handler / sync scheduler                            │
//! │       │                                                                 │
//! │       │  db.nodes().apply_update(id, &update)                          │
//! │       │  db.trend().history(id, since)                                 │
//! │       ▼                                                                 │
//! │  NodeRepository / TrendRepository                                      │
//! │       │                                                                 │
//! │       │  SQL (isolated here, nowhere else)                             │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`node::NodeRepository`] - latest-state upsert, snapshots, sync flags
//! - [`trend::TrendRepository`] - append-only history

pub mod node;
pub mod trend;
