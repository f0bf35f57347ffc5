//! # mesh-core: Pure Domain Logic for the Mesh Telemetry Collector
//!
//! This crate is the heart of the collector. It contains the domain types
//! and every pure computation the system performs, with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Mesh Telemetry Collector                            │
//! │                                                                         │
//! │  radio transport ──► mesh-ingest (Reconciler) ──► mesh-db (Store)      │
//! │                            │                          │                 │
//! │                            ▼                          ▼                 │
//! │              ┌──────────────────────────────────────────────┐           │
//! │              │        ★ mesh-core (THIS CRATE) ★            │           │
//! │              │                                              │           │
//! │              │  ┌─────────┐ ┌───────┐ ┌──────────┐          │           │
//! │              │  │  types  │ │ units │ │freshness │          │           │
//! │              │  │ records │ │ round │ │ last_seen│          │           │
//! │              │  │ updates │ │ miles │ │  uptime  │          │           │
//! │              │  └─────────┘ └───────┘ └──────────┘          │           │
//! │              │  ┌────────────┐                              │           │
//! │              │  │ projection │  close/far buckets           │           │
//! │              │  └────────────┘                              │           │
//! │              │                                              │           │
//! │              │  NO I/O • NO DATABASE • NO NETWORK           │           │
//! │              └──────────────────────────────────────────────┘           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (`NodeRecord`, `TrendRecord`, `NodeUpdate`)
//! - [`units`] - Rounding, range validation, haversine distance
//! - [`freshness`] - Human-readable age/uptime rendering
//! - [`projection`] - Read-path close/far projection
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure functions**: every function is deterministic
//! 2. **No I/O**: database, network, and file access are forbidden here
//! 3. **Presence over truthiness**: absence is `None`, never `0`/`false`
//! 4. **Explicit errors**: all failures are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod freshness;
pub mod projection;
pub mod types;
pub mod units;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult};
pub use projection::{Projection, ProjectedNode, DISTANCE_SENTINEL_MILES, PLACEHOLDER};
pub use types::{BaseLocation, NodeRecord, NodeUpdate, TrendRecord};
