//! # HTTP API
//!
//! The collector's HTTP surface, served by axum.
//!
//! ## Routes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          HTTP Routes                                    │
//! │                                                                         │
//! │  GET  /telemetry  ──► close/far projection of the latest-state table   │
//! │  GET  /trend      ──► per-node history, newest first, optional window  │
//! │  POST /sync       ──► inbound batch upsert from a peer collector       │
//! │  GET  /health     ──► store liveness                                   │
//! │                                                                         │
//! │  Every response is structured JSON, errors included.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use mesh_core::BaseLocation;
use mesh_db::Database;

pub mod error;
pub mod sync;
pub mod telemetry;
pub mod trend;

pub use error::ApiError;

// =============================================================================
// Shared State
// =============================================================================

/// State shared by every handler. Cheap to clone: the database handle is
/// a pool reference and the rest is plain data.
#[derive(Clone)]
pub struct AppState {
    /// Store handle.
    pub db: Database,

    /// Base location for inbound distance recomputation.
    pub base: BaseLocation,

    /// Radius of the "close" bucket, in miles.
    pub radius_miles: f64,
}

// =============================================================================
// Router
// =============================================================================

/// Builds the API router over the shared state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/telemetry", get(telemetry::get_telemetry))
        .route("/trend", get(trend::get_trend))
        .route("/sync", post(sync::post_sync))
        .route("/health", get(health))
        .with_state(state)
}

/// Store liveness probe.
async fn health(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    if state.db.health_check().await {
        (StatusCode::OK, Json(json!({ "status": "ok" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "degraded" })),
        )
    }
}
