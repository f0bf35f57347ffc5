//! # Telemetry Read Endpoint
//!
//! `GET /telemetry` - the distance-bucketed, freshness-annotated view of
//! every node with a known position. Pure read path: one store snapshot,
//! one pure projection, no mutation.

use axum::extract::State;
use axum::Json;
use chrono::Utc;

use mesh_core::{projection, Projection};

use crate::http::{ApiError, AppState};

/// Serves `{"close_nodes": [...], "far_nodes": [...]}`.
pub async fn get_telemetry(State(state): State<AppState>) -> Result<Json<Projection>, ApiError> {
    let snapshot = state.db.nodes().snapshot_all().await?;
    Ok(Json(projection::project(
        &snapshot,
        Utc::now(),
        state.radius_miles,
    )))
}
