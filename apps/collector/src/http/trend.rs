//! # Trend History Endpoint
//!
//! `GET /trend?node=<id1,id2,...>&days=<N>` - historical samples per
//! node, newest first. `days` bounds the window; omitting it returns all
//! history. Missing `node` or a non-numeric `days` is a 400.

use axum::extract::{Query, State};
use axum::Json;
use chrono::{Duration, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;

use mesh_core::TrendRecord;

use crate::http::{ApiError, AppState};

/// Raw query parameters; `days` stays a string so a non-numeric value is
/// our 400, not an opaque extractor rejection.
#[derive(Debug, Deserialize)]
pub struct TrendQuery {
    node: Option<String>,
    days: Option<String>,
}

/// Serves `{node_id: [TrendRecord, ...]}` keyed by the requested ids.
pub async fn get_trend(
    State(state): State<AppState>,
    Query(params): Query<TrendQuery>,
) -> Result<Json<BTreeMap<String, Vec<TrendRecord>>>, ApiError> {
    let nodes = params
        .node
        .as_deref()
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| ApiError::InvalidRequest("missing 'node' query parameter".to_string()))?;

    let since = match params.days.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => {
            let days: i64 = raw
                .parse()
                .map_err(|_| ApiError::InvalidRequest("'days' must be numeric".to_string()))?;
            if days < 0 {
                return Err(ApiError::InvalidRequest(
                    "'days' must not be negative".to_string(),
                ));
            }
            Some(Utc::now() - Duration::days(days))
        }
    };

    let mut history = BTreeMap::new();
    for node_id in nodes.split(',').map(str::trim).filter(|id| !id.is_empty()) {
        let samples = state.db.trend().history(node_id, since).await?;
        history.insert(node_id.to_string(), samples);
    }

    Ok(Json(history))
}
