//! # Inbound Sync Endpoint
//!
//! `POST /sync` - batch upsert from a peer collector pushing its node
//! table here. Each entry is a partial node record; it goes through the
//! same presence-aware coalesce merge as radio events, so a peer can
//! never null out locally-known fields.
//!
//! Per-entry failures are collected and surfaced without aborting the
//! remaining entries. A payload that is not a JSON array is a 400.

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use mesh_core::{units, BaseLocation, NodeUpdate};

use crate::http::{ApiError, AppState};

// =============================================================================
// Entry Shape
// =============================================================================

/// One partial node record from a peer. Everything is optional except the
/// id, and even that is validated per entry rather than failing the batch.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SyncEntry {
    /// Peers historically send `sender_node_id`; both spellings land here.
    #[serde(alias = "sender_node_id")]
    node_id: Option<String>,

    short_name: Option<String>,
    long_name: Option<String>,
    to_node_id: Option<String>,
    neighbor_node_id: Option<String>,
    hardware_model: Option<String>,
    mac_address: Option<String>,
    role: Option<String>,
    public_key: Option<String>,

    latitude: Option<f64>,
    longitude: Option<f64>,
    altitude: Option<f64>,
    sats_in_view: Option<f64>,

    temperature: Option<f64>,
    humidity: Option<f64>,
    pressure: Option<f64>,
    battery_level: Option<f64>,
    voltage: Option<f64>,
    uptime_seconds: Option<f64>,
    snr: Option<f64>,

    via_mqtt: Option<bool>,
    timestamp: Option<DateTime<Utc>>,
}

impl SyncEntry {
    /// Converts the entry into a merge unit. Distance is always derived
    /// from the *local* base location when a coordinate pair is present;
    /// a peer-supplied distance would be relative to the peer's base and
    /// is ignored.
    fn into_update(self, base: &BaseLocation, now: DateTime<Utc>) -> Result<(String, NodeUpdate), String> {
        let node_id = self
            .node_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| "missing node_id".to_string())?;

        let mut update = NodeUpdate::new(self.timestamp.unwrap_or(now));

        update.short_name = self.short_name;
        update.long_name = self.long_name;
        update.to_node_id = self.to_node_id;
        update.neighbor_node_id = self.neighbor_node_id;
        update.hardware_model = self.hardware_model;
        update.mac_address = self.mac_address;
        update.role = self.role;
        update.public_key = self.public_key;
        update.via_mqtt = self.via_mqtt;

        update.temperature = scalar("temperature", self.temperature);
        update.humidity = scalar("humidity", self.humidity);
        update.pressure = scalar("pressure", self.pressure);
        update.battery_level = scalar("battery_level", self.battery_level);
        update.voltage = scalar("voltage", self.voltage);
        update.uptime_seconds = scalar("uptime_seconds", self.uptime_seconds);
        update.snr = scalar("snr", self.snr);
        update.altitude = scalar("altitude", self.altitude);
        update.sats_in_view = scalar("sats_in_view", self.sats_in_view);

        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => {
                update
                    .set_position(latitude, longitude, base)
                    .map_err(|e| format!("invalid coordinate pair: {e}"))?;
            }
            (None, None) => {}
            _ => warn!(node_id = %node_id, "Discarding unpaired coordinate in sync entry"),
        }

        Ok((node_id, update))
    }
}

/// Rounds one inbound scalar; an unusable reading is skipped, the rest of
/// the entry proceeds.
fn scalar(field: &'static str, value: Option<f64>) -> Option<f64> {
    value.and_then(|v| match units::round_scalar(v) {
        Ok(rounded) => Some(rounded),
        Err(e) => {
            warn!(field, error = %e, "Skipping unusable reading in sync entry");
            None
        }
    })
}

// =============================================================================
// Handler
// =============================================================================

/// Applies a JSON array of partial node records, entry by entry.
pub async fn post_sync(
    State(state): State<AppState>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let Some(entries) = payload.as_array() else {
        return Err(ApiError::InvalidRequest(
            "Expected a list of entries".to_string(),
        ));
    };

    let now = Utc::now();
    let mut errors = Vec::new();

    for (index, raw) in entries.iter().enumerate() {
        let entry: SyncEntry = match serde_json::from_value(raw.clone()) {
            Ok(entry) => entry,
            Err(e) => {
                errors.push(json!({ "index": index, "error": e.to_string() }));
                continue;
            }
        };

        let (node_id, update) = match entry.into_update(&state.base, now) {
            Ok(parts) => parts,
            Err(reason) => {
                errors.push(json!({ "index": index, "error": reason }));
                continue;
            }
        };

        if let Err(e) = state.db.nodes().apply_update(&node_id, &update).await {
            warn!(node_id = %node_id, error = %e, "Failed to apply sync entry");
            errors.push(json!({ "index": index, "node_id": node_id, "error": e.to_string() }));
        }
    }

    if errors.is_empty() {
        Ok(Json(json!({ "status": "success" })))
    } else {
        Ok(Json(json!({ "status": "partial", "errors": errors })))
    }
}
