//! # Read-Path Projection
//!
//! Turns a consistent snapshot of [`NodeRecord`]s into the shape the map
//! UI consumes: distance-bucketed, freshness-annotated, with absent fields
//! redacted to a placeholder token.
//!
//! ## Projection Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       project(records, now, radius)                     │
//! │                                                                         │
//! │  snapshot ──► drop rows without a coordinate pair                       │
//! │           ──► render last_seen / uptime_string                          │
//! │           ──► absent fields → "---"   (output only, never storage)      │
//! │           ──► unknown distance → 9999.0 sentinel (sorts last in far)    │
//! │           ──► partition: miles_to_base < radius ? close : far           │
//! │           ──► sort each bucket ascending by miles_to_base               │
//! │                                                                         │
//! │  Pure computation: the store is never mutated from the read path.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::freshness::duration_string;
use crate::types::NodeRecord;

/// Placeholder token substituted for absent fields in the projection.
pub const PLACEHOLDER: &str = "---";

/// Sentinel distance for nodes whose distance is unknown; large enough to
/// sort last within the far bucket.
pub const DISTANCE_SENTINEL_MILES: f64 = 9999.0;

/// Serializes `Some(v)` as the value and `None` as the placeholder token.
/// Redaction happens here, at the serialization boundary, so stored
/// optionality is untouched.
fn redact_absent<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Serialize,
    S: Serializer,
{
    match value {
        Some(v) => v.serialize(serializer),
        None => serializer.serialize_str(PLACEHOLDER),
    }
}

// =============================================================================
// Projected Node
// =============================================================================

/// One node as rendered for the read API.
///
/// Coordinates are plain `f64` because rows without a full pair never make
/// it into a projection.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectedNode {
    pub node_id: String,

    #[serde(serialize_with = "redact_absent")]
    pub short_name: Option<String>,
    #[serde(serialize_with = "redact_absent")]
    pub long_name: Option<String>,
    #[serde(serialize_with = "redact_absent")]
    pub hardware_model: Option<String>,
    #[serde(serialize_with = "redact_absent")]
    pub role: Option<String>,

    pub latitude: f64,
    pub longitude: f64,
    #[serde(serialize_with = "redact_absent")]
    pub altitude: Option<f64>,
    #[serde(serialize_with = "redact_absent")]
    pub sats_in_view: Option<f64>,

    #[serde(serialize_with = "redact_absent")]
    pub temperature: Option<f64>,
    #[serde(serialize_with = "redact_absent")]
    pub humidity: Option<f64>,
    #[serde(serialize_with = "redact_absent")]
    pub pressure: Option<f64>,
    #[serde(serialize_with = "redact_absent")]
    pub battery_level: Option<f64>,
    #[serde(serialize_with = "redact_absent")]
    pub voltage: Option<f64>,
    #[serde(serialize_with = "redact_absent")]
    pub uptime_seconds: Option<f64>,
    #[serde(serialize_with = "redact_absent")]
    pub snr: Option<f64>,

    /// Known distance, or [`DISTANCE_SENTINEL_MILES`].
    pub miles_to_base: f64,

    pub via_mqtt: bool,
    pub timestamp: DateTime<Utc>,

    /// Rendered age of the record relative to the projection instant.
    pub last_seen: String,

    /// Rendered device uptime; a missing reading renders as zero.
    pub uptime_string: String,
}

/// The distance-bucketed projection served by `GET /telemetry`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Projection {
    /// Nodes within the configured radius, nearest first.
    pub close_nodes: Vec<ProjectedNode>,

    /// Everything else, nearest first; unknown distances sort last.
    pub far_nodes: Vec<ProjectedNode>,
}

// =============================================================================
// Projection
// =============================================================================

/// Projects a store snapshot into close/far buckets relative to the
/// configured radius. Records without a coordinate pair are excluded from
/// the output entirely.
pub fn project(records: &[NodeRecord], now: DateTime<Utc>, radius_miles: f64) -> Projection {
    let mut projection = Projection::default();

    for record in records {
        let (Some(latitude), Some(longitude)) = (record.latitude, record.longitude) else {
            continue;
        };

        let age_seconds = (now - record.timestamp).num_seconds();
        let uptime_seconds = record.uptime_seconds.unwrap_or(0.0) as i64;
        let miles_to_base = record.miles_to_base.unwrap_or(DISTANCE_SENTINEL_MILES);

        let node = ProjectedNode {
            node_id: record.node_id.clone(),
            short_name: record.short_name.clone(),
            long_name: record.long_name.clone(),
            hardware_model: record.hardware_model.clone(),
            role: record.role.clone(),
            latitude,
            longitude,
            altitude: record.altitude,
            sats_in_view: record.sats_in_view,
            temperature: record.temperature,
            humidity: record.humidity,
            pressure: record.pressure,
            battery_level: record.battery_level,
            voltage: record.voltage,
            uptime_seconds: record.uptime_seconds,
            snr: record.snr,
            miles_to_base,
            via_mqtt: record.via_mqtt,
            timestamp: record.timestamp,
            last_seen: duration_string(age_seconds),
            uptime_string: duration_string(uptime_seconds),
        };

        if miles_to_base < radius_miles {
            projection.close_nodes.push(node);
        } else {
            projection.far_nodes.push(node);
        }
    }

    projection
        .close_nodes
        .sort_by(|a, b| a.miles_to_base.total_cmp(&b.miles_to_base));
    projection
        .far_nodes
        .sort_by(|a, b| a.miles_to_base.total_cmp(&b.miles_to_base));

    projection
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(node_id: &str) -> NodeRecord {
        NodeRecord {
            node_id: node_id.to_string(),
            short_name: None,
            long_name: None,
            to_node_id: None,
            neighbor_node_id: None,
            hardware_model: None,
            mac_address: None,
            role: None,
            public_key: None,
            latitude: None,
            longitude: None,
            altitude: None,
            sats_in_view: None,
            temperature: None,
            humidity: None,
            pressure: None,
            battery_level: None,
            voltage: None,
            uptime_seconds: None,
            snr: None,
            miles_to_base: None,
            via_mqtt: false,
            timestamp: Utc::now(),
            first_contact: Utc::now(),
            synced: false,
            revision: 0,
        }
    }

    fn positioned(node_id: &str, miles: f64) -> NodeRecord {
        let mut r = record(node_id);
        r.latitude = Some(43.6);
        r.longitude = Some(-116.2);
        r.miles_to_base = Some(miles);
        r
    }

    #[test]
    fn test_bucketing_boundary() {
        let records = vec![positioned("near", 99.9), positioned("far", 100.0)];
        let projection = project(&records, Utc::now(), 100.0);

        assert_eq!(projection.close_nodes.len(), 1);
        assert_eq!(projection.close_nodes[0].node_id, "near");
        assert_eq!(projection.far_nodes.len(), 1);
        assert_eq!(projection.far_nodes[0].node_id, "far");
    }

    #[test]
    fn test_nodes_without_coordinates_excluded() {
        let mut lonely = record("no-gps");
        lonely.battery_level = Some(80.0);
        let projection = project(&[lonely], Utc::now(), 100.0);

        assert!(projection.close_nodes.is_empty());
        assert!(projection.far_nodes.is_empty());
    }

    #[test]
    fn test_unknown_distance_uses_sentinel_and_sorts_last() {
        let mut unknown = positioned("unknown", 0.0);
        unknown.miles_to_base = None;
        let records = vec![unknown, positioned("known", 250.0)];

        let projection = project(&records, Utc::now(), 100.0);
        assert_eq!(projection.far_nodes.len(), 2);
        assert_eq!(projection.far_nodes[0].node_id, "known");
        assert_eq!(projection.far_nodes[1].node_id, "unknown");
        assert_eq!(projection.far_nodes[1].miles_to_base, DISTANCE_SENTINEL_MILES);
    }

    #[test]
    fn test_close_nodes_sorted_ascending() {
        let records = vec![
            positioned("b", 42.0),
            positioned("a", 3.5),
            positioned("c", 99.0),
        ];
        let projection = project(&records, Utc::now(), 100.0);
        let order: Vec<_> = projection.close_nodes.iter().map(|n| n.node_id.as_str()).collect();
        assert_eq!(order, ["a", "b", "c"]);
    }

    #[test]
    fn test_placeholder_redaction_in_output_only() {
        let now = Utc::now();
        let mut r = positioned("redacted", 5.0);
        r.timestamp = now - Duration::seconds(10);
        r.temperature = None;
        r.short_name = None;

        let projection = project(&[r], now, 100.0);
        let json = serde_json::to_value(&projection.close_nodes[0]).unwrap();

        assert_eq!(json["temperature"], PLACEHOLDER);
        assert_eq!(json["short_name"], PLACEHOLDER);
        // present values pass through untouched
        assert_eq!(json["miles_to_base"], 5.0);
        assert_eq!(json["last_seen"], "10 seconds");
    }

    #[test]
    fn test_missing_uptime_renders_as_zero() {
        let projection = project(&[positioned("n", 1.0)], Utc::now(), 100.0);
        assert_eq!(projection.close_nodes[0].uptime_string, "0 seconds");
    }
}
