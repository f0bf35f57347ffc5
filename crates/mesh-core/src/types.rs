//! # Domain Types
//!
//! Core domain types for the mesh telemetry collector.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Domain Types                                   │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   NodeRecord    │   │   TrendRecord   │   │   NodeUpdate    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  node_id (PK)   │   │  id (rowid)     │   │  all fields     │       │
//! │  │  latest values  │   │  node_id        │   │  Option<_>      │       │
//! │  │  miles_to_base  │   │  one sample     │   │  None = leave   │       │
//! │  │  synced flag    │   │  immutable      │   │  Some = write   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  NodeRecord is the mutable "latest known state" row, one per node.     │
//! │  TrendRecord is an append-only historical sample, many per node.       │
//! │  NodeUpdate is the unit of merge: a field-wise, presence-aware         │
//! │  partial update applied atomically against one NodeRecord.            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## The Presence Contract
//! Every mergeable field on [`NodeUpdate`] is an `Option`. `None` means
//! "the event did not carry this field - do not touch the stored value".
//! `Some(v)` means "write v", and that includes `Some(0.0)` and
//! `Some(false)`: zero and false are present values, not absence. This is
//! what makes the coalesce contract statically checkable - there is no
//! truthiness test anywhere in the merge path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::units;

// =============================================================================
// Base Location
// =============================================================================

/// The reference coordinate every node's distance is computed against.
///
/// Supplied once by configuration and passed by reference into the
/// components that need it; there is no ambient global.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseLocation {
    /// Base station latitude in decimal degrees.
    pub latitude: f64,

    /// Base station longitude in decimal degrees.
    pub longitude: f64,
}

// =============================================================================
// Node Record
// =============================================================================

/// The "latest known state" row for a single mesh node.
///
/// One row per unique `node_id`. Created on first sighting, mutated on
/// every subsequent accepted event, never deleted by the collector.
///
/// ## Serialization
/// Serialized as the outbound export payload. The `synced` flag and the
/// internal `revision` counter are bookkeeping and never leave the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct NodeRecord {
    /// Stable node identifier assigned by the radio network.
    pub node_id: String,

    /// Short display name (last-known-value).
    pub short_name: Option<String>,

    /// Long display name (last-known-value).
    pub long_name: Option<String>,

    /// Destination node of the most recent packet.
    pub to_node_id: Option<String>,

    /// Reported neighbor node, when the network shares one.
    pub neighbor_node_id: Option<String>,

    /// Hardware model string (e.g. "HELTEC_V3").
    pub hardware_model: Option<String>,

    /// MAC address of the radio.
    pub mac_address: Option<String>,

    /// Device role (e.g. "ROUTER").
    pub role: Option<String>,

    /// Node public key, when broadcast.
    pub public_key: Option<String>,

    /// Latitude in decimal degrees. Only ever written together with
    /// `longitude`; a lone coordinate is discarded upstream.
    pub latitude: Option<f64>,

    /// Longitude in decimal degrees. See `latitude`.
    pub longitude: Option<f64>,

    /// Altitude in meters.
    pub altitude: Option<f64>,

    /// GPS satellites in view.
    pub sats_in_view: Option<f64>,

    /// Ambient temperature reading.
    pub temperature: Option<f64>,

    /// Relative humidity reading.
    pub humidity: Option<f64>,

    /// Barometric pressure reading.
    pub pressure: Option<f64>,

    /// Battery charge percentage.
    pub battery_level: Option<f64>,

    /// Battery/bus voltage.
    pub voltage: Option<f64>,

    /// Device uptime in seconds.
    pub uptime_seconds: Option<f64>,

    /// Signal-to-noise ratio of the last received packet.
    pub snr: Option<f64>,

    /// Great-circle distance to the configured base location, derived
    /// whenever a coordinate pair is accepted.
    pub miles_to_base: Option<f64>,

    /// Whether the last packet arrived through a federated relay rather
    /// than directly over the radio.
    pub via_mqtt: bool,

    /// Last-update instant (event time when the event says so, else
    /// ingestion time).
    pub timestamp: DateTime<Utc>,

    /// Set once when the row is created; immutable thereafter.
    pub first_contact: DateTime<Utc>,

    /// False after any mutation; true only after a confirmed export.
    #[serde(skip_serializing)]
    pub synced: bool,

    /// Mutation counter. Incremented on every accepted update and used to
    /// keep `mark_synced` from clobbering rows mutated after an export
    /// snapshot was taken. Internal only.
    #[serde(skip_serializing)]
    pub revision: i64,
}

// =============================================================================
// Trend Record
// =============================================================================

/// An immutable historical telemetry sample.
///
/// One row is appended for every accepted event that carried at least one
/// telemetry, position, or device-metric field. The write path never
/// updates or deletes these rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct TrendRecord {
    /// Append-order row id.
    pub id: i64,

    /// Node this sample belongs to.
    pub node_id: String,

    /// Instant the sample was recorded.
    pub timestamp: DateTime<Utc>,

    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub battery_level: Option<f64>,
    pub voltage: Option<f64>,
    pub uptime_seconds: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub sats_in_view: Option<f64>,
    pub snr: Option<f64>,
}

// =============================================================================
// Node Update
// =============================================================================

/// A field-wise, presence-aware partial update for one node.
///
/// This is the unit of merge: the reconciler (or the inbound sync handler)
/// fills in exactly the fields the event carried, and the store applies
/// the whole update as one atomic coalesce - `None` fields leave the
/// stored value untouched, `Some` fields overwrite it.
///
/// ## Building an update
/// ```rust
/// use chrono::Utc;
/// use mesh_core::{BaseLocation, NodeUpdate};
///
/// let base = BaseLocation { latitude: 43.6008608, longitude: -116.2750972 };
/// let mut update = NodeUpdate::new(Utc::now());
/// update.battery_level = Some(0.0); // zero is a present value
/// update.set_position(43.61, -116.20, &base).unwrap();
/// assert!(update.miles_to_base.is_some());
/// assert!(update.has_telemetry());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NodeUpdate {
    pub short_name: Option<String>,
    pub long_name: Option<String>,
    pub to_node_id: Option<String>,
    pub neighbor_node_id: Option<String>,
    pub hardware_model: Option<String>,
    pub mac_address: Option<String>,
    pub role: Option<String>,
    pub public_key: Option<String>,

    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub sats_in_view: Option<f64>,

    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub battery_level: Option<f64>,
    pub voltage: Option<f64>,
    pub uptime_seconds: Option<f64>,
    pub snr: Option<f64>,

    /// Derived distance; set by [`NodeUpdate::set_position`], or carried
    /// through directly when a caller already holds a trusted value.
    pub miles_to_base: Option<f64>,

    /// Relay provenance of the packet, when known.
    pub via_mqtt: Option<bool>,

    /// The instant this update is stamped with. Resolved by the caller's
    /// timestamp policy before the update reaches the store.
    pub timestamp: DateTime<Utc>,
}

impl NodeUpdate {
    /// Creates an empty update stamped with the given instant.
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        NodeUpdate {
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
            via_mqtt: None,
            timestamp,
        }
    }

    /// Applies a coordinate pair: validates ranges, rounds to coordinate
    /// precision, and recomputes the derived distance to `base`.
    ///
    /// Latitude and longitude are only ever written together - callers
    /// with a lone coordinate must discard it instead of calling this.
    pub fn set_position(&mut self, latitude: f64, longitude: f64, base: &BaseLocation) -> CoreResult<()> {
        let lat = units::round_coordinate(units::validate_latitude(latitude)?)?;
        let lon = units::round_coordinate(units::validate_longitude(longitude)?)?;

        self.latitude = Some(lat);
        self.longitude = Some(lon);
        self.miles_to_base = Some(units::round_scalar(units::haversine_miles(base, lat, lon))?);

        Ok(())
    }

    /// True when the update carries at least one telemetry, position, or
    /// device-metric field. Gates trend logging: an event that only
    /// renames a node does not produce a historical sample.
    pub fn has_telemetry(&self) -> bool {
        self.temperature.is_some()
            || self.humidity.is_some()
            || self.pressure.is_some()
            || self.battery_level.is_some()
            || self.voltage.is_some()
            || self.uptime_seconds.is_some()
            || self.latitude.is_some()
            || self.longitude.is_some()
            || self.altitude.is_some()
            || self.sats_in_view.is_some()
            || self.snr.is_some()
    }
}

// =============================================================================
// Tests
// =============================================================================
