//! # Wire Event Shape
//!
//! The decoded telemetry event as delivered by the transport layer. The
//! radio/mesh decoding itself happens outside the collector; what arrives
//! here is a record of named, already-decoded fields, any of which may be
//! absent.
//!
//! ## Leniency
//! Scalar fields deserialize through [`lenient_number`]: a JSON number or
//! a numeric string both become `Some(f64)`, anything else becomes `None`.
//! A field the decoder mangled is indistinguishable from a field it never
//! sent - and either way the rest of the event still processes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Accepts a number or a numeric string; any other shape reads as absent.
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }))
}

// =============================================================================
// Field Groups
// =============================================================================

/// Environment sensor readings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EnvironmentMetrics {
    #[serde(deserialize_with = "lenient_number")]
    pub temperature: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub humidity: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub pressure: Option<f64>,
}

/// Device health metrics.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DeviceMetrics {
    #[serde(deserialize_with = "lenient_number")]
    pub battery_level: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub voltage: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub uptime_seconds: Option<f64>,
}

/// GPS position fix.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Position {
    #[serde(deserialize_with = "lenient_number")]
    pub latitude: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub longitude: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub altitude: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub sats_in_view: Option<f64>,
}

/// Node identity metadata.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Identity {
    pub hardware_model: Option<String>,
    pub mac_address: Option<String>,
    pub role: Option<String>,
}

/// Radio link quality.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Radio {
    #[serde(deserialize_with = "lenient_number")]
    pub snr: Option<f64>,
}

// =============================================================================
// Telemetry Event
// =============================================================================

/// One decoded event from the transport.
///
/// `sender_id` is the only semantically required field - the reconciler
/// drops (and logs) events without one - but it is optional in the wire
/// shape so a malformed packet deserializes instead of erroring before we
/// can log it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TelemetryEvent {
    pub sender_id: Option<String>,
    pub to_id: Option<String>,
    pub short_name: Option<String>,
    pub long_name: Option<String>,

    /// Event time as stamped by the sender, when available.
    pub timestamp: Option<DateTime<Utc>>,

    /// Whether the event time (when present) should become the record's
    /// `timestamp`. When false the ingestion instant is used.
    pub set_timestamp: bool,

    /// True when the packet arrived through a federated relay rather than
    /// directly over the radio.
    pub via_relay: bool,

    pub public_key: Option<String>,

    pub environment: Option<EnvironmentMetrics>,
    pub device: Option<DeviceMetrics>,
    pub position: Option<Position>,
    pub identity: Option<Identity>,
    pub radio: Option<Radio>,
}

// =============================================================================
// Tests
// =============================================================================
