//! # Telemetry Reconciler
//!
//! Merges a stream of partial, possibly-duplicate telemetry events into
//! the per-node latest-state table plus the append-only trend log.
//!
//! ## Reconcile Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        reconcile(event)                                 │
//! │                                                                         │
//! │  event ──► sender_id present? ──no──► drop + log, done                  │
//! │              │ yes                                                      │
//! │              ▼                                                          │
//! │  build NodeUpdate:                                                     │
//! │    • every present string copied as-is                                 │
//! │    • every present scalar rounded (2 dp); a bad reading is logged      │
//! │      and skipped, the rest of the event continues                      │
//! │    • lat+lon only as a pair → rounded (7 dp) + miles_to_base derived   │
//! │      from the configured base; a lone coordinate is discarded          │
//! │    • timestamp = event time iff supplied AND set_timestamp, else now   │
//! │              │                                                          │
//! │              ▼                                                          │
//! │  nodes.apply_update()   ← atomic; synced flips false                    │
//! │              │                                                          │
//! │              ▼                                                          │
//! │  carried telemetry? ──yes──► trend.append()                             │
//! │                                                                         │
//! │  Store unavailable? log + skip. The ingestion loop never dies on a     │
//! │  single bad input.                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use mesh_core::{units, BaseLocation, NodeUpdate};
use mesh_db::Database;

use crate::event::TelemetryEvent;

// =============================================================================
// Settings
// =============================================================================

/// Temperature scale readings are stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureUnit {
    /// Store readings as received (mesh sensors report Celsius).
    #[default]
    Celsius,

    /// Convert readings to Fahrenheit at ingestion.
    Fahrenheit,
}

/// Reconciler behavior knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcilerSettings {
    /// Scale to store temperature readings in.
    pub temperature_unit: TemperatureUnit,
}

// =============================================================================
// Reconciler
// =============================================================================

/// The write-path engine: one per collector, owned by the ingest worker.
#[derive(Debug, Clone)]
pub struct Reconciler {
    db: Database,
    base: BaseLocation,
    settings: ReconcilerSettings,
}

impl Reconciler {
    /// Creates a reconciler writing against `db`, deriving distances from
    /// `base`.
    pub fn new(db: Database, base: BaseLocation, settings: ReconcilerSettings) -> Self {
        Reconciler { db, base, settings }
    }

    /// Consumes one decoded event. Never fails outward: malformed events
    /// are dropped with a log line, bad fields are skipped individually,
    /// and store unavailability skips the event without stopping the loop.
    pub async fn reconcile(&self, event: TelemetryEvent) {
        let Some(node_id) = event.sender_id.as_deref().filter(|id| !id.is_empty()) else {
            warn!("Dropping event with no sender id");
            return;
        };

        let update = self.build_update(&event);

        if let Err(e) = self.db.nodes().apply_update(node_id, &update).await {
            error!(node_id, error = %e, "Failed to apply node update; skipping event");
            return;
        }

        if update.has_telemetry() {
            if let Err(e) = self.db.trend().append(node_id, &update).await {
                error!(node_id, error = %e, "Failed to append trend sample");
            }
        }

        debug!(node_id, "Reconciled event");
    }

    /// Bulk-reconciles a snapshot of already-known nodes, e.g. the node
    /// table the transport hands over right after connecting.
    pub async fn prime(&self, events: Vec<TelemetryEvent>) {
        let count = events.len();
        for event in events {
            self.reconcile(event).await;
        }
        info!(count, "Primed store from transport node table");
    }

    /// Extracts the fields the event carried into a presence-aware update.
    fn build_update(&self, event: &TelemetryEvent) -> NodeUpdate {
        // Timestamp policy: the embedded event time is stored only when the
        // transport asks for it; everything else gets the ingestion instant.
        let timestamp = match (event.timestamp, event.set_timestamp) {
            (Some(event_time), true) => event_time,
            _ => Utc::now(),
        };

        let mut update = NodeUpdate::new(timestamp);

        update.short_name = event.short_name.clone();
        update.long_name = event.long_name.clone();
        update.to_node_id = event.to_id.clone();
        update.public_key = event.public_key.clone();
        update.via_mqtt = Some(event.via_relay);

        if let Some(identity) = &event.identity {
            update.hardware_model = identity.hardware_model.clone();
            update.mac_address = identity.mac_address.clone();
            update.role = identity.role.clone();
        }

        if let Some(environment) = &event.environment {
            update.temperature = environment
                .temperature
                .map(|v| self.convert_temperature(v))
                .and_then(|v| self.scalar("temperature", v));
            update.humidity = environment.humidity.and_then(|v| self.scalar("humidity", v));
            update.pressure = environment.pressure.and_then(|v| self.scalar("pressure", v));
        }

        if let Some(device) = &event.device {
            update.battery_level = device
                .battery_level
                .and_then(|v| self.scalar("battery_level", v));
            update.voltage = device.voltage.and_then(|v| self.scalar("voltage", v));
            update.uptime_seconds = device
                .uptime_seconds
                .and_then(|v| self.scalar("uptime_seconds", v));
        }

        if let Some(radio) = &event.radio {
            update.snr = radio.snr.and_then(|v| self.scalar("snr", v));
        }

        if let Some(position) = &event.position {
            match (position.latitude, position.longitude) {
                (Some(latitude), Some(longitude)) => {
                    if let Err(e) = update.set_position(latitude, longitude, &self.base) {
                        warn!(latitude, longitude, error = %e, "Discarding invalid coordinate pair");
                    }
                }
                (None, None) => {}
                _ => debug!("Discarding unpaired coordinate"),
            }

            update.altitude = position.altitude.and_then(|v| self.scalar("altitude", v));
            update.sats_in_view = position
                .sats_in_view
                .and_then(|v| self.scalar("sats_in_view", v));
        }

        update
    }

    fn convert_temperature(&self, celsius: f64) -> f64 {
        match self.settings.temperature_unit {
            TemperatureUnit::Celsius => celsius,
            TemperatureUnit::Fahrenheit => units::celsius_to_fahrenheit(celsius),
        }
    }

    /// Normalizes one scalar reading. A non-finite value is a per-field
    /// failure: logged, skipped, and the rest of the event proceeds.
    fn scalar(&self, field: &'static str, value: f64) -> Option<f64> {
        match units::round_scalar(value) {
            Ok(rounded) => Some(rounded),
            Err(e) => {
                warn!(field, error = %e, "Skipping unusable reading");
                None
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{DeviceMetrics, EnvironmentMetrics, Position, Radio};
    use chrono::{Duration, Utc};
    use mesh_db::DbConfig;

    const BASE: BaseLocation = BaseLocation {
        latitude: 43.6008608,
        longitude: -116.2750972,
    };

    async fn reconciler() -> Reconciler {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        Reconciler::new(db, BASE, ReconcilerSettings::default())
    }

    fn event(sender: &str) -> TelemetryEvent {
        TelemetryEvent {
            sender_id: Some(sender.to_string()),
            ..TelemetryEvent::default()
        }
    }

    #[tokio::test]
    async fn test_event_without_sender_is_dropped() {
        let r = reconciler().await;

        let mut orphan = event("");
        orphan.sender_id = None;
        orphan.device = Some(DeviceMetrics {
            battery_level: Some(50.0),
            ..DeviceMetrics::default()
        });
        r.reconcile(orphan).await;

        assert!(r.db.nodes().snapshot_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_partial_update_scenario() {
        // position, then battery, then a null coordinate
        let r = reconciler().await;

        let mut first = event("A");
        first.position = Some(Position {
            latitude: Some(43.6),
            longitude: Some(-116.2),
            ..Position::default()
        });
        r.reconcile(first).await;

        let mut second = event("A");
        second.device = Some(DeviceMetrics {
            battery_level: Some(55.0),
            ..DeviceMetrics::default()
        });
        r.reconcile(second).await;

        let mut third = event("A");
        third.position = Some(Position::default()); // lat/lon both absent
        r.reconcile(third).await;

        let record = r.db.nodes().get("A").await.unwrap().unwrap();
        assert_eq!(record.latitude, Some(43.6));
        assert_eq!(record.longitude, Some(-116.2));
        assert_eq!(record.battery_level, Some(55.0));
    }

    #[tokio::test]
    async fn test_lone_coordinate_leaves_position_and_distance_unchanged() {
        let r = reconciler().await;

        let mut fix = event("!n");
        fix.position = Some(Position {
            latitude: Some(44.0),
            longitude: Some(-117.0),
            ..Position::default()
        });
        r.reconcile(fix).await;
        let before = r.db.nodes().get("!n").await.unwrap().unwrap();

        let mut lat_only = event("!n");
        lat_only.position = Some(Position {
            latitude: Some(45.5),
            ..Position::default()
        });
        r.reconcile(lat_only).await;

        let after = r.db.nodes().get("!n").await.unwrap().unwrap();
        assert_eq!(after.latitude, before.latitude);
        assert_eq!(after.longitude, before.longitude);
        assert_eq!(after.miles_to_base, before.miles_to_base);
    }

    #[tokio::test]
    async fn test_distance_recomputed_with_coordinate_pair() {
        let r = reconciler().await;

        let mut at_base = event("!n");
        at_base.position = Some(Position {
            latitude: Some(BASE.latitude),
            longitude: Some(BASE.longitude),
            ..Position::default()
        });
        r.reconcile(at_base).await;

        let record = r.db.nodes().get("!n").await.unwrap().unwrap();
        assert_eq!(record.miles_to_base, Some(0.0));

        let mut moved = event("!n");
        moved.position = Some(Position {
            latitude: Some(44.5),
            longitude: Some(-117.5),
            ..Position::default()
        });
        r.reconcile(moved).await;

        let record = r.db.nodes().get("!n").await.unwrap().unwrap();
        assert!(record.miles_to_base.unwrap() > 50.0);
    }

    #[tokio::test]
    async fn test_scalars_rounded_and_coordinates_precise() {
        let r = reconciler().await;

        let mut e = event("!n");
        e.environment = Some(EnvironmentMetrics {
            temperature: Some(21.45678),
            ..EnvironmentMetrics::default()
        });
        e.position = Some(Position {
            latitude: Some(43.612345678),
            longitude: Some(-116.212345678),
            ..Position::default()
        });
        r.reconcile(e).await;

        let record = r.db.nodes().get("!n").await.unwrap().unwrap();
        assert_eq!(record.temperature, Some(21.46));
        assert_eq!(record.latitude, Some(43.6123457));
        assert_eq!(record.longitude, Some(-116.2123457));
    }

    #[tokio::test]
    async fn test_zero_battery_overwrites_previous_value() {
        let r = reconciler().await;

        for battery in [87.0, 0.0] {
            let mut e = event("!n");
            e.device = Some(DeviceMetrics {
                battery_level: Some(battery),
                ..DeviceMetrics::default()
            });
            r.reconcile(e).await;
        }

        let record = r.db.nodes().get("!n").await.unwrap().unwrap();
        assert_eq!(record.battery_level, Some(0.0));
    }

    #[tokio::test]
    async fn test_bad_field_does_not_abort_event() {
        let r = reconciler().await;

        let mut e = event("!n");
        e.environment = Some(EnvironmentMetrics {
            temperature: Some(f64::NAN),
            humidity: Some(41.0),
            ..EnvironmentMetrics::default()
        });
        r.reconcile(e).await;

        let record = r.db.nodes().get("!n").await.unwrap().unwrap();
        assert_eq!(record.temperature, None);
        assert_eq!(record.humidity, Some(41.0));
    }

    #[tokio::test]
    async fn test_trend_logged_only_for_telemetry_events() {
        let r = reconciler().await;

        let mut rename = event("!n");
        rename.long_name = Some("Ridge Repeater".to_string());
        r.reconcile(rename).await;
        assert!(r.db.trend().history("!n", None).await.unwrap().is_empty());

        let mut reading = event("!n");
        reading.radio = Some(Radio { snr: Some(9.75) });
        r.reconcile(reading).await;

        let history = r.db.trend().history("!n", None).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].snr, Some(9.75));
    }

    #[tokio::test]
    async fn test_event_timestamp_used_only_when_requested() {
        let r = reconciler().await;
        let event_time = Utc::now() - Duration::hours(6);

        let mut stamped = event("!a");
        stamped.timestamp = Some(event_time);
        stamped.set_timestamp = true;
        r.reconcile(stamped).await;

        let record = r.db.nodes().get("!a").await.unwrap().unwrap();
        assert_eq!(record.timestamp, event_time);

        let mut unstamped = event("!b");
        unstamped.timestamp = Some(event_time);
        unstamped.set_timestamp = false;
        r.reconcile(unstamped).await;

        let record = r.db.nodes().get("!b").await.unwrap().unwrap();
        assert!((Utc::now() - record.timestamp).num_seconds() < 5);
    }

    #[tokio::test]
    async fn test_fahrenheit_conversion_at_ingestion() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let r = Reconciler::new(
            db,
            BASE,
            ReconcilerSettings {
                temperature_unit: TemperatureUnit::Fahrenheit,
            },
        );

        let mut e = event("!n");
        e.environment = Some(EnvironmentMetrics {
            temperature: Some(100.0),
            ..EnvironmentMetrics::default()
        });
        r.reconcile(e).await;

        let record = r.db.nodes().get("!n").await.unwrap().unwrap();
        assert_eq!(record.temperature, Some(212.0));
    }

    #[tokio::test]
    async fn test_prime_seeds_known_nodes() {
        let r = reconciler().await;

        let mut known = event("!seed");
        known.short_name = Some("SEED".to_string());
        r.prime(vec![known, event("!other")]).await;

        let snapshot = r.db.nodes().snapshot_all().await.unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(
            r.db.nodes().get("!seed").await.unwrap().unwrap().short_name.as_deref(),
            Some("SEED")
        );
    }

    #[tokio::test]
    async fn test_via_relay_provenance_follows_latest_event() {
        let r = reconciler().await;

        let mut relayed = event("!n");
        relayed.via_relay = true;
        r.reconcile(relayed).await;
        assert!(r.db.nodes().get("!n").await.unwrap().unwrap().via_mqtt);

        // a later direct-radio packet clears the flag
        r.reconcile(event("!n")).await;
        assert!(!r.db.nodes().get("!n").await.unwrap().unwrap().via_mqtt);
    }
}
