//! # Collector Configuration
//!
//! Configuration for the collector daemon.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     MESH_COLLECTOR_DB=/var/lib/mesh/telemetry.db                       │
//! │     MESH_COLLECTOR_UPLINK=https://aggregator.example/sync              │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     argv[1], or $MESH_COLLECTOR_CONFIG, or ./collector.toml            │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     Everything except [base], which is required                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [base]
//! latitude = 43.6008608
//! longitude = -116.2750972
//! radius_miles = 100.0
//!
//! [database]
//! path = "mesh-telemetry.db"
//!
//! [http]
//! bind_addr = "0.0.0.0"
//! port = 8080
//!
//! [uplink]                     # omit the whole section to disable export
//! endpoint = "https://aggregator.example/sync"
//! interval_secs = 120
//! shutdown_timeout_secs = 15
//!
//! [display]
//! timezone = "UTC"
//!
//! [ingest]
//! temperature_unit = "celsius"
//! ```
//!
//! A missing or invalid `[base]` section is fatal at startup: without a
//! base location no distance can be derived, and everything downstream of
//! that is wrong. All other errors after startup are contained per event.

use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use mesh_core::units;
use mesh_ingest::TemperatureUnit;

// =============================================================================
// Sections
// =============================================================================

/// Base station location and proximity radius.
#[derive(Debug, Clone, Deserialize)]
pub struct BaseSection {
    /// Base station latitude in decimal degrees.
    pub latitude: f64,

    /// Base station longitude in decimal degrees.
    pub longitude: f64,

    /// Radius of the "close" bucket, in miles.
    #[serde(default = "default_radius_miles")]
    pub radius_miles: f64,
}

fn default_radius_miles() -> f64 {
    100.0
}

/// Database file location.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// Path to the SQLite database file.
    pub path: PathBuf,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        DatabaseSection {
            path: PathBuf::from("mesh-telemetry.db"),
        }
    }
}

/// HTTP API listener settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    /// Bind address (default: 0.0.0.0).
    pub bind_addr: String,

    /// Port to listen on.
    pub port: u16,
}

impl Default for HttpSection {
    fn default() -> Self {
        HttpSection {
            bind_addr: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl HttpSection {
    /// Returns the full bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}

/// Remote aggregator uplink. Omitting the section disables export.
#[derive(Debug, Clone, Deserialize)]
pub struct UplinkSection {
    /// Aggregator endpoint URL.
    pub endpoint: String,

    /// Seconds between export cycles. Clamped to 60..=300.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Bound on the final export pass during shutdown, in seconds.
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

fn default_interval_secs() -> u64 {
    120
}

fn default_shutdown_timeout_secs() -> u64 {
    15
}

impl UplinkSection {
    /// Export interval, clamped into the supported 60-300 second band.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.clamp(60, 300))
    }

    /// Shutdown flush bound.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

/// Display hints passed through to API consumers.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplaySection {
    /// Default timezone name for the UI. The API itself serves UTC
    /// timestamps and relative ages; conversion is the consumer's call.
    pub timezone: String,
}

impl Default for DisplaySection {
    fn default() -> Self {
        DisplaySection {
            timezone: "UTC".to_string(),
        }
    }
}

/// Ingestion behavior.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IngestSection {
    /// Temperature scale readings are stored in.
    pub temperature_unit: TemperatureUnit,
}

// =============================================================================
// Collector Config
// =============================================================================

/// The full collector configuration, loaded once at startup and passed by
/// reference into every component.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    pub base: BaseSection,

    #[serde(default)]
    pub database: DatabaseSection,

    #[serde(default)]
    pub http: HttpSection,

    #[serde(default)]
    pub uplink: Option<UplinkSection>,

    #[serde(default)]
    pub display: DisplaySection,

    #[serde(default)]
    pub ingest: IngestSection,
}

impl CollectorConfig {
    /// Loads, overrides, and validates the configuration. Any failure
    /// here is fatal: the caller exits rather than run misconfigured.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut config: CollectorConfig =
            toml::from_str(&raw).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Applies the supported environment overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = env::var("MESH_COLLECTOR_DB") {
            self.database.path = PathBuf::from(path);
        }

        if let Ok(endpoint) = env::var("MESH_COLLECTOR_UPLINK") {
            match &mut self.uplink {
                Some(uplink) => uplink.endpoint = endpoint,
                None => {
                    self.uplink = Some(UplinkSection {
                        endpoint,
                        interval_secs: default_interval_secs(),
                        shutdown_timeout_secs: default_shutdown_timeout_secs(),
                    })
                }
            }
        }
    }

    /// Validates the merged configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        units::validate_latitude(self.base.latitude).map_err(|e| ConfigError::InvalidValue {
            key: "base.latitude",
            reason: e.to_string(),
        })?;
        units::validate_longitude(self.base.longitude).map_err(|e| ConfigError::InvalidValue {
            key: "base.longitude",
            reason: e.to_string(),
        })?;

        if !self.base.radius_miles.is_finite() || self.base.radius_miles <= 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "base.radius_miles",
                reason: format!("must be a positive number, got {}", self.base.radius_miles),
            });
        }

        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "database.path",
                reason: "must not be empty".to_string(),
            });
        }

        if let Some(uplink) = &self.uplink {
            Url::parse(&uplink.endpoint).map_err(|e| ConfigError::InvalidValue {
                key: "uplink.endpoint",
                reason: e.to_string(),
            })?;
        }

        Ok(())
    }
}

/// Resolves the config file path: `argv[1]`, then `$MESH_COLLECTOR_CONFIG`,
/// then `./collector.toml`.
pub fn config_path() -> PathBuf {
    env::args()
        .nth(1)
        .or_else(|| env::var("MESH_COLLECTOR_CONFIG").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("collector.toml"))
}

// =============================================================================
// Errors
// =============================================================================

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {reason}")]
    ReadFailed { path: String, reason: String },

    #[error("failed to parse config file: {0}")]
    ParseFailed(String),

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

// =============================================================================
// Tests
// =============================================================================
