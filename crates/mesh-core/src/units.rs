//! # Numeric/Unit Normalization
//!
//! Pure functions over incoming scalar readings: fixed-precision rounding,
//! coordinate range validation, temperature scale conversion, and the
//! great-circle distance between two coordinates. No state.
//!
//! ## Precision Classes
//! Readings are rounded before storage so the store never accumulates
//! float noise from the radio side:
//! - telemetry scalars: 2 decimal places
//! - coordinates: 7 decimal places (sub-meter resolution)

use crate::error::{CoreError, CoreResult};
use crate::types::BaseLocation;

/// Decimal places kept for general telemetry scalars.
pub const SCALAR_PRECISION: u32 = 2;

/// Decimal places kept for latitude/longitude.
pub const COORD_PRECISION: u32 = 7;

/// Earth radius used for great-circle distance, in miles.
const EARTH_RADIUS_MILES: f64 = 3959.0;

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Rounds a telemetry scalar to [`SCALAR_PRECISION`] decimal places.
///
/// Rejects NaN and infinities: a reading that is not a finite number is a
/// conversion failure, and the caller skips that single field.
pub fn round_scalar(value: f64) -> CoreResult<f64> {
    if !value.is_finite() {
        return Err(CoreError::NonFinite);
    }
    Ok(round_to(value, SCALAR_PRECISION))
}

/// Rounds a coordinate to [`COORD_PRECISION`] decimal places.
pub fn round_coordinate(value: f64) -> CoreResult<f64> {
    if !value.is_finite() {
        return Err(CoreError::NonFinite);
    }
    Ok(round_to(value, COORD_PRECISION))
}

/// Validates a latitude in decimal degrees.
pub fn validate_latitude(value: f64) -> CoreResult<f64> {
    if !value.is_finite() {
        return Err(CoreError::NonFinite);
    }
    if !(-90.0..=90.0).contains(&value) {
        return Err(CoreError::OutOfRange {
            field: "latitude",
            value,
        });
    }
    Ok(value)
}

/// Validates a longitude in decimal degrees.
pub fn validate_longitude(value: f64) -> CoreResult<f64> {
    if !value.is_finite() {
        return Err(CoreError::NonFinite);
    }
    if !(-180.0..=180.0).contains(&value) {
        return Err(CoreError::OutOfRange {
            field: "longitude",
            value,
        });
    }
    Ok(value)
}

/// Converts a Celsius reading to Fahrenheit.
///
/// Mesh sensors report Celsius; deployments that display Fahrenheit
/// convert at ingestion so the store holds one consistent scale.
pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

/// Great-circle (haversine) distance from the base location to a
/// coordinate, in miles.
pub fn haversine_miles(base: &BaseLocation, latitude: f64, longitude: f64) -> f64 {
    let lat1 = base.latitude.to_radians();
    let lon1 = base.longitude.to_radians();
    let lat2 = latitude.to_radians();
    let lon2 = longitude.to_radians();

    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_MILES * c
}

// =============================================================================
// Tests
// =============================================================================
