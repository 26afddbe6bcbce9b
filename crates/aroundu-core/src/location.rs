//! Location validation and privacy rounding.
//!
//! Coordinates leave the device only after rounding to three decimal places
//! (roughly 100 m), and only after basic validation.

use aroundu_proto::payloads::session::LocationRegistration;

use crate::error::LocationError;

/// Selectable discovery radii in meters.
pub const RADIUS_PRESETS: [u32; 3] = [500, 1000, 2000];

/// Default discovery radius in meters.
pub const DEFAULT_RADIUS: u32 = 1000;

/// Decimal places kept when transmitting coordinates.
pub const COORDINATE_PRECISION: i32 = 3;

/// Round a coordinate to [`COORDINATE_PRECISION`] decimal places, half away
/// from zero.
pub fn round_coordinate(value: f64) -> f64 {
    let scale = 10f64.powi(COORDINATE_PRECISION);
    (value * scale).round() / scale
}

/// Validate a raw device reading and build the registration payload.
///
/// # Errors
///
/// - `LocationError::NonFinite` for NaN or infinite coordinates
/// - `LocationError::OutOfRange` outside the WGS84 bounds
/// - `LocationError::ZeroRadius` for a zero radius
pub fn registration(lat: f64, lon: f64, radius: u32) -> Result<LocationRegistration, LocationError> {
    if !lat.is_finite() || !lon.is_finite() {
        return Err(LocationError::NonFinite);
    }
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(LocationError::OutOfRange { lat, lon });
    }
    if radius == 0 {
        return Err(LocationError::ZeroRadius);
    }

    Ok(LocationRegistration { lat: round_coordinate(lat), lon: round_coordinate(lon), radius })
}

/// Format a radius the way the picker shows it (`500m`, `1km`, `2km`).
pub fn radius_label(radius: u32) -> String {
    if radius >= 1000 && radius % 1000 == 0 {
        format!("{}km", radius / 1000)
    } else if radius >= 1000 {
        format!("{:.1}km", f64::from(radius) / 1000.0)
    } else {
        format!("{radius}m")
    }
}
