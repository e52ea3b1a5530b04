use serde::{Deserialize, Serialize};

/// Earth radius in the same unit as jitter distances and precision settings.
pub const EARTH_RADIUS: f64 = 6371.0;

/// Below this distance `add_offset` leaves the position untouched.
const MIN_OFFSET: f64 = 0.000_001;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPosition {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPosition {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Move `position` along a great circle by `distance` on initial `bearing`
/// (degrees true).
pub fn add_offset(position: GeoPosition, bearing: f64, distance: f64) -> GeoPosition {
    if distance < MIN_OFFSET {
        return position;
    }

    let lat = position.lat.to_radians();
    let lon = position.lon.to_radians();
    let brg = bearing.to_radians();

    let angular = distance / EARTH_RADIUS;
    let (sin_d, cos_d) = angular.sin_cos();

    let lat2 = (lat.sin() * cos_d + lat.cos() * sin_d * brg.cos()).asin();
    let lon2 = lon + (brg.sin() * sin_d * lat.cos()).atan2(cos_d - lat.sin() * lat2.sin());

    GeoPosition {
        lat: lat2.to_degrees(),
        lon: lon2.to_degrees(),
    }
}
