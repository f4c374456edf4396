// Great-circle distance between two coordinates (haversine)

use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A point on the globe, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    #[serde(alias = "log", alias = "lng")]
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Coordinates { lat, lon }
    }

    /// Latitude in [-90, 90] and longitude in [-180, 180]. NaN is never valid.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Distance in kilometres between `a` and `b`.
///
/// Symmetric, zero for identical points, never negative. NaN inputs give a NaN
/// result instead of an error.
///
/// ```
/// use santa_route::geo::{distance_km, Coordinates};
///
/// // One degree of latitude is roughly 111 km
/// let d = distance_km(Coordinates::new(40.0, -3.0), Coordinates::new(39.0, -3.0));
/// assert!((d - 111.19).abs() < 0.1);
/// ```
pub fn distance_km(a: Coordinates, b: Coordinates) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}
