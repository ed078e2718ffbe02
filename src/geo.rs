use serde::{Deserialize, Serialize};

/// Mean Earth radius in kilometers
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Kilometers per degree of latitude
pub const KM_PER_DEGREE: f64 = 111.0;

/// Radius of the pre-filter applied around a caller-supplied location
pub const DEFAULT_SEARCH_RADIUS_KM: f64 = 50.0;

/// A latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Great-circle distance between two points, in kilometers
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Axis-aligned lat/lng box used to pre-filter restaurants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// Box spanning roughly `radius_km` in every direction from `center`
    ///
    /// The longitude span widens with latitude to follow meridian convergence.
    pub fn around(center: GeoPoint, radius_km: f64) -> Self {
        let lat_span = radius_km / KM_PER_DEGREE;
        let lng_span = radius_km / (KM_PER_DEGREE * center.lat.to_radians().cos());

        Self {
            min_lat: center.lat - lat_span,
            max_lat: center.lat + lat_span,
            min_lng: center.lng - lng_span,
            max_lng: center.lng + lng_span,
        }
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        point.lat >= self.min_lat
            && point.lat <= self.max_lat
            && point.lng >= self.min_lng
            && point.lng <= self.max_lng
    }
}
