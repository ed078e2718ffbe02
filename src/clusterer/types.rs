use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;
use crate::restaurant::Restaurant;

/// Identifier of a cluster within a single clustering run
pub type ClusterId = usize;

/// Wire value for a point DBSCAN has not reached yet
pub const UNASSIGNED: i64 = -1;

/// Wire value for a point DBSCAN classified as noise
pub const NOISE: i64 = -2;

/// Cluster membership of a single restaurant
///
/// Serialized as a plain integer: the cluster id, or one of the negative
/// sentinels [`UNASSIGNED`] and [`NOISE`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i64", try_from = "i64")]
pub enum ClusterTag {
    Assigned(ClusterId),
    Noise,
    Unassigned,
}

impl ClusterTag {
    /// The cluster id, or `None` for either sentinel
    pub fn cluster_id(self) -> Option<ClusterId> {
        match self {
            ClusterTag::Assigned(id) => Some(id),
            ClusterTag::Noise | ClusterTag::Unassigned => None,
        }
    }

    pub fn is_noise(self) -> bool {
        self == ClusterTag::Noise
    }
}

impl From<ClusterTag> for i64 {
    fn from(tag: ClusterTag) -> i64 {
        match tag {
            ClusterTag::Assigned(id) => id as i64,
            ClusterTag::Noise => NOISE,
            ClusterTag::Unassigned => UNASSIGNED,
        }
    }
}

impl TryFrom<i64> for ClusterTag {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            NOISE => Ok(ClusterTag::Noise),
            UNASSIGNED => Ok(ClusterTag::Unassigned),
            id if id >= 0 => Ok(ClusterTag::Assigned(id as ClusterId)),
            other => Err(format!("invalid cluster tag: {}", other)),
        }
    }
}

/// Numeric projection of a restaurant used during k-means
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    pub lat: f64,
    pub lng: f64,
    pub rating: f64,
    pub price_level: f64,
    pub cuisine_count: f64,
    /// ln(review_count + 1)
    pub review_weight: f64,
    pub feature_count: f64,
    pub open_hours_count: f64,
}

impl FeatureVector {
    pub fn from_restaurant(restaurant: &Restaurant) -> Self {
        Self {
            lat: restaurant.latitude,
            lng: restaurant.longitude,
            rating: restaurant.rating,
            price_level: f64::from(restaurant.price_level),
            cuisine_count: restaurant.cuisine.len() as f64,
            review_weight: (f64::from(restaurant.review_count) + 1.0).ln(),
            feature_count: restaurant.features.len() as f64,
            open_hours_count: restaurant.opening_hours.len() as f64,
        }
    }

    /// The part of the vector the distance metric compares against centroids
    pub fn as_center(&self) -> ClusterCenter {
        ClusterCenter {
            lat: self.lat,
            lng: self.lng,
            rating: self.rating,
            price_level: self.price_level,
        }
    }

    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}

/// Centroid of a k-means cluster
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCenter {
    pub lat: f64,
    pub lng: f64,
    pub rating: f64,
    pub price_level: f64,
}
