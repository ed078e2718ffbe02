use crate::clusterer::types::ClusterCenter;
use crate::geo::KM_PER_DEGREE;

/// Scale factors applied to each dimension before taking the Euclidean norm
///
/// With the defaults a few hundred meters weigh about as much as one rating
/// point or one price level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceWeights {
    pub km_per_degree: f64,
    pub rating: f64,
    pub price_level: f64,
}

impl Default for DistanceWeights {
    fn default() -> Self {
        Self {
            km_per_degree: KM_PER_DEGREE,
            rating: 2.0,
            price_level: 1.5,
        }
    }
}

impl DistanceWeights {
    /// Weighted distance between two centers
    ///
    /// The longitude delta is corrected by the cosine of the mean latitude,
    /// which keeps the metric symmetric.
    pub fn distance(&self, a: &ClusterCenter, b: &ClusterCenter) -> f64 {
        let mean_lat = ((a.lat + b.lat) / 2.0).to_radians();

        let lat_km = (a.lat - b.lat) * self.km_per_degree;
        let lng_km = (a.lng - b.lng) * self.km_per_degree * mean_lat.cos();
        let rating = (a.rating - b.rating) * self.rating;
        let price = (a.price_level - b.price_level) * self.price_level;

        (lat_km * lat_km + lng_km * lng_km + rating * rating + price * price).sqrt()
    }
}

/// [`DistanceWeights::distance`] with the default weights
pub fn weighted_distance(a: &ClusterCenter, b: &ClusterCenter) -> f64 {
    DistanceWeights::default().distance(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn center(lat: f64, lng: f64, rating: f64, price_level: f64) -> ClusterCenter {
        ClusterCenter {
            lat,
            lng,
            rating,
            price_level,
        }
    }

    #[test]
    fn test_identical_points_are_zero() {
        let a = center(40.0, -73.0, 4.5, 2.0);
        assert_eq!(weighted_distance(&a, &a), 0.0);
    }

    #[test]
    fn test_rating_only_difference() {
        let a = center(10.0, 10.0, 3.0, 2.0);
        let b = center(10.0, 10.0, 4.0, 2.0);
        assert!((weighted_distance(&a, &b) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_price_only_difference() {
        let a = center(10.0, 10.0, 3.0, 1.0);
        let b = center(10.0, 10.0, 3.0, 3.0);
        assert!((weighted_distance(&a, &b) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_latitude_degree_is_111_km() {
        let a = center(0.0, 0.0, 4.0, 2.0);
        let b = center(1.0, 0.0, 4.0, 2.0);
        assert!((weighted_distance(&a, &b) - 111.0).abs() < 1e-9);
    }

    #[test]
    fn test_longitude_shrinks_towards_poles() {
        let equator = weighted_distance(&center(0.0, 0.0, 4.0, 2.0), &center(0.0, 1.0, 4.0, 2.0));
        let north = weighted_distance(&center(60.0, 0.0, 4.0, 2.0), &center(60.0, 1.0, 4.0, 2.0));
        assert!((north - equator / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_custom_weights() {
        let weights = DistanceWeights {
            km_per_degree: 111.0,
            rating: 10.0,
            price_level: 0.0,
        };
        let a = center(5.0, 5.0, 3.0, 1.0);
        let b = center(5.0, 5.0, 4.0, 4.0);
        assert!((weights.distance(&a, &b) - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_nan_propagates() {
        let a = center(f64::NAN, 0.0, 4.0, 2.0);
        let b = center(0.0, 0.0, 4.0, 2.0);
        assert!(weighted_distance(&a, &b).is_nan());
    }

    proptest! {
        #[test]
        fn prop_distance_is_symmetric(
            lat1 in -80.0f64..80.0, lng1 in -180.0f64..180.0,
            lat2 in -80.0f64..80.0, lng2 in -180.0f64..180.0,
            r1 in 1.0f64..5.0, r2 in 1.0f64..5.0,
            p1 in 1.0f64..4.0, p2 in 1.0f64..4.0,
        ) {
            let a = center(lat1, lng1, r1, p1);
            let b = center(lat2, lng2, r2, p2);
            prop_assert_eq!(weighted_distance(&a, &b), weighted_distance(&b, &a));
        }

        #[test]
        fn prop_distance_is_non_negative(
            lat1 in -80.0f64..80.0, lng1 in -180.0f64..180.0,
            lat2 in -80.0f64..80.0, lng2 in -180.0f64..180.0,
        ) {
            let a = center(lat1, lng1, 3.0, 2.0);
            let b = center(lat2, lng2, 4.0, 1.0);
            prop_assert!(weighted_distance(&a, &b) >= 0.0);
        }
    }
}
