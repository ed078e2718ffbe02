use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::clusterer::types::{ClusterId, ClusterTag};
use crate::restaurant::Restaurant;

/// Aggregate view of one cluster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStats {
    pub size: usize,
    pub avg_rating: f64,
    pub avg_price_level: f64,
    pub center_lat: f64,
    pub center_lng: f64,
    pub cuisines: BTreeSet<String>,
    pub features: BTreeSet<String>,
    pub restaurant_ids: Vec<String>,
}

#[derive(Default)]
struct Accumulator {
    rating: f64,
    price_level: f64,
    lat: f64,
    lng: f64,
    cuisines: BTreeSet<String>,
    features: BTreeSet<String>,
    restaurant_ids: Vec<String>,
}

impl Accumulator {
    fn add(&mut self, restaurant: &Restaurant) {
        self.rating += restaurant.rating;
        self.price_level += f64::from(restaurant.price_level);
        self.lat += restaurant.latitude;
        self.lng += restaurant.longitude;
        self.cuisines.extend(restaurant.cuisine.iter().cloned());
        self.features.extend(restaurant.features.iter().cloned());
        self.restaurant_ids.push(restaurant.id.clone());
    }

    fn finish(self) -> ClusterStats {
        let size = self.restaurant_ids.len();
        let n = size as f64;

        ClusterStats {
            size,
            avg_rating: self.rating / n,
            avg_price_level: self.price_level / n,
            center_lat: self.lat / n,
            center_lng: self.lng / n,
            cuisines: self.cuisines,
            features: self.features,
            restaurant_ids: self.restaurant_ids,
        }
    }
}

/// Per-cluster statistics for restaurants tagged by either algorithm
///
/// `tags` is indexed like `restaurants`. Noise and unassigned restaurants are
/// left out of every cluster.
pub fn analyze_clusters(
    restaurants: &[Restaurant],
    tags: &[ClusterTag],
) -> BTreeMap<ClusterId, ClusterStats> {
    let mut groups: BTreeMap<ClusterId, Accumulator> = BTreeMap::new();

    for (restaurant, tag) in restaurants.iter().zip(tags) {
        if let Some(id) = tag.cluster_id() {
            groups.entry(id).or_default().add(restaurant);
        }
    }

    groups
        .into_iter()
        .map(|(id, acc)| (id, acc.finish()))
        .collect()
}
