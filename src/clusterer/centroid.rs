use crate::clusterer::types::{ClusterCenter, FeatureVector};

/// Mean of {lat, lng, rating, price_level} over `members`
///
/// Returns `None` for an empty member set.
pub fn compute_centroid(members: &[&FeatureVector]) -> Option<ClusterCenter> {
    if members.is_empty() {
        return None;
    }

    let mut out = ClusterCenter {
        lat: 0.0,
        lng: 0.0,
        rating: 0.0,
        price_level: 0.0,
    };

    for v in members {
        out.lat += v.lat;
        out.lng += v.lng;
        out.rating += v.rating;
        out.price_level += v.price_level;
    }

    let n = members.len() as f64;
    out.lat /= n;
    out.lng /= n;
    out.rating /= n;
    out.price_level /= n;

    Some(out)
}

/// Next generation of centroids for the given assignment
///
/// Clusters that lost every member keep their previous centroid.
pub fn recompute_centroids(
    features: &[FeatureVector],
    assignments: &[usize],
    previous: &[ClusterCenter],
) -> Vec<ClusterCenter> {
    previous
        .iter()
        .enumerate()
        .map(|(c, old)| {
            let members: Vec<&FeatureVector> = features
                .iter()
                .zip(assignments)
                .filter(|&(_, a)| *a == c)
                .map(|(f, _)| f)
                .collect();

            compute_centroid(&members).unwrap_or(*old)
        })
        .collect()
}
