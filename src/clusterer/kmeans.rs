use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::clusterer::{
    centroid::recompute_centroids,
    distance::weighted_distance,
    error::ClusteringError,
    types::{ClusterCenter, ClusterId, FeatureVector},
};
use crate::restaurant::Restaurant;

/// Default cap on Lloyd iterations
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Outcome of a k-means run, indexed like the input slice
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansResult {
    pub assignments: Vec<ClusterId>,
    /// Distance from each restaurant to its final centroid
    pub distances: Vec<f64>,
    pub centroids: Vec<ClusterCenter>,
    pub iterations: usize,
    pub converged: bool,
}

/// Partition restaurants into `k` clusters with a reproducible seed
pub fn kmeans(
    restaurants: &[Restaurant],
    k: usize,
    max_iters: usize,
    seed: u64,
) -> Result<KMeansResult, ClusteringError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    kmeans_with_rng(restaurants, k, max_iters, &mut rng)
}

/// Partition restaurants into `k` clusters drawing randomness from `rng`
///
/// With fewer restaurants than `k` every restaurant becomes its own cluster.
pub fn kmeans_with_rng<R: Rng + ?Sized>(
    restaurants: &[Restaurant],
    k: usize,
    max_iters: usize,
    rng: &mut R,
) -> Result<KMeansResult, ClusteringError> {
    if k == 0 {
        return Err(ClusteringError::InvalidParameter {
            name: "k",
            message: "must be at least 1".to_string(),
        });
    }

    let features: Vec<FeatureVector> = restaurants
        .iter()
        .map(FeatureVector::from_restaurant)
        .collect();
    let n = features.len();

    if n < k {
        debug!(n, k, "fewer restaurants than clusters, using singleton clusters");
        return Ok(KMeansResult {
            assignments: (0..n).collect(),
            distances: vec![0.0; n],
            centroids: features.iter().map(FeatureVector::as_center).collect(),
            iterations: 0,
            converged: true,
        });
    }

    // 1. K-means++ seeding
    let mut centroids = init_centroids(&features, k, rng);

    let mut assignments = vec![0usize; n];
    let mut iterations = 0;
    let mut converged = false;

    for _ in 0..max_iters {
        iterations += 1;

        // 2. Assign each restaurant to its nearest centroid
        let mut changed = false;
        for (i, feature) in features.iter().enumerate() {
            let (best, _) = nearest_centroid(&feature.as_center(), &centroids);
            if assignments[i] != best {
                changed = true;
                assignments[i] = best;
            }
        }

        if !changed {
            converged = true;
            break;
        }

        // 3. Recompute centroids from the new assignment
        centroids = recompute_centroids(&features, &assignments, &centroids);
    }

    let distances = features
        .iter()
        .zip(&assignments)
        .map(|(f, &c)| weighted_distance(&f.as_center(), &centroids[c]))
        .collect();

    debug!(n, k, iterations, converged, "k-means finished");

    Ok(KMeansResult {
        assignments,
        distances,
        centroids,
        iterations,
        converged,
    })
}

/// Index of and distance to the closest centroid
///
/// Ties go to the lowest index.
pub fn nearest_centroid(point: &ClusterCenter, centroids: &[ClusterCenter]) -> (ClusterId, f64) {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;

    for (c, center) in centroids.iter().enumerate() {
        let d = weighted_distance(point, center);
        if d < best_dist {
            best_dist = d;
            best = c;
        }
    }

    (best, best_dist)
}

/// One assignment pass of every restaurant against fixed centroids
pub fn assign_to_nearest(
    restaurants: &[Restaurant],
    centroids: &[ClusterCenter],
) -> Vec<ClusterId> {
    restaurants
        .iter()
        .map(|r| nearest_centroid(&FeatureVector::from_restaurant(r).as_center(), centroids).0)
        .collect()
}

/// K-means++: spread the initial centroids by sampling proportional to D(x)^2
fn init_centroids<R: Rng + ?Sized>(
    features: &[FeatureVector],
    k: usize,
    rng: &mut R,
) -> Vec<ClusterCenter> {
    let n = features.len();
    let mut centroids = Vec::with_capacity(k);

    let first = rng.random_range(0..n);
    centroids.push(features[first].as_center());

    while centroids.len() < k {
        let weights: Vec<f64> = features
            .iter()
            .map(|f| {
                let d = nearest_centroid(&f.as_center(), &centroids).1;
                d * d
            })
            .collect();

        let total: f64 = weights.iter().sum();
        let threshold = rng.random::<f64>() * total;

        // Falls back to the last point if rounding keeps the sum below the threshold
        let mut selected = n - 1;
        let mut cumulative = 0.0;
        for (j, w) in weights.iter().enumerate() {
            cumulative += w;
            if cumulative >= threshold {
                selected = j;
                break;
            }
        }

        centroids.push(features[selected].as_center());
    }

    centroids
}
