mod analyzer;
mod centroid;
mod dbscan;
mod distance;
mod error;
mod kmeans;
mod types;


pub use analyzer::{ClusterStats, analyze_clusters};
pub use dbscan::{DEFAULT_EPS_KM, DEFAULT_MIN_PTS, DbscanResult, dbscan};
pub use distance::{DistanceWeights, weighted_distance};
pub use error::ClusteringError;
pub use kmeans::{
    DEFAULT_MAX_ITERATIONS, KMeansResult, assign_to_nearest, kmeans, kmeans_with_rng,
    nearest_centroid,
};
pub use types::{ClusterCenter, ClusterId, ClusterTag, FeatureVector, NOISE, UNASSIGNED};
