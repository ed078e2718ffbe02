use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clusterer::{ClusterId, ClusterStats, DEFAULT_EPS_KM, DEFAULT_MIN_PTS};
use crate::db::{AlgorithmUsage, ClusteringParameters, ClusteringRecord};
use crate::geo::GeoPoint;
use crate::restaurant::ClusteredRestaurant;

/// Default number of k-means clusters
pub const DEFAULT_K: usize = 5;

/// Algorithm requested by the caller
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    #[default]
    Kmeans,
    Dbscan,
    /// Pick by dataset size
    Auto,
}

impl Algorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::Kmeans => "kmeans",
            Algorithm::Dbscan => "dbscan",
            Algorithm::Auto => "auto",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of a clustering request; every field is optional on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClusteringRequest {
    pub algorithm: Algorithm,
    pub k: usize,
    /// DBSCAN neighbourhood radius in km
    pub eps: f64,
    pub min_pts: usize,
    /// Restrict to restaurants within ~50 km of this point
    pub location: Option<GeoPoint>,
    /// K-means++ seed; random when absent
    pub seed: Option<u64>,
}

impl Default for ClusteringRequest {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            k: DEFAULT_K,
            eps: DEFAULT_EPS_KM,
            min_pts: DEFAULT_MIN_PTS,
            location: None,
            seed: None,
        }
    }
}

impl ClusteringRequest {
    pub fn parameters(&self) -> ClusteringParameters {
        ClusteringParameters {
            k: self.k,
            eps: self.eps,
            min_pts: self.min_pts,
        }
    }
}

/// Result of a clustering run as returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusteringResponse {
    pub success: bool,
    /// Algorithm actually run, never `auto`
    pub algorithm: Algorithm,
    pub total_restaurants: usize,
    pub clusters_found: usize,
    pub clusters: BTreeMap<ClusterId, ClusterStats>,
    pub restaurants: Vec<ClusteredRestaurant>,
    pub parameters: ClusteringParameters,
    pub record_id: Uuid,
}

/// Aggregates over the stored clustering runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryAnalytics {
    pub total_clustering_operations: u32,
    pub algorithm_usage: Vec<AlgorithmUsage>,
    /// Mean `clusters_found` over `recent_results`
    pub average_clusters_found: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusteringHistory {
    pub success: bool,
    pub recent_results: Vec<ClusteringRecord>,
    pub analytics: HistoryAnalytics,
}

/// JSON body reported for a failed request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
