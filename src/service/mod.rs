//! Clustering orchestration: authenticate, load, cluster, analyze, persist.

mod error;
mod types;


pub use error::ServiceError;
pub use types::{
    Algorithm, ClusteringHistory, ClusteringRequest, ClusteringResponse, ErrorBody,
    HistoryAnalytics, DEFAULT_K,
};

use chrono::{SubsecRound, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::clusterer::{ClusterTag, DEFAULT_MAX_ITERATIONS, analyze_clusters, dbscan, kmeans};
use crate::db::{ClusteringRecord, RestaurantDB};
use crate::geo::{BoundingBox, DEFAULT_SEARCH_RADIUS_KM};
use crate::restaurant::{ClusteredRestaurant, Restaurant};
use crate::security::BearerAuth;

/// Above this many restaurants `auto` runs DBSCAN
pub const AUTO_DBSCAN_THRESHOLD: usize = 100;

/// Number of records returned by [`ClusteringService::history`]
pub const HISTORY_LIMIT: usize = 10;

/// Concrete algorithm and parameters chosen for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlgorithmChoice {
    KMeans { k: usize },
    Dbscan,
}

impl AlgorithmChoice {
    pub fn algorithm(self) -> Algorithm {
        match self {
            AlgorithmChoice::KMeans { .. } => Algorithm::Kmeans,
            AlgorithmChoice::Dbscan => Algorithm::Dbscan,
        }
    }
}

/// Resolve `auto` by dataset size
///
/// Large datasets go to DBSCAN; otherwise k-means with k capped at half the
/// restaurant count (and never below 1).
pub fn select_algorithm(
    requested: Algorithm,
    restaurant_count: usize,
    k: usize,
) -> AlgorithmChoice {
    match requested {
        Algorithm::Kmeans => AlgorithmChoice::KMeans { k },
        Algorithm::Dbscan => AlgorithmChoice::Dbscan,
        Algorithm::Auto if restaurant_count > AUTO_DBSCAN_THRESHOLD => AlgorithmChoice::Dbscan,
        Algorithm::Auto => AlgorithmChoice::KMeans {
            k: k.min(restaurant_count / 2).max(1),
        },
    }
}

pub struct ClusteringService {
    db: RestaurantDB,
    auth: BearerAuth,
    default_seed: Option<u64>,
}

impl ClusteringService {
    pub fn new(db: RestaurantDB, auth: BearerAuth) -> Self {
        Self {
            db,
            auth,
            default_seed: None,
        }
    }

    /// Seed used when a request does not carry its own
    pub fn with_default_seed(mut self, seed: Option<u64>) -> Self {
        self.default_seed = seed;
        self
    }

    pub fn db(&self) -> &RestaurantDB {
        &self.db
    }

    /// Run one clustering pass and persist its statistics
    pub fn cluster(
        &self,
        authorization: Option<&str>,
        request: &ClusteringRequest,
    ) -> Result<ClusteringResponse, ServiceError> {
        let claims = self.auth.verify(authorization)?;
        validate(request)?;

        let bounds = request
            .location
            .map(|center| BoundingBox::around(center, DEFAULT_SEARCH_RADIUS_KM));
        let restaurants = self.db.find_restaurants(bounds.as_ref())?;

        if restaurants.is_empty() {
            return Err(ServiceError::NotFound);
        }

        let choice = select_algorithm(request.algorithm, restaurants.len(), request.k);
        debug!(
            ?choice,
            requested = %request.algorithm,
            n = restaurants.len(),
            user = claims.user_id.as_deref().unwrap_or("-"),
            "selected algorithm"
        );

        let annotated = match choice {
            AlgorithmChoice::KMeans { k } => {
                let seed = request
                    .seed
                    .or(self.default_seed)
                    .unwrap_or_else(rand::random);
                let result = kmeans(&restaurants, k, DEFAULT_MAX_ITERATIONS, seed)?;
                info!(
                    k,
                    seed,
                    iterations = result.iterations,
                    converged = result.converged,
                    "k-means complete"
                );

                let labels = result.assignments.iter().zip(&result.distances);
                annotate(&restaurants, labels, |(&c, &d)| {
                    (ClusterTag::Assigned(c), Some(d), None)
                })
            }
            AlgorithmChoice::Dbscan => {
                let result = dbscan(&restaurants, request.eps, request.min_pts)?;
                info!(
                    eps = request.eps,
                    min_pts = request.min_pts,
                    clusters = result.cluster_count,
                    noise = result.noise_count(),
                    "dbscan complete"
                );

                annotate(&restaurants, result.tags.iter(), |&tag| {
                    (tag, None, Some(tag.is_noise()))
                })
            }
        };

        let tags: Vec<ClusterTag> = annotated.iter().map(|r| r.cluster).collect();
        let clusters = analyze_clusters(&restaurants, &tags);

        let record = ClusteringRecord {
            id: Uuid::new_v4(),
            timestamp: Utc::now().trunc_subsecs(6),
            algorithm: choice.algorithm().to_string(),
            parameters: request.parameters(),
            total_restaurants: restaurants.len(),
            clusters_found: clusters.len(),
            location: request.location,
            results: clusters.clone(),
        };
        self.db.insert_clustering_result(&record)?;

        info!(
            id = %record.id,
            algorithm = %record.algorithm,
            restaurants = record.total_restaurants,
            clusters = record.clusters_found,
            "clustering run stored"
        );

        Ok(ClusteringResponse {
            success: true,
            algorithm: choice.algorithm(),
            total_restaurants: restaurants.len(),
            clusters_found: clusters.len(),
            clusters,
            restaurants: annotated,
            parameters: request.parameters(),
            record_id: record.id,
        })
    }

    /// Recent runs plus aggregate usage
    pub fn history(&self, authorization: Option<&str>) -> Result<ClusteringHistory, ServiceError> {
        self.auth.verify(authorization)?;

        let recent_results = self.db.recent_clustering_results(HISTORY_LIMIT)?;
        let total_clustering_operations = self.db.clustering_result_count()?;
        let algorithm_usage = self.db.algorithm_usage()?;

        let average_clusters_found = if recent_results.is_empty() {
            0.0
        } else {
            recent_results
                .iter()
                .map(|r| r.clusters_found as f64)
                .sum::<f64>()
                / recent_results.len() as f64
        };

        Ok(ClusteringHistory {
            success: true,
            recent_results,
            analytics: HistoryAnalytics {
                total_clustering_operations,
                algorithm_usage,
                average_clusters_found,
            },
        })
    }

    /// The most recent run, if any
    pub fn latest(
        &self,
        authorization: Option<&str>,
    ) -> Result<Option<ClusteringRecord>, ServiceError> {
        self.auth.verify(authorization)?;
        Ok(self.db.latest_clustering_result()?)
    }
}

fn validate(request: &ClusteringRequest) -> Result<(), ServiceError> {
    if request.k == 0 {
        return Err(ServiceError::InvalidRequest("k must be at least 1".to_string()));
    }
    if !request.eps.is_finite() || request.eps < 0.0 {
        return Err(ServiceError::InvalidRequest(format!(
            "eps must be a non-negative distance in km, got {}",
            request.eps
        )));
    }
    if let Some(location) = request.location {
        if !(-90.0..=90.0).contains(&location.lat) || !(-180.0..=180.0).contains(&location.lng) {
            return Err(ServiceError::InvalidRequest(format!(
                "location out of range: ({}, {})",
                location.lat, location.lng
            )));
        }
    }
    Ok(())
}

/// Pair each restaurant with its per-algorithm annotation
fn annotate<I, F>(
    restaurants: &[Restaurant],
    labels: I,
    mut tag: F,
) -> Vec<ClusteredRestaurant>
where
    I: Iterator,
    F: FnMut(I::Item) -> (ClusterTag, Option<f64>, Option<bool>),
{
    restaurants
        .iter()
        .zip(labels)
        .map(|(restaurant, label)| {
            let (cluster, distance_to_center, is_noise) = tag(label);
            ClusteredRestaurant {
                restaurant: restaurant.clone(),
                cluster,
                distance_to_center,
                is_noise,
            }
        })
        .collect()
}
