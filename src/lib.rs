// Public API exports
pub mod clusterer;
pub mod config;
pub mod db;
pub mod geo;
pub mod restaurant;
pub mod security;
pub mod service;

// Re-export main types for convenience
pub use clusterer::{
    ClusterStats, ClusterTag, ClusteringError, DbscanResult, KMeansResult, analyze_clusters,
    dbscan, kmeans,
};
pub use config::Config;
pub use db::{ClusteringRecord, RestaurantDB};
pub use geo::{BoundingBox, GeoPoint};
pub use restaurant::{ClusteredRestaurant, Restaurant};
pub use security::{AuthError, BearerAuth, Claims};
pub use service::{
    Algorithm, ClusteringHistory, ClusteringRequest, ClusteringResponse, ClusteringService,
    ServiceError,
};
