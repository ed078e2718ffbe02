use std::collections::HashSet;

use tracing::debug;

use crate::clusterer::{error::ClusteringError, types::ClusterTag};
use crate::geo::{GeoPoint, haversine_km};
use crate::restaurant::Restaurant;

/// Default neighbourhood radius in kilometers
pub const DEFAULT_EPS_KM: f64 = 2.0;

/// Default neighbour count for a core point
pub const DEFAULT_MIN_PTS: usize = 3;

/// Outcome of a DBSCAN run, indexed like the input slice
#[derive(Debug, Clone, PartialEq)]
pub struct DbscanResult {
    /// Either `Assigned` or `Noise` for every restaurant
    pub tags: Vec<ClusterTag>,
    pub cluster_count: usize,
}

impl DbscanResult {
    pub fn noise_count(&self) -> usize {
        self.tags.iter().filter(|t| t.is_noise()).count()
    }
}

/// Density-based clustering over restaurant locations
///
/// A restaurant is core when at least `min_pts` other restaurants lie within
/// `eps_km` of it (great-circle distance). Restaurants reachable from no core
/// point end up as noise; an all-noise result is valid.
pub fn dbscan(
    restaurants: &[Restaurant],
    eps_km: f64,
    min_pts: usize,
) -> Result<DbscanResult, ClusteringError> {
    if !eps_km.is_finite() || eps_km < 0.0 {
        return Err(ClusteringError::InvalidParameter {
            name: "eps",
            message: format!("must be a non-negative distance in km, got {}", eps_km),
        });
    }

    let points: Vec<GeoPoint> = restaurants
        .iter()
        .map(|r| GeoPoint::new(r.latitude, r.longitude))
        .collect();
    let n = points.len();

    let mut tags = vec![ClusterTag::Unassigned; n];
    let mut cluster_id = 0;

    for i in 0..n {
        if tags[i] != ClusterTag::Unassigned {
            continue;
        }

        let neighbors = region_query(&points, i, eps_km);
        if neighbors.len() < min_pts {
            // May still be claimed as a border point by a later cluster
            tags[i] = ClusterTag::Noise;
            continue;
        }

        tags[i] = ClusterTag::Assigned(cluster_id);

        let mut queued: HashSet<usize> = neighbors.iter().copied().collect();
        let mut seeds = neighbors;
        let mut cursor = 0;

        while cursor < seeds.len() {
            let q = seeds[cursor];
            cursor += 1;

            if tags[q] == ClusterTag::Noise {
                tags[q] = ClusterTag::Assigned(cluster_id);
            }
            if tags[q] != ClusterTag::Unassigned {
                continue;
            }

            tags[q] = ClusterTag::Assigned(cluster_id);

            let q_neighbors = region_query(&points, q, eps_km);
            if q_neighbors.len() >= min_pts {
                for nn in q_neighbors {
                    if queued.insert(nn) {
                        seeds.push(nn);
                    }
                }
            }
        }

        cluster_id += 1;
    }

    let result = DbscanResult {
        tags,
        cluster_count: cluster_id,
    };

    debug!(
        n,
        eps_km,
        min_pts,
        clusters = result.cluster_count,
        noise = result.noise_count(),
        "dbscan finished"
    );

    Ok(result)
}

/// Indices of every other point within `eps_km` of `points[index]`
///
/// Linear scan; DBSCAN as a whole is O(n^2). Panics if `index` is out of
/// bounds.
pub(crate) fn region_query(points: &[GeoPoint], index: usize, eps_km: f64) -> Vec<usize> {
    let origin = points[index];
    points
        .iter()
        .enumerate()
        .filter(|&(j, p)| j != index && haversine_km(origin, *p) <= eps_km)
        .map(|(j, _)| j)
        .collect()
}
