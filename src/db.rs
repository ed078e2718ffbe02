use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::clusterer::{ClusterId, ClusterStats};
use crate::geo::{BoundingBox, GeoPoint};
use crate::restaurant::Restaurant;

/// Parameters a clustering run was requested with
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusteringParameters {
    pub k: usize,
    pub eps: f64,
    pub min_pts: usize,
}

/// One persisted clustering run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusteringRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub algorithm: String,
    pub parameters: ClusteringParameters,
    pub total_restaurants: usize,
    pub clusters_found: usize,
    pub location: Option<GeoPoint>,
    pub results: BTreeMap<ClusterId, ClusterStats>,
}

/// Number of runs recorded per algorithm
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmUsage {
    pub algorithm: String,
    pub count: u32,
}

pub struct RestaurantDB {
    conn: Connection,
}

impl RestaurantDB {
    /// Create a new in-memory database
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to create in-memory database")?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Open (or create) a database file
    pub fn open(path: &str) -> Result<Self> {
        let conn =
            Connection::open(path).context(format!("Failed to open database at {}", path))?;
        let db = Self { conn };
        db.init_schema()?;
        info!(path, "opened restaurant database");
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                r#"
            CREATE TABLE IF NOT EXISTS restaurants (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                rating REAL NOT NULL,
                price_level INTEGER NOT NULL,
                cuisine TEXT NOT NULL DEFAULT '[]',
                features TEXT NOT NULL DEFAULT '[]',
                opening_hours TEXT NOT NULL DEFAULT '[]',
                review_count INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS clustering_results (
                id TEXT PRIMARY KEY,
                timestamp TEXT NOT NULL,
                algorithm TEXT NOT NULL,
                parameters TEXT NOT NULL,
                total_restaurants INTEGER NOT NULL,
                clusters_found INTEGER NOT NULL,
                location TEXT,
                results TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_restaurants_location ON restaurants(latitude, longitude);
            CREATE INDEX IF NOT EXISTS idx_results_timestamp ON clustering_results(timestamp);
            "#,
            )
            .context("Failed to initialize database schema")?;
        Ok(())
    }

    /// Insert or replace many restaurants in one transaction
    pub fn insert_restaurants(&mut self, restaurants: &[Restaurant]) -> Result<usize> {
        let tx = self
            .conn
            .transaction()
            .context("Failed to start transaction")?;

        for restaurant in restaurants {
            insert_restaurant_with(&tx, restaurant)?;
        }

        tx.commit().context("Failed to commit restaurants")?;
        info!(count = restaurants.len(), "imported restaurants");
        Ok(restaurants.len())
    }

    /// All restaurants, optionally restricted to a bounding box
    pub fn find_restaurants(&self, bounds: Option<&BoundingBox>) -> Result<Vec<Restaurant>> {
        const COLUMNS: &str = "SELECT id, name, latitude, longitude, rating, price_level, cuisine, features, opening_hours, review_count FROM restaurants";

        let restaurants = match bounds {
            Some(b) => {
                let mut stmt = self
                    .conn
                    .prepare(&format!(
                        "{} WHERE latitude BETWEEN ?1 AND ?2 AND longitude BETWEEN ?3 AND ?4 ORDER BY id",
                        COLUMNS
                    ))
                    .context("Failed to prepare statement")?;

                let rows = stmt
                    .query_map(
                        params![b.min_lat, b.max_lat, b.min_lng, b.max_lng],
                        restaurant_from_row,
                    )
                    .context("Failed to query restaurants")?
                    .collect::<Result<Vec<_>, _>>()
                    .context("Failed to collect restaurants")?;
                rows
            }
            None => {
                let mut stmt = self
                    .conn
                    .prepare(&format!("{} ORDER BY id", COLUMNS))
                    .context("Failed to prepare statement")?;

                let rows = stmt
                    .query_map([], restaurant_from_row)
                    .context("Failed to query restaurants")?
                    .collect::<Result<Vec<_>, _>>()
                    .context("Failed to collect restaurants")?;
                rows
            }
        };

        debug!(count = restaurants.len(), bounded = bounds.is_some(), "loaded restaurants");
        Ok(restaurants)
    }

    /// Count restaurants
    pub fn restaurant_count(&self) -> Result<u32> {
        self.conn
            .query_row("SELECT COUNT(*) FROM restaurants", [], |row| row.get(0))
            .context("Failed to count restaurants")
    }

    /// Append a clustering record
    pub fn insert_clustering_result(&self, record: &ClusteringRecord) -> Result<()> {
        let parameters =
            serde_json::to_string(&record.parameters).context("Failed to serialize parameters")?;
        let location = record
            .location
            .map(|l| serde_json::to_string(&l))
            .transpose()
            .context("Failed to serialize location")?;
        let results =
            serde_json::to_string(&record.results).context("Failed to serialize cluster stats")?;

        self.conn
            .execute(
                "INSERT INTO clustering_results (id, timestamp, algorithm, parameters, total_restaurants, clusters_found, location, results) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.id.to_string(),
                    record.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
                    record.algorithm,
                    parameters,
                    record.total_restaurants as i64,
                    record.clusters_found as i64,
                    location,
                    results
                ],
            )
            .context(format!("Failed to insert clustering result: {}", record.id))?;

        debug!(id = %record.id, algorithm = %record.algorithm, "stored clustering result");
        Ok(())
    }

    /// Most recent clustering records, newest first
    pub fn recent_clustering_results(&self, limit: usize) -> Result<Vec<ClusteringRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, timestamp, algorithm, parameters, total_restaurants, clusters_found, location, results FROM clustering_results ORDER BY timestamp DESC, rowid DESC LIMIT ?1",
            )
            .context("Failed to prepare statement")?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                Ok(RawRecord {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    algorithm: row.get(2)?,
                    parameters: row.get(3)?,
                    total_restaurants: row.get(4)?,
                    clusters_found: row.get(5)?,
                    location: row.get(6)?,
                    results: row.get(7)?,
                })
            })
            .context("Failed to query clustering results")?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to collect clustering results")?;

        rows.into_iter().map(RawRecord::decode).collect()
    }

    /// Most recent clustering record, if any
    pub fn latest_clustering_result(&self) -> Result<Option<ClusteringRecord>> {
        Ok(self.recent_clustering_results(1)?.into_iter().next())
    }

    /// Total number of stored clustering runs
    pub fn clustering_result_count(&self) -> Result<u32> {
        self.conn
            .query_row("SELECT COUNT(*) FROM clustering_results", [], |row| {
                row.get(0)
            })
            .context("Failed to count clustering results")
    }

    /// Runs per algorithm, most used first
    pub fn algorithm_usage(&self) -> Result<Vec<AlgorithmUsage>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT algorithm, COUNT(*) FROM clustering_results GROUP BY algorithm ORDER BY COUNT(*) DESC, algorithm",
            )
            .context("Failed to prepare statement")?;

        let usage = stmt
            .query_map([], |row| {
                Ok(AlgorithmUsage {
                    algorithm: row.get(0)?,
                    count: row.get(1)?,
                })
            })
            .context("Failed to query algorithm usage")?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to collect algorithm usage")?;

        Ok(usage)
    }

    /// Fetch a record by id
    pub fn get_clustering_result(&self, id: &Uuid) -> Result<Option<ClusteringRecord>> {
        let raw = self
            .conn
            .query_row(
                "SELECT id, timestamp, algorithm, parameters, total_restaurants, clusters_found, location, results FROM clustering_results WHERE id = ?1",
                params![id.to_string()],
                |row| {
                    Ok(RawRecord {
                        id: row.get(0)?,
                        timestamp: row.get(1)?,
                        algorithm: row.get(2)?,
                        parameters: row.get(3)?,
                        total_restaurants: row.get(4)?,
                        clusters_found: row.get(5)?,
                        location: row.get(6)?,
                        results: row.get(7)?,
                    })
                },
            )
            .optional()
            .context(format!("Failed to query clustering result: {}", id))?;

        raw.map(RawRecord::decode).transpose()
    }
}

fn insert_restaurant_with(conn: &Connection, restaurant: &Restaurant) -> Result<()> {
    let cuisine = serde_json::to_string(&restaurant.cuisine).context("Failed to encode cuisine")?;
    let features =
        serde_json::to_string(&restaurant.features).context("Failed to encode features")?;
    let opening_hours = serde_json::to_string(&restaurant.opening_hours)
        .context("Failed to encode opening hours")?;

    conn.execute(
        "INSERT OR REPLACE INTO restaurants (id, name, latitude, longitude, rating, price_level, cuisine, features, opening_hours, review_count) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            restaurant.id,
            restaurant.name,
            restaurant.latitude,
            restaurant.longitude,
            restaurant.rating,
            restaurant.price_level,
            cuisine,
            features,
            opening_hours,
            restaurant.review_count
        ],
    )
    .context(format!("Failed to insert restaurant: {}", restaurant.id))?;
    Ok(())
}

fn restaurant_from_row(row: &Row<'_>) -> rusqlite::Result<Restaurant> {
    Ok(Restaurant {
        id: row.get(0)?,
        name: row.get(1)?,
        latitude: row.get(2)?,
        longitude: row.get(3)?,
        rating: row.get(4)?,
        price_level: row.get(5)?,
        cuisine: json_list(row, 6)?,
        features: json_list(row, 7)?,
        opening_hours: json_list(row, 8)?,
        review_count: row.get(9)?,
    })
}

/// Decode a JSON string array stored in a TEXT column
fn json_list(row: &Row<'_>, idx: usize) -> rusqlite::Result<Vec<String>> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Row of `clustering_results` before its JSON columns are decoded
struct RawRecord {
    id: String,
    timestamp: String,
    algorithm: String,
    parameters: String,
    total_restaurants: i64,
    clusters_found: i64,
    location: Option<String>,
    results: String,
}

impl RawRecord {
    fn decode(self) -> Result<ClusteringRecord> {
        let id = Uuid::parse_str(&self.id).context(format!("Invalid record id: {}", self.id))?;
        let timestamp = DateTime::parse_from_rfc3339(&self.timestamp)
            .context(format!("Invalid timestamp on record {}", id))?
            .with_timezone(&Utc);
        let parameters = serde_json::from_str(&self.parameters)
            .context(format!("Invalid parameters on record {}", id))?;
        let location = self
            .location
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .context(format!("Invalid location on record {}", id))?;
        let results = serde_json::from_str(&self.results)
            .context(format!("Invalid results on record {}", id))?;

        Ok(ClusteringRecord {
            id,
            timestamp,
            algorithm: self.algorithm,
            parameters,
            total_restaurants: self.total_restaurants as usize,
            clusters_found: self.clusters_found as usize,
            location,
            results,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clusterer::ClusterStats;
    use std::collections::BTreeSet;

    fn make_restaurant(id: &str, lat: f64, lng: f64) -> Restaurant {
        Restaurant {
            id: id.to_string(),
            name: format!("Diner {}", id),
            latitude: lat,
            longitude: lng,
            rating: 4.0,
            price_level: 2,
            cuisine: vec!["diner".to_string(), "breakfast".to_string()],
            features: vec!["24h".to_string()],
            opening_hours: vec!["Mon-Sun 00-24".to_string()],
            review_count: 120,
        }
    }

    fn make_record(algorithm: &str, clusters_found: usize, ts: &str) -> ClusteringRecord {
        let mut results = BTreeMap::new();
        results.insert(
            0,
            ClusterStats {
                size: 1,
                avg_rating: 4.0,
                avg_price_level: 2.0,
                center_lat: 40.0,
                center_lng: -74.0,
                cuisines: BTreeSet::from(["diner".to_string()]),
                features: BTreeSet::new(),
                restaurant_ids: vec!["r1".to_string()],
            },
        );

        ClusteringRecord {
            id: Uuid::new_v4(),
            timestamp: DateTime::parse_from_rfc3339(ts).unwrap().with_timezone(&Utc),
            algorithm: algorithm.to_string(),
            parameters: ClusteringParameters {
                k: 5,
                eps: 2.0,
                min_pts: 3,
            },
            total_restaurants: 1,
            clusters_found,
            location: Some(GeoPoint::new(40.0, -74.0)),
            results,
        }
    }

    #[test]
    fn test_restaurant_round_trip() {
        let mut db = RestaurantDB::new_in_memory().unwrap();
        let restaurant = make_restaurant("r1", 40.0, -74.0);
        db.insert_restaurants(std::slice::from_ref(&restaurant)).unwrap();

        let loaded = db.find_restaurants(None).unwrap();
        assert_eq!(loaded, vec![restaurant]);
    }

    #[test]
    fn test_insert_replaces_by_id() {
        let mut db = RestaurantDB::new_in_memory().unwrap();
        db.insert_restaurants(&[make_restaurant("r1", 40.0, -74.0)]).unwrap();
        db.insert_restaurants(&[make_restaurant("r1", 41.0, -75.0)]).unwrap();

        assert_eq!(db.restaurant_count().unwrap(), 1);
        assert_eq!(db.find_restaurants(None).unwrap()[0].latitude, 41.0);
    }

    #[test]
    fn test_bulk_insert() {
        let mut db = RestaurantDB::new_in_memory().unwrap();
        let restaurants: Vec<_> = (0..20)
            .map(|i| make_restaurant(&format!("r{:02}", i), 40.0 + i as f64 * 0.01, -74.0))
            .collect();

        assert_eq!(db.insert_restaurants(&restaurants).unwrap(), 20);
        assert_eq!(db.restaurant_count().unwrap(), 20);
    }

    #[test]
    fn test_bounding_box_filter() {
        let mut db = RestaurantDB::new_in_memory().unwrap();
        db.insert_restaurants(&[
            make_restaurant("near", 40.1, -74.1),
            make_restaurant("far", 45.0, -74.0),
        ])
        .unwrap();

        let bbox = BoundingBox::around(GeoPoint::new(40.0, -74.0), 50.0);
        let loaded = db.find_restaurants(Some(&bbox)).unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "near");
    }

    #[test]
    fn test_malformed_list_column_is_an_error() {
        let db = RestaurantDB::new_in_memory().unwrap();
        db.conn
            .execute(
                "INSERT INTO restaurants (id, name, latitude, longitude, rating, price_level, cuisine) VALUES ('bad', 'Bad', 0.0, 0.0, 3.0, 1, 'not json')",
                [],
            )
            .unwrap();

        assert!(db.find_restaurants(None).is_err());
    }

    #[test]
    fn test_clustering_record_round_trip() {
        let db = RestaurantDB::new_in_memory().unwrap();
        let record = make_record("kmeans", 1, "2025-01-01T00:00:00Z");
        db.insert_clustering_result(&record).unwrap();

        let loaded = db.get_clustering_result(&record.id).unwrap();
        assert_eq!(loaded, Some(record));
        assert!(db.get_clustering_result(&Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_recent_results_newest_first() {
        let db = RestaurantDB::new_in_memory().unwrap();
        db.insert_clustering_result(&make_record("kmeans", 2, "2025-01-01T00:00:00Z"))
            .unwrap();
        db.insert_clustering_result(&make_record("dbscan", 3, "2025-03-01T00:00:00Z"))
            .unwrap();
        db.insert_clustering_result(&make_record("kmeans", 4, "2025-02-01T00:00:00Z"))
            .unwrap();

        let recent = db.recent_clustering_results(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].clusters_found, 3);
        assert_eq!(recent[1].clusters_found, 4);

        let latest = db.latest_clustering_result().unwrap().unwrap();
        assert_eq!(latest.algorithm, "dbscan");
    }

    #[test]
    fn test_algorithm_usage_and_count() {
        let db = RestaurantDB::new_in_memory().unwrap();
        db.insert_clustering_result(&make_record("kmeans", 2, "2025-01-01T00:00:00Z"))
            .unwrap();
        db.insert_clustering_result(&make_record("kmeans", 2, "2025-01-02T00:00:00Z"))
            .unwrap();
        db.insert_clustering_result(&make_record("dbscan", 1, "2025-01-03T00:00:00Z"))
            .unwrap();

        assert_eq!(db.clustering_result_count().unwrap(), 3);

        let usage = db.algorithm_usage().unwrap();
        assert_eq!(
            usage,
            vec![
                AlgorithmUsage {
                    algorithm: "kmeans".to_string(),
                    count: 2
                },
                AlgorithmUsage {
                    algorithm: "dbscan".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn test_empty_store_has_no_latest() {
        let db = RestaurantDB::new_in_memory().unwrap();
        assert!(db.latest_clustering_result().unwrap().is_none());
        assert_eq!(db.clustering_result_count().unwrap(), 0);
    }
}
