use serde::{Deserialize, Serialize};

use crate::clusterer::ClusterTag;

/// A restaurant document as stored in the `restaurants` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Average star rating, typically 1-5
    pub rating: f64,
    /// Ordinal price level, typically 1-4
    pub price_level: u8,
    #[serde(default)]
    pub cuisine: Vec<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub opening_hours: Vec<String>,
    #[serde(default)]
    pub review_count: u32,
}

/// A restaurant tagged with the cluster it landed in
///
/// `distance_to_center` is only produced by k-means, `is_noise` only by DBSCAN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusteredRestaurant {
    #[serde(flatten)]
    pub restaurant: Restaurant,
    pub cluster: ClusterTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_to_center: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_noise: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_lists_default_to_empty() {
        let json = r#"{
            "id": "r1",
            "name": "Night Owl Noodles",
            "latitude": 40.0,
            "longitude": -74.0,
            "rating": 4.2,
            "priceLevel": 2
        }"#;

        let restaurant: Restaurant = serde_json::from_str(json).unwrap();
        assert!(restaurant.cuisine.is_empty());
        assert!(restaurant.features.is_empty());
        assert!(restaurant.opening_hours.is_empty());
        assert_eq!(restaurant.review_count, 0);
    }

    #[test]
    fn test_document_store_shape() {
        let json = r#"{
            "_id": "65a1f0c2e4b0a1b2c3d4e5f6",
            "name": "Tony's 24/7 Pizza",
            "address": "123 Main St, New York, NY",
            "latitude": 40.7128,
            "longitude": -74.0060,
            "cuisine": ["Italian", "Pizza"],
            "rating": 4.5,
            "priceLevel": 2,
            "reviewCount": 234,
            "isOpen24Hours": true
        }"#;

        let restaurant: Restaurant = serde_json::from_str(json).unwrap();
        assert_eq!(restaurant.id, "65a1f0c2e4b0a1b2c3d4e5f6");
        assert_eq!(restaurant.cuisine, vec!["Italian", "Pizza"]);
        assert_eq!(restaurant.review_count, 234);
        assert!(restaurant.features.is_empty());
        assert!(restaurant.opening_hours.is_empty());

        // Written back under the canonical key
        let value = serde_json::to_value(&restaurant).unwrap();
        assert_eq!(value["id"], "65a1f0c2e4b0a1b2c3d4e5f6");
        assert!(value.get("_id").is_none());
    }

    #[test]
    fn test_clustered_restaurant_flattens_fields() {
        let clustered = ClusteredRestaurant {
            restaurant: Restaurant {
                id: "r1".to_string(),
                name: "Midnight Tacos".to_string(),
                latitude: 1.0,
                longitude: 2.0,
                rating: 4.0,
                price_level: 1,
                cuisine: vec!["mexican".to_string()],
                features: vec![],
                opening_hours: vec![],
                review_count: 10,
            },
            cluster: ClusterTag::Noise,
            distance_to_center: None,
            is_noise: Some(true),
        };

        let value = serde_json::to_value(&clustered).unwrap();
        assert_eq!(value["name"], "Midnight Tacos");
        assert_eq!(value["priceLevel"], 1);
        assert_eq!(value["cluster"], -2);
        assert_eq!(value["isNoise"], true);
        assert!(value.get("distanceToCenter").is_none());
    }
}
