use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Dataset row fields the Indexer and the discovery helpers both need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub dataset_id: i32,
    pub name: Option<String>,
    pub summary_text: Option<String>,
    pub variable_list: Vec<String>,
    pub date_range_start: Option<DateTime<Utc>>,
    pub date_range_end: Option<DateTime<Utc>>,
    pub float_count: Option<i32>,
    pub profile_count: Option<i32>,
    pub ingestion_date: DateTime<Utc>,
}

/// Everything the embedding-text builder needs about a single float.
#[derive(Debug, Clone)]
pub struct FloatProfile {
    pub float_id: i32,
    pub float_type: Option<String>,
    pub platform_number: String,
    pub deployment_date: Option<DateTime<Utc>>,
    pub deployment_lat: Option<f64>,
    pub deployment_lon: Option<f64>,
    pub country: Option<String>,
    pub program: Option<String>,
    pub variables: Vec<String>,
    pub region_name: Option<String>,
}

/// One hit from [`crate::search::search_datasets`] or `search_floats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub entity_id: i32,
    pub score: f32,
}

/// Structured filters accepted by the similarity search primitive
///.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters<'a> {
    pub variable: Option<&'a str>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub region_name: Option<&'a str>,
}

/// A discovered float, minimally shaped for the discovery helpers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredFloat {
    pub float_id: i32,
    pub platform_number: String,
    pub float_type: Option<String>,
}
