use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::types::{DatasetSummary, FloatProfile};

/// "Given a list of texts and a model name, return one embedding vector
/// per text, in order." Batched by the caller — this trait never embeds
/// one text at a time.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed_batch(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("provider returned {got} vectors for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },
}

/// An OpenAI-compatible `/embeddings` endpoint. Mirrors
/// `floatchat_llm::openai::OpenAiProvider`'s shape — same client idiom,
/// different wire contract.
pub struct OpenAiEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiEmbeddingProvider {
    pub fn new(api_key: String, base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn embed_batch(&self, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        debug!(model, count = texts.len(), "sending embedding batch request");

        let url = format!("{}/embeddings", self.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&serde_json::json!({ "model": model, "input": texts }))
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "embedding API error");
            return Err(EmbeddingError::Api {
                status,
                message: text,
            });
        }

        let api_resp: ApiResponse = resp.json().await?;
        let mut items = api_resp.data;
        items.sort_by_key(|d| d.index);
        let vectors: Vec<Vec<f32>> = items.into_iter().map(|d| d.embedding).collect();

        if vectors.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                got: vectors.len(),
            });
        }
        Ok(vectors)
    }
}

#[derive(Deserialize)]
struct ApiResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
    index: usize,
}

/// Build the single embedding text for a dataset: its free-text summary
/// plus a structured descriptor.
pub fn build_dataset_embedding_text(dataset: &DatasetSummary) -> String {
    let mut out = String::new();
    if let Some(summary) = &dataset.summary_text {
        out.push_str(summary);
        out.push('\n');
    }

    let name = dataset.name.as_deref().unwrap_or("unnamed dataset");
    let variables = if dataset.variable_list.is_empty() {
        "none recorded".to_string()
    } else {
        dataset.variable_list.join(", ")
    };
    let date_range = match (dataset.date_range_start, dataset.date_range_end) {
        (Some(start), Some(end)) => format!("{} to {}", start.date_naive(), end.date_naive()),
        _ => "unknown date range".to_string(),
    };

    out.push_str(&format!(
        "Dataset: {name}. Variables: {variables}. Date range: {date_range}. \
         Floats: {float_count}. Profiles: {profile_count}.",
        float_count = dataset.float_count.unwrap_or(0),
        profile_count = dataset.profile_count.unwrap_or(0),
    ));
    out
}

/// Build the single embedding text for a float.
pub fn build_float_embedding_text(float: &FloatProfile) -> String {
    let float_type = float.float_type.as_deref().unwrap_or("unknown type");
    let location = match &float.region_name {
        Some(region) => format!("deployed in the {region} region"),
        None => match (float.deployment_lat, float.deployment_lon) {
            (Some(lat), Some(lon)) => format!("deployed at ({lat:.2}, {lon:.2})"),
            _ => "deployment location unknown".to_string(),
        },
    };
    let variables = if float.variables.is_empty() {
        "no recorded variables".to_string()
    } else {
        float.variables.join(", ")
    };
    let deployment_date = float
        .deployment_date
        .map(|d| d.date_naive().to_string())
        .unwrap_or_else(|| "unknown date".to_string());

    format!(
        "Float {platform} ({float_type}), {location}. Variables: {variables}. \
         Deployed: {deployment_date}. Country: {country}. Program: {program}.",
        platform = float.platform_number,
        country = float.country.as_deref().unwrap_or("unknown"),
        program = float.program.as_deref().unwrap_or("unknown"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn dataset_text_includes_structured_descriptor() {
        let dataset = DatasetSummary {
            dataset_id: 1,
            name: Some("Pacific Survey 2024".to_string()),
            summary_text: Some("A survey of the equatorial Pacific.".to_string()),
            variable_list: vec!["temperature".to_string(), "salinity".to_string()],
            date_range_start: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            date_range_end: Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()),
            float_count: Some(12),
            profile_count: Some(340),
            ingestion_date: Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap(),
        };
        let text = build_dataset_embedding_text(&dataset);
        assert!(text.contains("Pacific Survey 2024"));
        assert!(text.contains("temperature, salinity"));
        assert!(text.contains("12"));
    }

    #[test]
    fn float_text_prefers_region_name_over_raw_coordinates() {
        let float = FloatProfile {
            float_id: 1,
            float_type: Some("core".to_string()),
            platform_number: "5904321".to_string(),
            deployment_date: None,
            deployment_lat: Some(10.0),
            deployment_lon: Some(70.0),
            country: None,
            program: None,
            variables: vec!["temperature".to_string()],
            region_name: Some("arabian sea".to_string()),
        };
        let text = build_float_embedding_text(&float);
        assert!(text.contains("arabian sea"));
        assert!(!text.contains("10.00"));
    }
}
