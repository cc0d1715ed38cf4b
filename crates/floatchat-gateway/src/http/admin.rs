//! POST /admin/reindex/{dataset_id}: admin-only manual
//! re-index trigger, gated by an HS256 bearer token carrying `role: admin`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde_json::json;

use floatchat_search::IndexerConfig;

use crate::app::AppState;
use crate::auth::verify_admin_token;
use crate::error::ApiError;

/// POST /admin/reindex/{dataset_id}
pub async fn reindex_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(dataset_id): Path<i32>,
) -> Result<Json<serde_json::Value>, ApiError> {
    verify_admin_token(&headers, &state.config.gateway.admin_secret)?;

    let embeddings = state
        .embeddings
        .clone()
        .ok_or_else(|| ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "no embedding provider configured"))?;

    let config = IndexerConfig {
        embedding_model: state.config.search.embedding_model.clone(),
        embedding_dimensions: state.config.search.embedding_dimensions,
        embedding_batch_size: state.config.search.embedding_batch_size,
        region_match_threshold: state.config.search.fuzzy_match_threshold as f32,
    };

    floatchat_search::indexer::reindex(&state.db.read_write, embeddings.as_ref(), dataset_id, &config)
        .await
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    state.result_cache.invalidate_all().await;

    Ok(Json(json!({ "status": "completed", "dataset_id": dataset_id })))
}
