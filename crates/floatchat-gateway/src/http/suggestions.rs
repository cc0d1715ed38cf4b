//! GET /chat/suggestions.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use floatchat_search::Suggestion;

use crate::app::AppState;

#[derive(Serialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<Suggestion>,
}

/// GET /chat/suggestions — deterministic, cached load-time example
/// queries; never errors.
pub async fn suggestions_handler(State(state): State<Arc<AppState>>) -> Json<SuggestionsResponse> {
    let suggestions = floatchat_search::suggestions::generate_load_time_suggestions(
        &state.db.read_only,
        &state.suggestions_cache,
        state.config.chat.suggestions_count,
    )
    .await;

    Json(SuggestionsResponse { suggestions })
}
