use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};

use floatchat_core::config::FloatChatConfig;
use floatchat_core::db::DbPools;
use floatchat_executor::Executor;
use floatchat_geo::GeographyResolver;
use floatchat_kv::{ContextStore, InMemoryKvStore, KvStore, ResultCache, SuggestionsCache};
use floatchat_llm::LlmProvider;
use floatchat_search::EmbeddingProvider;
use floatchat_sessions::SessionStore;

/// Central shared state for the Chat Orchestrator, passed as
/// `Arc<AppState>` to every handler: one struct, one `Arc`, every
/// handler takes `State<Arc<AppState>>`.
pub struct AppState {
    pub config: FloatChatConfig,
    pub db: DbPools,
    pub executor: Executor,
    pub llm: Arc<dyn LlmProvider>,
    /// `None` when no embedding provider API key is configured — the
    /// admin re-index endpoint then responds 503 rather than panicking.
    pub embeddings: Option<Arc<dyn EmbeddingProvider>>,
    pub result_cache: ResultCache,
    pub context_store: ContextStore,
    pub suggestions_cache: SuggestionsCache,
    pub geography: GeographyResolver,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(
        config: FloatChatConfig,
        db: DbPools,
        llm: Arc<dyn LlmProvider>,
        embeddings: Option<Arc<dyn EmbeddingProvider>>,
    ) -> Self {
        let kv_store: Arc<dyn KvStore> = InMemoryKvStore::shared();
        let geography = GeographyResolver::load(&config.query.geography_file_path);
        let executor = Executor::new(db.read_only.clone(), config.query.max_rows);
        let sessions = SessionStore::new(db.read_write.clone());
        let result_cache = ResultCache::new(
            Some(kv_store.clone()),
            config.query.cache_ttl_seconds,
            config.query.cache_max_rows,
        );
        let context_store = ContextStore::new(
            Some(kv_store.clone()),
            config.query.context_ttl_seconds,
            config.query.context_max_turns,
        );
        let suggestions_cache = SuggestionsCache::new(Some(kv_store), config.chat.suggestions_cache_ttl_seconds);

        Self {
            config,
            db,
            executor,
            llm,
            embeddings,
            result_cache,
            context_store,
            suggestions_cache,
            geography,
            sessions,
        }
    }
}

/// Build the CORS layer from the configured comma-separated origin list.
/// A bare `*` allows any origin; anything else is parsed as an explicit
/// allow-list of exact origins (malformed entries are skipped, never fatal).
fn cors_layer(origins: &str) -> CorsLayer {
    let origins = origins.trim();
    let allow_origin = if origins == "*" {
        AllowOrigin::any()
    } else {
        let parsed: Vec<_> = origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.parse().ok())
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.chat.cors_origins);

    Router::new()
        .route(
            "/chat/sessions",
            post(crate::http::sessions::create_session).get(crate::http::sessions::list_sessions),
        )
        .route(
            "/chat/sessions/{id}",
            get(crate::http::sessions::get_session)
                .patch(crate::http::sessions::rename_session)
                .delete(crate::http::sessions::delete_session),
        )
        .route("/chat/sessions/{id}/messages", get(crate::http::messages::list_messages))
        .route("/chat/sessions/{id}/query", post(crate::http::query::query_handler))
        .route(
            "/chat/sessions/{id}/query/confirm",
            post(crate::http::query::confirm_handler),
        )
        .route("/chat/suggestions", get(crate::http::suggestions::suggestions_handler))
        .route("/admin/reindex/{dataset_id}", post(crate::http::admin::reindex_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(cors)
}
