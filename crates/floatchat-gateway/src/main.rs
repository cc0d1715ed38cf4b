use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

mod app;
mod auth;
mod error;
mod http;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "floatchat_gateway=info,tower_http=debug".into()),
        )
        .init();

    // load config: explicit path > FLOATCHAT_CONFIG env > ./floatchat.toml
    let config_path = std::env::var("FLOATCHAT_CONFIG").ok();
    let config = floatchat_core::config::FloatChatConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("config load failed ({}), using defaults", e);
        floatchat_core::config::FloatChatConfig::default()
    });

    let db = floatchat_core::db::DbPools::connect(&config.database).await?;
    floatchat_sessions::db::init_db(&db.read_write).await?;
    floatchat_search::db::init_db(&db.read_write, config.search.embedding_dimensions).await?;

    let llm = floatchat_llm::build_provider(&config.llm, &config.llm.provider)?;

    let embeddings: Option<Arc<dyn floatchat_search::EmbeddingProvider>> = config
        .llm
        .openai_api_key
        .clone()
        .map(|key| {
            Arc::new(floatchat_search::OpenAiEmbeddingProvider::new(key, config.llm.openai_base_url.clone()))
                as Arc<dyn floatchat_search::EmbeddingProvider>
        });

    let bind = config.gateway.bind.clone();
    let port = config.gateway.port;

    let state = Arc::new(app::AppState::new(config, db, llm, embeddings));
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    info!("FloatChat gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
