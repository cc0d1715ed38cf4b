use sqlx::PgPool;

use crate::error::Result;

/// Create the `dataset_embedding`/`float_embedding` tables if they are not
/// already present, alongside the `pgvector`/`pg_trgm` extensions the
/// Indexer and Similarity Search rely on (`<=>` cosine distance, trigram
/// `similarity()` for fuzzy region resolution). Safe to call on every
/// startup, mirroring `floatchat_sessions::db::init_db`'s idiom.
///
/// These are the core's own auxiliary tables — the domain tables (`floats`, `datasets`, `profiles`,
/// `measurements`, `ocean_regions`) are owned by the ingestion pipeline
/// this crate never migrates.
pub async fn init_db(pool: &PgPool, embedding_dimensions: usize) -> Result<()> {
    sqlx::query("CREATE EXTENSION IF NOT EXISTS vector").execute(pool).await?;
    sqlx::query("CREATE EXTENSION IF NOT EXISTS pg_trgm").execute(pool).await?;

    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS dataset_embedding (
            id              UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            dataset_id      INTEGER NOT NULL UNIQUE,
            embedding_text  TEXT NOT NULL,
            embedding       VECTOR({embedding_dimensions}) NOT NULL,
            status          TEXT NOT NULL DEFAULT 'indexed',
            created_at      TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at      TIMESTAMPTZ NOT NULL DEFAULT now()
        )"
    ))
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_dataset_embedding_vector
            ON dataset_embedding USING ivfflat (embedding vector_cosine_ops)",
    )
    .execute(pool)
    .await
    .ok();

    sqlx::query(&format!(
        "CREATE TABLE IF NOT EXISTS float_embedding (
            id              UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            float_id        INTEGER NOT NULL UNIQUE,
            embedding_text  TEXT NOT NULL,
            embedding       VECTOR({embedding_dimensions}) NOT NULL,
            status          TEXT NOT NULL DEFAULT 'indexed',
            created_at      TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at      TIMESTAMPTZ NOT NULL DEFAULT now()
        )"
    ))
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_float_embedding_vector
            ON float_embedding USING ivfflat (embedding vector_cosine_ops)",
    )
    .execute(pool)
    .await
    .ok();

    Ok(())
}
