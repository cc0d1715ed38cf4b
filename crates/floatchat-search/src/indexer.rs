//! The Indexer: turns dataset/float rows into embedding vectors,
//! batched and with per-batch failure isolation so one bad embedding call
//! never stalls (or fails) an entire reindex.

use pgvector::Vector;
use sqlx::{PgPool, Row};
use tracing::{instrument, warn};

use floatchat_core::types::EmbeddingStatus;

use crate::discovery::list_dataset_summaries;
use crate::embeddings::{build_dataset_embedding_text, build_float_embedding_text, EmbeddingProvider};
use crate::error::Result;
use crate::types::FloatProfile;

/// Tunables the caller (the admin re-index endpoint) supplies rather than
/// this module hardcoding them.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    pub embedding_model: String,
    pub embedding_dimensions: usize,
    pub embedding_batch_size: usize,
    pub region_match_threshold: f32,
}

/// Embeds a single dataset's summary and upserts it into
/// `dataset_embedding`. Never returns an error for an embedding-provider
/// failure — that is recorded as `embedding_failed` with a zero vector so
/// the row can be retried without blocking the rest of the reindex.
#[instrument(skip(pool, embeddings, config))]
pub async fn index_dataset(
    pool: &PgPool,
    embeddings: &dyn EmbeddingProvider,
    dataset_id: i32,
    config: &IndexerConfig,
) -> Result<()> {
    let summary = crate::discovery::get_dataset_summary(pool, dataset_id).await?;
    let text = build_dataset_embedding_text(&summary);

    let (vector, status) = match embeddings.embed_batch(&config.embedding_model, &[text.clone()]).await {
        Ok(mut vectors) => (vectors.pop().unwrap_or_default(), EmbeddingStatus::Indexed),
        Err(err) => {
            warn!(dataset_id, error = %err, "dataset embedding failed, recording as embedding_failed");
            (vec![0.0; config.embedding_dimensions], EmbeddingStatus::EmbeddingFailed)
        }
    };

    sqlx::query(
        "INSERT INTO dataset_embedding (dataset_id, embedding_text, embedding, status, updated_at)
         VALUES ($1, $2, $3, $4, now())
         ON CONFLICT (dataset_id) DO UPDATE
           SET embedding_text = EXCLUDED.embedding_text, embedding = EXCLUDED.embedding,
               status = EXCLUDED.status, updated_at = now()",
    )
    .bind(dataset_id)
    .bind(&text)
    .bind(Vector::from(vector))
    .bind(status.as_str())
    .execute(pool)
    .await?;

    Ok(())
}

/// Embeds every float belonging to a dataset, `embedding_batch_size` at a
/// time. A batch that fails to embed marks only that batch's rows
/// `embedding_failed`; other batches still run.
#[instrument(skip(pool, embeddings, config))]
pub async fn index_entities_for_dataset(
    pool: &PgPool,
    embeddings: &dyn EmbeddingProvider,
    dataset_id: i32,
    config: &IndexerConfig,
) -> Result<()> {
    let floats = load_floats_for_dataset(pool, dataset_id, config.region_match_threshold).await?;

    for batch in floats.chunks(config.embedding_batch_size.max(1)) {
        let texts: Vec<String> = batch.iter().map(build_float_embedding_text).collect();

        let embed_result = embeddings.embed_batch(&config.embedding_model, &texts).await;
        match embed_result {
            Ok(vectors) => {
                for ((float, vector), text) in batch.iter().zip(vectors.into_iter()).zip(texts.iter()) {
                    upsert_float_embedding(pool, float.float_id, text, vector, EmbeddingStatus::Indexed).await?;
                }
            }
            Err(err) => {
                warn!(
                    dataset_id,
                    batch_size = batch.len(),
                    error = %err,
                    "float embedding batch failed, marking batch embedding_failed"
                );
                let dim = config.embedding_dimensions;
                for (float, text) in batch.iter().zip(texts.iter()) {
                    upsert_float_embedding(pool, float.float_id, text, vec![0.0; dim], EmbeddingStatus::EmbeddingFailed).await?;
                }
            }
        }
    }

    Ok(())
}

/// Runs both embedding phases for a dataset and then refreshes the two
/// materialized views similarity search and discovery read from. Each
/// phase runs independently of the other's outcome; a view-refresh
/// failure is logged, not propagated, since a stale view is recoverable
/// on the next scheduled refresh.
#[instrument(skip(pool, embeddings, config))]
pub async fn reindex(pool: &PgPool, embeddings: &dyn EmbeddingProvider, dataset_id: i32, config: &IndexerConfig) -> Result<()> {
    if let Err(err) = index_dataset(pool, embeddings, dataset_id, config).await {
        warn!(dataset_id, error = %err, "dataset-level indexing failed");
    }
    if let Err(err) = index_entities_for_dataset(pool, embeddings, dataset_id, config).await {
        warn!(dataset_id, error = %err, "entity-level indexing failed");
    }

    for view in ["mv_float_latest_position", "mv_dataset_stats"] {
        if let Err(err) = sqlx::query(&format!("REFRESH MATERIALIZED VIEW CONCURRENTLY {view}"))
            .execute(pool)
            .await
        {
            warn!(view, error = %err, "materialized view refresh failed");
        }
    }

    Ok(())
}

/// Reindexes every active dataset in turn. Used by the scheduled full
/// reindex job rather than the single-dataset admin endpoint.
#[instrument(skip(pool, embeddings, config))]
pub async fn reindex_all(pool: &PgPool, embeddings: &dyn EmbeddingProvider, config: &IndexerConfig) -> Result<()> {
    let datasets = list_dataset_summaries(pool).await?;
    for dataset in datasets {
        reindex(pool, embeddings, dataset.dataset_id, config).await?;
    }
    Ok(())
}

async fn upsert_float_embedding(
    pool: &PgPool,
    float_id: i32,
    embedding_text: &str,
    vector: Vec<f32>,
    status: EmbeddingStatus,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO float_embedding (float_id, embedding_text, embedding, status, updated_at)
         VALUES ($1, $2, $3, $4, now())
         ON CONFLICT (float_id) DO UPDATE
           SET embedding_text = EXCLUDED.embedding_text, embedding = EXCLUDED.embedding,
               status = EXCLUDED.status, updated_at = now()",
    )
    .bind(float_id)
    .bind(embedding_text)
    .bind(Vector::from(vector))
    .bind(status.as_str())
    .execute(pool)
    .await?;
    Ok(())
}

async fn load_floats_for_dataset(pool: &PgPool, dataset_id: i32, region_threshold: f32) -> Result<Vec<FloatProfile>> {
    let rows = sqlx::query(
        "SELECT f.float_id, f.float_type, f.platform_number, f.deployment_date,
                f.deployment_lat, f.deployment_lon, f.country, f.program,
                COALESCE(
                    (SELECT array_agg(DISTINCT v.variable_name)
                     FROM profiles p
                     JOIN profile_variables v ON v.profile_id = p.profile_id
                     WHERE p.float_id = f.float_id),
                    ARRAY[]::text[]
                ) AS variables
         FROM floats f
         WHERE f.dataset_id = $1",
    )
    .bind(dataset_id)
    .fetch_all(pool)
    .await?;

    let mut floats = Vec::with_capacity(rows.len());
    for row in rows {
        let float_id: i32 = row.try_get("float_id")?;
        let region_name = region_for_float(pool, float_id, region_threshold).await;

        floats.push(FloatProfile {
            float_id,
            float_type: row.try_get("float_type")?,
            platform_number: row.try_get("platform_number")?,
            deployment_date: row.try_get("deployment_date")?,
            deployment_lat: row.try_get("deployment_lat")?,
            deployment_lon: row.try_get("deployment_lon")?,
            country: row.try_get("country")?,
            program: row.try_get("program")?,
            variables: row.try_get::<Vec<String>, _>("variables")?,
            region_name,
        });
    }
    Ok(floats)
}

/// Point-in-polygon lookup against the same `ocean_regions` table
/// `resolve_region_name` matches by name against; falls back to `None`
/// (the embedding text builder then falls back to raw coordinates) on
/// any miss or error, since a missing region label is never fatal here.
async fn region_for_float(pool: &PgPool, float_id: i32, _threshold: f32) -> Option<String> {
    sqlx::query(
        "SELECT r.region_name
         FROM mv_float_latest_position p
         JOIN ocean_regions r ON ST_Within(p.geom::geometry, r.geom::geometry)
         WHERE p.float_id = $1
         LIMIT 1",
    )
    .bind(float_id)
    .fetch_optional(pool)
    .await
    .ok()
    .flatten()
    .and_then(|row| row.try_get::<String, _>("region_name").ok())
}
