//! Hybrid similarity search: cosine distance against the
//! `dataset_embedding`/`float_embedding` tables, oversampled and then
//! re-scored with recency and region boosts.

use chrono::Utc;
use pgvector::Vector;
use sqlx::{PgPool, Row};
use tracing::instrument;

use crate::embeddings::EmbeddingProvider;
use crate::error::Result;
use crate::types::{SearchFilters, SearchHit};

const RECENCY_BOOST: f32 = 0.05;
const REGION_BOOST: f32 = 0.10;
const OVERSAMPLE_FACTOR: i64 = 3;

/// Search the dataset embedding table. `limit` bounds the final, scored
/// result set; candidates are pulled at `limit * 3` to leave room for the
/// post-hoc boosts to reorder the field.
#[instrument(skip(pool, embeddings, filters))]
pub async fn search_datasets(
    pool: &PgPool,
    embeddings: &dyn EmbeddingProvider,
    model: &str,
    query: &str,
    filters: &SearchFilters<'_>,
    threshold: f32,
    limit: i64,
    recency_window_days: i64,
) -> Result<Vec<SearchHit>> {
    let query_vec = embed_query(embeddings, model, query).await?;
    let candidate_limit = limit * OVERSAMPLE_FACTOR;

    let rows = sqlx::query(
        "SELECT e.dataset_id AS entity_id,
                1 - (e.embedding <=> $1) AS base_score,
                d.date_range_end,
                d.ingestion_date
         FROM dataset_embedding e
         JOIN datasets d ON d.dataset_id = e.dataset_id
         WHERE e.status != 'embedding_failed'
           AND ($2::text IS NULL OR $2 = ANY (d.variable_list))
           AND ($3::timestamptz IS NULL OR d.date_range_end >= $3)
           AND ($4::timestamptz IS NULL OR d.date_range_start <= $4)
         ORDER BY e.embedding <=> $1
         LIMIT $5",
    )
    .bind(Vector::from(query_vec))
    .bind(filters.variable)
    .bind(filters.date_from)
    .bind(filters.date_to)
    .bind(candidate_limit)
    .fetch_all(pool)
    .await?;

    let mut hits: Vec<SearchHit> = rows
        .iter()
        .map(|row| -> Result<SearchHit> {
            // pgvector's `<=>` returns `double precision` (FLOAT8); an f32
            // try_get here always errors since f32 only matches FLOAT4.
            let base_score: f64 = row.try_get("base_score")?;
            let ingestion_date: chrono::DateTime<Utc> = row.try_get("ingestion_date")?;
            let recency_bonus = if (Utc::now() - ingestion_date).num_days() <= recency_window_days {
                RECENCY_BOOST
            } else {
                0.0
            };
            let score = ((base_score as f32) + recency_bonus).min(1.0);
            Ok(SearchHit {
                entity_id: row.try_get("entity_id")?,
                score,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    hits.retain(|hit| hit.score >= threshold);
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(limit as usize);
    Ok(hits)
}

/// Search the float embedding table. Region matches get the region boost
/// in place of the dataset path's variable/date prefilters, since floats
/// are scoped spatially rather than by a fixed date range column.
#[instrument(skip(pool, embeddings, filters))]
pub async fn search_floats(
    pool: &PgPool,
    embeddings: &dyn EmbeddingProvider,
    model: &str,
    query: &str,
    filters: &SearchFilters<'_>,
    threshold: f32,
    limit: i64,
    recency_window_days: i64,
) -> Result<Vec<SearchHit>> {
    let query_vec = embed_query(embeddings, model, query).await?;
    let candidate_limit = limit * OVERSAMPLE_FACTOR;

    let rows = sqlx::query(
        "SELECT e.float_id AS entity_id,
                1 - (e.embedding <=> $1) AS base_score,
                f.deployment_date,
                (r.region_name = $2) AS region_match
         FROM float_embedding e
         JOIN floats f ON f.float_id = e.float_id
         LEFT JOIN mv_float_latest_position p ON p.float_id = f.float_id
         LEFT JOIN ocean_regions r ON ST_Within(p.geom::geometry, r.geom::geometry)
         WHERE e.status != 'embedding_failed'
         ORDER BY e.embedding <=> $1
         LIMIT $3",
    )
    .bind(Vector::from(query_vec))
    .bind(filters.region_name)
    .bind(candidate_limit)
    .fetch_all(pool)
    .await?;

    let mut hits: Vec<SearchHit> = rows
        .iter()
        .map(|row| -> Result<SearchHit> {
            // Same FLOAT8-vs-f32 mismatch as `search_datasets` above.
            let base_score: f64 = row.try_get("base_score")?;
            let deployment_date: Option<chrono::DateTime<Utc>> = row.try_get("deployment_date")?;
            let region_match: Option<bool> = row.try_get("region_match")?;

            let recency_bonus = deployment_date
                .map(|d| {
                    if (Utc::now() - d).num_days() <= recency_window_days {
                        RECENCY_BOOST
                    } else {
                        0.0
                    }
                })
                .unwrap_or(0.0);
            let region_bonus = if region_match.unwrap_or(false) { REGION_BOOST } else { 0.0 };

            let score = ((base_score as f32) + recency_bonus + region_bonus).min(1.0);
            Ok(SearchHit {
                entity_id: row.try_get("entity_id")?,
                score,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    hits.retain(|hit| hit.score >= threshold);
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(limit as usize);
    Ok(hits)
}

async fn embed_query(embeddings: &dyn EmbeddingProvider, model: &str, query: &str) -> Result<Vec<f32>> {
    let mut vectors = embeddings
        .embed_batch(model, std::slice::from_ref(&query.to_string()))
        .await?;
    Ok(vectors.pop().unwrap_or_default())
}
