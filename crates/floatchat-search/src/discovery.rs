//! Discovery helpers: plain structured lookups the search subsystem is
//! the natural home for, alongside the embedding-based
//! primitive in [`crate::search`].

use sqlx::{PgPool, Row};
use tracing::instrument;

use crate::error::{Result, SearchError};
use crate::types::{DatasetSummary, DiscoveredFloat};

const ALLOWED_VARIABLES: &[&str] = &[
    "temperature",
    "salinity",
    "dissolved_oxygen",
    "chlorophyll",
    "nitrate",
    "ph",
];

/// A region row matched by [`resolve_region_name`].
#[derive(Debug, Clone)]
pub struct RegionMatch {
    pub region_id: i32,
    pub region_name: String,
    pub similarity: f32,
}

/// The SOLE entry point for region-name resolution across the system
///. Trigram similarity against `ocean_regions.region_name`; the
/// best match is accepted iff its similarity clears `threshold`.
/// Otherwise returns a typed not-found carrying up to the top three
/// closest names, so a caller never silently picks a bad match.
#[instrument(skip(pool))]
pub async fn resolve_region_name(pool: &PgPool, query: &str, threshold: f32) -> Result<RegionMatch> {
    let rows = sqlx::query(
        "SELECT region_id, region_name, similarity(region_name, $1) AS sim
         FROM ocean_regions
         ORDER BY sim DESC
         LIMIT 5",
    )
    .bind(query)
    .fetch_all(pool)
    .await?;

    let best = rows.first();
    let best_sim: f32 = best.map(|r| r.try_get::<f32, _>("sim")).transpose()?.unwrap_or(0.0);

    if let Some(row) = best {
        if best_sim >= threshold {
            return Ok(RegionMatch {
                region_id: row.try_get("region_id")?,
                region_name: row.try_get("region_name")?,
                similarity: best_sim,
            });
        }
    }

    let suggestions: Vec<String> = rows
        .iter()
        .take(3)
        .filter_map(|r| r.try_get::<String, _>("region_name").ok())
        .collect();

    Err(SearchError::RegionNotFound {
        query: query.to_string(),
        suggestions,
    })
}

/// Floats whose latest known position falls within the resolved region's
/// polygon, optionally narrowed by float type.
#[instrument(skip(pool))]
pub async fn discover_floats_by_region(
    pool: &PgPool,
    region_name: &str,
    float_type: Option<&str>,
    threshold: f32,
) -> Result<Vec<DiscoveredFloat>> {
    let region = resolve_region_name(pool, region_name, threshold).await?;

    let rows = sqlx::query(
        "SELECT f.float_id, f.platform_number, f.float_type
         FROM floats f
         JOIN mv_float_latest_position p ON p.float_id = f.float_id
         JOIN ocean_regions r ON r.region_id = $1
         WHERE ST_Within(p.geom::geometry, r.geom::geometry)
           AND ($2::text IS NULL OR f.float_type = $2)
         ORDER BY f.platform_number",
    )
    .bind(region.region_id)
    .bind(float_type)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(DiscoveredFloat {
                float_id: row.try_get("float_id")?,
                platform_number: row.try_get("platform_number")?,
                float_type: row.try_get("float_type")?,
            })
        })
        .collect()
}

/// Floats with at least one non-null measurement for an allow-listed
/// variable name.
#[instrument(skip(pool))]
pub async fn discover_floats_by_variable(pool: &PgPool, variable_name: &str) -> Result<Vec<DiscoveredFloat>> {
    if !ALLOWED_VARIABLES.contains(&variable_name) {
        return Err(SearchError::VariableNotAllowed(variable_name.to_string()));
    }

    // `variable_name` is checked against the static allow-list above, so
    // it is safe to interpolate as a column identifier.
    let sql = format!(
        "SELECT DISTINCT f.float_id, f.platform_number, f.float_type
         FROM floats f
         JOIN profiles p ON p.float_id = f.float_id
         JOIN measurements m ON m.profile_id = p.profile_id
         WHERE m.{variable_name} IS NOT NULL
         ORDER BY f.platform_number"
    );

    let rows = sqlx::query(&sql).fetch_all(pool).await?;
    rows.iter()
        .map(|row| {
            Ok(DiscoveredFloat {
                float_id: row.try_get("float_id")?,
                platform_number: row.try_get("platform_number")?,
                float_type: row.try_get("float_type")?,
            })
        })
        .collect()
}

/// A single dataset's summary, or `DatasetNotFound` if it does not exist
/// or is not active.
#[instrument(skip(pool))]
pub async fn get_dataset_summary(pool: &PgPool, dataset_id: i32) -> Result<DatasetSummary> {
    let row = sqlx::query(
        "SELECT dataset_id, name, summary_text, variable_list, date_range_start,
                date_range_end, float_count, profile_count, ingestion_date
         FROM datasets
         WHERE dataset_id = $1 AND is_active = TRUE",
    )
    .bind(dataset_id)
    .fetch_optional(pool)
    .await?
    .ok_or(SearchError::DatasetNotFound(dataset_id))?;

    row_to_summary(&row)
}

/// All active dataset summaries, newest-ingested first, `summary_text`
/// truncated to 300 characters (the load-time suggestions / listing
/// display budget).
#[instrument(skip(pool))]
pub async fn list_dataset_summaries(pool: &PgPool) -> Result<Vec<DatasetSummary>> {
    let rows = sqlx::query(
        "SELECT dataset_id, name, summary_text, variable_list, date_range_start,
                date_range_end, float_count, profile_count, ingestion_date
         FROM datasets
         WHERE is_active = TRUE
         ORDER BY ingestion_date DESC",
    )
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let mut summary = row_to_summary(row)?;
            if let Some(text) = &summary.summary_text {
                if text.len() > 300 {
                    summary.summary_text = Some(text.chars().take(300).collect());
                }
            }
            Ok(summary)
        })
        .collect()
}

fn row_to_summary(row: &sqlx::postgres::PgRow) -> Result<DatasetSummary> {
    let variables: Vec<String> = row.try_get::<Option<Vec<String>>, _>("variable_list")?.unwrap_or_default();

    Ok(DatasetSummary {
        dataset_id: row.try_get("dataset_id")?,
        name: row.try_get("name")?,
        summary_text: row.try_get("summary_text")?,
        variable_list: variables,
        date_range_start: row.try_get("date_range_start")?,
        date_range_end: row.try_get("date_range_end")?,
        float_count: row.try_get("float_count")?,
        profile_count: row.try_get("profile_count")?,
        ingestion_date: row.try_get("ingestion_date")?,
    })
}
