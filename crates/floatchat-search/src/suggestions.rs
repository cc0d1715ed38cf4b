//! Load-time follow-up suggestions: the four-query list a fresh session
//! sees before it has asked anything,
//! built deterministically from whatever datasets are actually loaded.
//!
//! This is a distinct concern from `floatchat_pipeline::follow_ups`, which
//! generates suggestions from a completed query's own interpretation —
//! this module runs once per session, before any query exists.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::warn;

use floatchat_kv::SuggestionsCache;

use crate::discovery::list_dataset_summaries;
use crate::types::DatasetSummary;

/// A single load-time suggestion: the query text a client can resubmit
/// verbatim, plus a short human-readable description of what it shows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Suggestion {
    pub query: String,
    pub description: String,
}

impl Suggestion {
    fn new(query: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            description: description.into(),
        }
    }
}

/// Hardcoded fallback used whenever no dataset summaries are available,
/// or anything in the construction path fails. Never empty, never an
/// error — a user should always see something to click.
fn fallback_suggestions() -> Vec<Suggestion> {
    vec![
        Suggestion::new(
            "Show me temperature profiles in the North Atlantic",
            "Browse recent temperature profiles from North Atlantic floats",
        ),
        Suggestion::new(
            "What is the average salinity in the Southern Ocean at 500m depth?",
            "Aggregate salinity at a fixed depth across the Southern Ocean",
        ),
        Suggestion::new(
            "How many floats are currently active in the Pacific?",
            "Count currently active floats in the Pacific",
        ),
        Suggestion::new(
            "Show Gulf Stream salinity measurements from 2025",
            "Browse 2025 salinity measurements near the Gulf Stream",
        ),
    ]
}

/// Builds (or returns a cached copy of) the load-time suggestion list.
/// Construction: take the first one or two active dataset summaries and
/// derive a spatial, a temporal, and a variable-specific question from
/// each, plus one general overview question, until `count` is reached or
/// the summaries run out; any failure along the way falls back to the
/// fixed four-item list rather than propagating an error.
pub async fn generate_load_time_suggestions(pool: &PgPool, cache: &SuggestionsCache, count: usize) -> Vec<Suggestion> {
    if let Some(cached) = cache.get::<Vec<Suggestion>>().await {
        return cached;
    }

    let suggestions = match list_dataset_summaries(pool).await {
        Ok(summaries) if !summaries.is_empty() => build_from_summaries(&summaries, count),
        Ok(_) => fallback_suggestions(),
        Err(err) => {
            warn!(error = %err, "failed to load dataset summaries for load-time suggestions, using fallback");
            fallback_suggestions()
        }
    };

    cache.set(&suggestions).await;
    suggestions
}

fn build_from_summaries(summaries: &[DatasetSummary], count: usize) -> Vec<Suggestion> {
    let mut out = Vec::with_capacity(count);

    for summary in summaries.iter().take(2) {
        let name = summary.name.as_deref().unwrap_or("this dataset");

        out.push(Suggestion::new(
            format!("Where are the {name} floats currently located?"),
            format!("Map current float positions for {name}"),
        ));

        if let (Some(start), Some(end)) = (summary.date_range_start, summary.date_range_end) {
            out.push(Suggestion::new(
                format!(
                    "What data is available in {name} between {} and {}?",
                    start.date_naive(),
                    end.date_naive()
                ),
                format!("Check {name}'s temporal coverage"),
            ));
        }
        if let Some(variable) = summary.variable_list.first() {
            out.push(Suggestion::new(
                format!("Show me recent {variable} readings from {name}"),
                format!("Browse recent {variable} readings from {name}"),
            ));
        }
        out.push(Suggestion::new(
            format!("Give me an overview of {name}"),
            format!("Summarize what {name} contains"),
        ));

        if out.len() >= count {
            break;
        }
    }

    if out.is_empty() {
        return fallback_suggestions();
    }

    out.truncate(count);
    while out.len() < count {
        let filler = fallback_suggestions();
        let next = filler.into_iter().find(|s| !out.contains(s));
        match next {
            Some(s) => out.push(s),
            None => break,
        }
    }
    out
}
