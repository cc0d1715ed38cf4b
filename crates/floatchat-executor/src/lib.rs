//! Executor: runs validated SQL on a strictly read-only connection,
//! wraps un-limited statements in a row-cap envelope, and estimates row
//! counts through query-planner introspection.

pub mod convert;
pub mod error;

use sqlx::{Column, PgPool, Row as SqlxRow};
use tracing::{instrument, warn};

use floatchat_core::types::ExecutionResult;

pub use error::{ExecutorError, Result};

/// Wraps a strictly read-only pool. The caller is responsible for never
/// handing this a read-write handle — there
/// is no runtime check here, only the type-level separation upstream in
/// `floatchat_core::db::DbPools`.
pub struct Executor {
    pool: PgPool,
    max_rows: u32,
}

impl Executor {
    pub fn new(pool: PgPool, max_rows: u32) -> Self {
        Self { pool, max_rows }
    }

    /// Strip a single trailing `;` and trailing whitespace, uppercase the
    /// final 80 characters of what remains, and test for the substring
    /// `LIMIT`.
    pub fn has_limit(sql: &str) -> bool {
        let trimmed = sql.trim_end();
        let trimmed = trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end();
        let tail_start = trimmed.len().saturating_sub(80);
        trimmed[tail_start..].to_uppercase().contains("LIMIT")
    }

    /// Wrap `sql` as a subquery with an outer `LIMIT`. The original SQL
    /// string passed to the caller is never mutated — only this executed
    /// form is.
    fn wrap_with_limit(sql: &str, max_rows: u32) -> String {
        let inner = sql.trim().trim_end_matches(';');
        format!("SELECT * FROM ({inner}) AS _floatchat_capped LIMIT {max_rows}")
    }

    /// Run `sql` (or its `LIMIT`-wrapped form) and read back columns/rows.
    /// Any execution error is converted into an `ExecutionResult` carrying
    /// the error text — this function never returns `Err` so a stream
    /// handler can always forward the result.
    #[instrument(skip(self, sql), fields(sql_len = sql.len()))]
    pub async fn execute(&self, sql: &str) -> ExecutionResult {
        let already_limited = Self::has_limit(sql);
        let effective_sql = if already_limited {
            sql.to_string()
        } else {
            Self::wrap_with_limit(sql, self.max_rows)
        };

        let rows = match sqlx::query(&effective_sql).fetch_all(&self.pool).await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "executor_query_failed");
                return ExecutionResult::failed(e.to_string());
            }
        };

        let columns: Vec<String> = rows
            .first()
            .map(|r| r.columns().iter().map(|c| c.name().to_string()).collect())
            .unwrap_or_default();

        let mapped: Vec<_> = rows.iter().map(convert::row_to_mapping).collect();
        let row_count = mapped.len();
        // Truncated only when *we* applied the wrapping cap and hit it —
        // a caller-supplied LIMIT never counts as truncation.
        let truncated = !already_limited && row_count as u32 >= self.max_rows;

        ExecutionResult {
            columns,
            rows: mapped,
            row_count,
            truncated,
            error: None,
        }
    }

    /// Run `EXPLAIN (FORMAT JSON)` against `sql` and extract the top-level
    /// "Plan Rows" estimate. Any failure — query error, malformed JSON,
    /// missing field — returns `None` ("unknown"); the caller defaults to
    /// "execute" in that case.
    #[instrument(skip(self, sql), fields(sql_len = sql.len()))]
    pub async fn estimate_row_count(&self, sql: &str) -> Option<i64> {
        let explain_sql = format!("EXPLAIN (FORMAT JSON) {sql}");
        let row = sqlx::query(&explain_sql)
            .fetch_one(&self.pool)
            .await
            .ok()?;

        let plan_json: serde_json::Value = row.try_get::<serde_json::Value, _>(0).ok()?;

        // EXPLAIN (FORMAT JSON) returns a single-element array of plans.
        let plan = plan_json.as_array()?.first()?.get("Plan")?;
        plan.get("Plan Rows")?.as_f64().map(|v| v as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_limit_detects_trailing_limit() {
        assert!(Executor::has_limit("SELECT * FROM profiles LIMIT 10"));
        assert!(Executor::has_limit("SELECT * FROM profiles LIMIT 10;"));
        assert!(Executor::has_limit("select * from profiles limit 10"));
    }

    #[test]
    fn has_limit_is_false_when_absent() {
        assert!(!Executor::has_limit("SELECT * FROM profiles"));
        assert!(!Executor::has_limit(
            "SELECT * FROM profiles WHERE platform_number = 'LIMITLESS1'"
        ));
    }

    #[test]
    fn has_limit_only_scans_the_tail() {
        // "LIMIT" appears early in a long statement but not in the last
        // 80 characters — should not count.
        let mut sql = "SELECT * FROM profiles WHERE notes = 'mentions LIMIT here' AND ".to_string();
        sql.push_str(&"x".repeat(100));
        assert!(!Executor::has_limit(&sql));
    }

    #[test]
    fn wrap_with_limit_strips_trailing_semicolon() {
        let wrapped = Executor::wrap_with_limit("SELECT * FROM profiles;", 50);
        assert!(wrapped.contains("LIMIT 50"));
        assert!(!wrapped.contains(";)"));
    }
}
