//! Pipeline: orchestrates prompt assembly -> LLM call -> SQL
//! extraction -> validation -> bounded retry, producing either a
//! validated SQL string or a typed terminal failure. Also exposes the
//! independent result-interpretation and follow-up-suggestion calls.

pub mod error;
pub mod extract;
pub mod follow_ups;
pub mod interpretation;
pub mod nl_to_sql;

pub use error::{PipelineError, Result};
pub use nl_to_sql::{generate_sql, NlToSqlRequest, ValidatedQuery};
