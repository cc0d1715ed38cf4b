use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::DatabaseConfig;
use crate::error::Result;

/// The two logical connection pools of the shared-resource policy.
///
/// `read_write` is used for writes to `chat_session`/`chat_message` and the
/// embedding tables. `read_only` backs the Executor exclusively — it must
/// never receive the read-write handle, so the two are kept as distinct
/// types rather than one pool passed around with a trust convention.
#[derive(Clone)]
pub struct DbPools {
    pub read_write: PgPool,
    pub read_only: PgPool,
}

impl DbPools {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let read_write = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .connect(&config.database_url)
            .await?;

        let read_only = PgPoolOptions::new()
            .max_connections(config.readonly_pool_size)
            .connect(&config.readonly_database_url)
            .await?;

        Ok(Self {
            read_write,
            read_only,
        })
    }
}
