use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::DatabaseConfig;
use crate::error::StoreError;

/// Build a connection pool without connecting.
///
/// An unreachable server surfaces on the first query, bounded by the
/// configured acquire timeout, so startup never blocks on the database.
pub fn create_pool(config: &DatabaseConfig) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_lazy(&config.url)?;

    Ok(pool)
}
