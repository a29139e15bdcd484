//! Pool construction and schema bootstrap.

use std::time::Duration;

use log::{info, warn};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::error::{StoreError, StoreResult};

const SCHEMA: &str = include_str!("../schema.sql");

/// Connect to Postgres with a fixed-interval retry loop.
///
/// Covers startup ordering only; once the pool exists, sqlx handles
/// reconnects per connection.
pub async fn connect_pool(
    url: &str,
    max_connections: u32,
    retry_count: u32,
    retry_interval: Duration,
) -> StoreResult<PgPool> {
    let mut attempt = 0;
    loop {
        match PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
        {
            Ok(pool) => {
                info!("connected to postgres");
                return Ok(pool);
            }
            Err(e) if attempt < retry_count => {
                attempt += 1;
                warn!(
                    "postgres connection failed (attempt {attempt}/{retry_count}): {e}, retrying in {}s",
                    retry_interval.as_secs()
                );
                tokio::time::sleep(retry_interval).await;
            }
            Err(e) => return Err(StoreError::from(e)),
        }
    }
}

/// Apply the idempotent schema bootstrap.
pub async fn ensure_schema(pool: &PgPool) -> StoreResult<()> {
    sqlx::raw_sql(SCHEMA).execute(pool).await?;
    info!("schema bootstrap applied");
    Ok(())
}
