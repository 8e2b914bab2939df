use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};

/// Opens the pool used to read the raw catalog table
///
/// A batch issues one long read, so the pool stays small.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await?;

    tracing::debug!("Connected to PostgreSQL");

    Ok(pool)
}
