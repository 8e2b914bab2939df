use sqlx::{types::Json, PgPool};

use crate::{
    error::AppResult,
    models::RawItemRecord,
    services::sources::{decode_records, RecordSource},
};

/// Reads the raw catalog payloads stored by the extraction job
pub struct PostgresSource {
    db_pool: PgPool,
}

impl PostgresSource {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait::async_trait]
impl RecordSource for PostgresSource {
    async fn load_records(&self) -> AppResult<Vec<RawItemRecord>> {
        let rows: Vec<(i64, Json<serde_json::Value>)> = sqlx::query_as(
            r#"
            SELECT anime_id::BIGINT, raw_data
            FROM raw_anilist_json
            ORDER BY anime_id
            "#,
        )
        .fetch_all(&self.db_pool)
        .await?;

        let row_count = rows.len();
        let values = rows.into_iter().map(|(anime_id, Json(mut raw))| {
            // the table key is authoritative when the payload lacks an id
            if let Some(object) = raw.as_object_mut() {
                object
                    .entry("id")
                    .or_insert_with(|| serde_json::Value::from(anime_id));
            }
            raw
        });
        let records = decode_records(values, self.name());

        tracing::info!(
            rows = row_count,
            records = records.len(),
            "Loaded item records from database"
        );

        Ok(records)
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
