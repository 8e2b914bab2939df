/// Item record sources
///
/// The engine does not care where records come from, only that each one decodes
/// into a `RawItemRecord`. Each source decodes records one at a time so a single
/// malformed entry is logged and skipped instead of failing the batch.
use crate::{error::AppResult, models::RawItemRecord};

pub mod json_file;
pub mod postgres;

pub use json_file::JsonFileSource;
pub use postgres::PostgresSource;

/// Trait for item record sources
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RecordSource: Send + Sync {
    /// Loads the full, read-only record collection for one batch
    async fn load_records(&self) -> AppResult<Vec<RawItemRecord>>;

    /// Source name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Decodes each JSON value independently, skipping the ones that do not fit the record shape
pub(crate) fn decode_records(
    values: impl IntoIterator<Item = serde_json::Value>,
    source: &'static str,
) -> Vec<RawItemRecord> {
    let mut records = Vec::new();
    let mut skipped = 0usize;

    for (position, value) in values.into_iter().enumerate() {
        match serde_json::from_value::<RawItemRecord>(value) {
            Ok(record) => records.push(record),
            Err(e) => {
                skipped += 1;
                tracing::warn!(source, position, error = %e, "Skipping malformed record");
            }
        }
    }

    if skipped > 0 {
        tracing::warn!(
            source,
            loaded = records.len(),
            skipped,
            "Some records could not be decoded"
        );
    }

    records
}
