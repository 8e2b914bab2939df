use std::path::{Path, PathBuf};

use crate::{
    error::{AppError, AppResult},
    models::RawItemRecord,
    services::sources::{decode_records, RecordSource},
};

/// Reads records from a JSON array file, or JSON Lines when the extension is `.jsonl`
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_json_lines(&self) -> bool {
        self.path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("jsonl"))
    }

    fn parse(&self, contents: &str) -> AppResult<Vec<RawItemRecord>> {
        if self.is_json_lines() {
            let mut values = Vec::new();
            for (line_number, line) in contents.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<serde_json::Value>(line) {
                    Ok(value) => values.push(value),
                    Err(e) => tracing::warn!(
                        line = line_number + 1,
                        error = %e,
                        "Skipping unparseable JSON line"
                    ),
                }
            }
            return Ok(decode_records(values, self.name()));
        }

        match serde_json::from_str::<serde_json::Value>(contents)? {
            serde_json::Value::Array(values) => Ok(decode_records(values, self.name())),
            _ => Err(AppError::InvalidInput(format!(
                "{} does not contain a JSON array of records",
                self.path.display()
            ))),
        }
    }
}

#[async_trait::async_trait]
impl RecordSource for JsonFileSource {
    async fn load_records(&self) -> AppResult<Vec<RawItemRecord>> {
        let contents = tokio::fs::read_to_string(&self.path).await?;
        let records = self.parse(&contents)?;

        tracing::info!(
            path = %self.path.display(),
            records = records.len(),
            "Loaded item records from file"
        );

        Ok(records)
    }

    fn name(&self) -> &'static str {
        "json_file"
    }
}
