use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::BatchReport,
    services::{
        pipeline::RecommendationPipeline, publisher::ArtifactPublisher, sources::RecordSource,
    },
};

/// Runs one complete recomputation: load records, compute the map, publish it
///
/// Publication is the last step, so any failure before it leaves the
/// previously published artifact untouched. The CPU-bound computation runs on
/// tokio's blocking pool.
pub async fn run_batch(
    source: &dyn RecordSource,
    pipeline: Arc<RecommendationPipeline>,
    publisher: &ArtifactPublisher,
) -> AppResult<BatchReport> {
    tracing::info!(source = source.name(), "Starting recommendation batch");

    let records = source.load_records().await?;

    let publisher = publisher.clone();
    let report = tokio::task::spawn_blocking(move || -> AppResult<BatchReport> {
        let output = pipeline.run(&records)?;
        let artifact_bytes = publisher.publish(&output.recommendations)?;
        Ok(BatchReport {
            artifact_path: Some(publisher.path().to_path_buf()),
            artifact_bytes,
            ..output.report
        })
    })
    .await
    .map_err(|e| AppError::Internal(format!("batch task failed: {}", e)))??;

    tracing::info!(
        eligible = report.eligible_items,
        meta_terms = report.meta_vocabulary_size,
        description_terms = report.description_vocabulary_size,
        elapsed_ms = report.elapsed_ms as u64,
        artifact_bytes = report.artifact_bytes,
        "Recommendation batch finished"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::EngineConfig,
        models::{RawItemRecord, RawTitle, Recommendation, RecommendationMap},
        services::sources::MockRecordSource,
    };

    fn record(id: u64, title: &str, genres: &[&str], score: i64) -> RawItemRecord {
        RawItemRecord {
            id: Some(id),
            title: Some(RawTitle::Plain(title.to_string())),
            genres: Some(genres.iter().map(|g| g.to_string()).collect()),
            quality_score: Some(score),
            ..RawItemRecord::default()
        }
    }

    fn pipeline() -> Arc<RecommendationPipeline> {
        Arc::new(RecommendationPipeline::new(EngineConfig::default()).unwrap())
    }

    fn previous_map() -> RecommendationMap {
        let mut map = RecommendationMap::new();
        map.insert(99, vec![Recommendation { id: 98, score: 0.9 }]);
        map
    }

    #[tokio::test]
    async fn test_run_batch_publishes_map() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = ArtifactPublisher::new(dir.path().join("recommendations.json"));

        let mut source = MockRecordSource::new();
        source.expect_name().return_const("mock");
        source.expect_load_records().times(1).returning(|| {
            Ok(vec![
                record(1, "Mushishi", &["Mystery", "Slice of Life"], 87),
                record(2, "Natsume's Book of Friends", &["Mystery", "Slice of Life"], 85),
            ])
        });

        let report = run_batch(&source, pipeline(), &publisher).await.unwrap();

        assert_eq!(report.eligible_items, 2);
        assert_eq!(report.artifact_path.as_deref(), Some(publisher.path()));
        let on_disk = std::fs::metadata(publisher.path()).unwrap().len();
        assert_eq!(report.artifact_bytes, on_disk);
        assert!(report.artifact_bytes > 0);
        let published = publisher.load().unwrap();
        assert_eq!(published[&1][0].id, 2);
        assert_eq!(published[&2][0].id, 1);
    }

    #[tokio::test]
    async fn test_empty_corpus_keeps_previous_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = ArtifactPublisher::new(dir.path().join("recommendations.json"));
        publisher.publish(&previous_map()).unwrap();

        let mut source = MockRecordSource::new();
        source.expect_name().return_const("mock");
        source
            .expect_load_records()
            .returning(|| Ok(vec![record(1, "Unrated", &["Drama"], 60)]));

        let result = run_batch(&source, pipeline(), &publisher).await;

        assert!(matches!(result, Err(AppError::EmptyCorpus { .. })));
        assert_eq!(publisher.load().unwrap(), previous_map());
    }

    #[tokio::test]
    async fn test_source_failure_keeps_previous_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = ArtifactPublisher::new(dir.path().join("recommendations.json"));
        publisher.publish(&previous_map()).unwrap();

        let mut source = MockRecordSource::new();
        source.expect_name().return_const("mock");
        source
            .expect_load_records()
            .returning(|| Err(AppError::InvalidInput("bad export".to_string())));

        let result = run_batch(&source, pipeline(), &publisher).await;

        assert!(result.is_err());
        assert_eq!(publisher.load().unwrap(), previous_map());
    }
}
