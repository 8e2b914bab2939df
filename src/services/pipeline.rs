use chrono::Utc;
use rayon::prelude::*;
use std::collections::HashSet;
use std::time::Instant;

use crate::{
    config::EngineConfig,
    error::{AppError, AppResult},
    models::{BatchReport, ExclusionReason, NormalizedItem, RawItemRecord, RecommendationMap},
    services::{
        combiner::combine,
        franchise::{FranchiseIndex, FranchiseRules},
        normalizer::{normalize, Normalized},
        ranking::finalize,
        similarity::top_k_similar,
        vectorizer::DualVectorizer,
    },
};

/// Items that passed normalization, with the exclusion tallies
#[derive(Debug, Clone, Default)]
pub struct PreparedBatch {
    pub items: Vec<NormalizedItem>,
    pub excluded_missing_fields: usize,
    pub excluded_below_quality: usize,
    pub excluded_duplicates: usize,
}

/// Result of a successful batch run
#[derive(Debug, Clone)]
pub struct BatchOutput {
    pub recommendations: RecommendationMap,
    pub report: BatchReport,
}

/// Full batch recomputation: normalize, vectorize, combine, score, deduplicate, rank
///
/// Holds only immutable configuration; every call to [`run`](Self::run) is an
/// independent, deterministic pass over its input.
#[derive(Debug, Clone)]
pub struct RecommendationPipeline {
    config: EngineConfig,
    rules: FranchiseRules,
    vectorizer: DualVectorizer,
}

impl RecommendationPipeline {
    pub fn new(config: EngineConfig) -> AppResult<Self> {
        config.validate()?;
        let rules = FranchiseRules::from_config(&config)?;
        let vectorizer = DualVectorizer::new(&config);
        Ok(Self {
            config,
            rules,
            vectorizer,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Normalizes every record, dropping excluded and duplicate ones
    pub fn prepare(&self, records: &[RawItemRecord]) -> PreparedBatch {
        let mut batch = PreparedBatch::default();
        let mut seen_ids = HashSet::new();

        for (position, record) in records.iter().enumerate() {
            match normalize(record, &self.config) {
                Normalized::Item(item) => {
                    if !seen_ids.insert(item.id) {
                        tracing::warn!(
                            id = item.id,
                            position,
                            "Duplicate item id, keeping first record"
                        );
                        batch.excluded_duplicates += 1;
                        continue;
                    }
                    batch.items.push(item);
                }
                Normalized::Excluded(ExclusionReason::MissingId) => {
                    tracing::warn!(position, "Record has no identifier, excluding");
                    batch.excluded_missing_fields += 1;
                }
                Normalized::Excluded(ExclusionReason::MissingQualityScore) => {
                    tracing::warn!(
                        id = ?record.id,
                        position,
                        "Record has no quality score, excluding"
                    );
                    batch.excluded_missing_fields += 1;
                }
                Normalized::Excluded(ExclusionReason::BelowQualityThreshold { score }) => {
                    tracing::debug!(
                        id = ?record.id,
                        score,
                        threshold = self.config.min_quality_score,
                        "Record below quality threshold"
                    );
                    batch.excluded_below_quality += 1;
                }
            }
        }

        tracing::info!(
            total_records = records.len(),
            eligible = batch.items.len(),
            missing_fields = batch.excluded_missing_fields,
            below_quality = batch.excluded_below_quality,
            duplicates = batch.excluded_duplicates,
            "Normalized item records"
        );

        batch
    }

    /// Computes the complete recommendation map for one batch of records
    ///
    /// Fails with [`AppError::EmptyCorpus`] when no record passes the quality gate.
    pub fn run(&self, records: &[RawItemRecord]) -> AppResult<BatchOutput> {
        let start = Instant::now();

        let batch = self.prepare(records);
        if batch.items.is_empty() {
            return Err(AppError::EmptyCorpus {
                total_records: records.len(),
            });
        }
        let items = &batch.items;

        let spaces = self.vectorizer.fit_transform(items);
        let composite = combine(
            &spaces.meta,
            &spaces.description,
            self.config.w_meta,
            self.config.w_desc,
        )?;
        let candidates = top_k_similar(&composite, items, self.config.candidate_k)?;
        let franchises = FranchiseIndex::build(self.rules.clone(), items);

        let recommendations: RecommendationMap = candidates
            .par_iter()
            .enumerate()
            .map(|(row, ranked)| {
                let filtered = franchises.filter_franchise_duplicates(row, ranked);
                let list = finalize(
                    &filtered,
                    self.config.result_count,
                    self.config.min_similarity,
                );
                (items[row].id, list)
            })
            .collect::<Vec<_>>()
            .into_iter()
            .collect();

        let total_pairs: usize = recommendations.values().map(Vec::len).sum();
        let report = BatchReport {
            total_records: records.len(),
            excluded_missing_fields: batch.excluded_missing_fields,
            excluded_below_quality: batch.excluded_below_quality,
            excluded_duplicates: batch.excluded_duplicates,
            eligible_items: items.len(),
            meta_vocabulary_size: spaces.meta_vocabulary.len(),
            description_vocabulary_size: spaces.description_vocabulary.len(),
            avg_recommendations_per_item: total_pairs as f64 / items.len() as f64,
            elapsed_ms: start.elapsed().as_millis(),
            generated_at: Utc::now(),
            artifact_path: None,
            artifact_bytes: 0,
        };

        tracing::info!(
            items = report.eligible_items,
            pairs = total_pairs,
            avg_per_item = report.avg_recommendations_per_item,
            elapsed_ms = report.elapsed_ms as u64,
            "Recommendation batch computed"
        );

        Ok(BatchOutput {
            recommendations,
            report,
        })
    }
}
