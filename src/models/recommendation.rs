use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::ItemId;

/// A scored neighbor of a source item, before franchise filtering
///
/// `row` is the neighbor's position in the batch ordering, which lets the
/// deduplicator look up its franchise key without a map lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub row: usize,
    pub id: ItemId,
    pub score: f64,
}

/// One published recommendation entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub id: ItemId,
    pub score: f64,
}

impl From<Candidate> for Recommendation {
    fn from(candidate: Candidate) -> Self {
        Self {
            id: candidate.id,
            score: candidate.score,
        }
    }
}

/// Item id to rank-ordered recommendation list
///
/// Keys are ordered so that the serialized artifact is byte-stable across runs.
pub type RecommendationMap = BTreeMap<ItemId, Vec<Recommendation>>;

/// Summary of one batch run, logged and returned to the caller
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub total_records: usize,
    pub excluded_missing_fields: usize,
    pub excluded_below_quality: usize,
    pub excluded_duplicates: usize,
    pub eligible_items: usize,
    pub meta_vocabulary_size: usize,
    pub description_vocabulary_size: usize,
    pub avg_recommendations_per_item: f64,
    pub elapsed_ms: u128,
    pub generated_at: DateTime<Utc>,
    /// Where the map was published; `None` until the batch publishes it
    pub artifact_path: Option<PathBuf>,
    pub artifact_bytes: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommendation_map_serializes_in_id_order() {
        let mut map = RecommendationMap::new();
        map.insert(30, vec![Recommendation { id: 1, score: 0.5 }]);
        map.insert(2, vec![]);

        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"2":[],"30":[{"id":1,"score":0.5}]}"#);
    }

    #[test]
    fn test_candidate_into_recommendation_drops_row() {
        let candidate = Candidate {
            row: 7,
            id: 42,
            score: 0.25,
        };
        let recommendation: Recommendation = candidate.into();
        assert_eq!(recommendation, Recommendation { id: 42, score: 0.25 });
    }
}
