use crate::models::{Candidate, Recommendation};

/// Cuts a ranked, deduplicated candidate list down to the published recommendations
///
/// Drops candidates at or below `min_similarity`, then keeps the first
/// `result_count`. A shorter list is returned as-is; nothing is padded in.
pub fn finalize(
    filtered: &[Candidate],
    result_count: usize,
    min_similarity: f64,
) -> Vec<Recommendation> {
    filtered
        .iter()
        .filter(|candidate| candidate.score > min_similarity)
        .take(result_count)
        .map(|candidate| Recommendation::from(*candidate))
        .collect()
}
