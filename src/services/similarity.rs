use rayon::prelude::*;
use std::cmp::Ordering;

use crate::{
    error::{AppError, AppResult},
    models::{Candidate, NormalizedItem},
    services::{
        combiner::CompositeMatrix,
        sparse::{SparseMatrix, SparseVector},
    },
};

const SCORE_SCALE: f64 = 1_000_000.0;

/// Per-source candidate lists, indexed by row of the composite matrix
pub type CandidateLists = Vec<Vec<Candidate>>;

/// Exact top-k cosine neighbors for every row of the composite matrix
///
/// Rows are unit-normalized once, so cosine similarity is a dot product. Scoring
/// walks column postings, so a source only visits items sharing a feature with
/// it; items with no overlap never become candidates. Sources are scored in
/// parallel; each worker reads the shared matrix and owns its output slot.
///
/// `items` must be in the same order as the matrix rows; popularity and id
/// break score ties.
pub fn top_k_similar(
    composite: &CompositeMatrix,
    items: &[NormalizedItem],
    k: usize,
) -> AppResult<CandidateLists> {
    if items.len() != composite.n_rows() {
        return Err(AppError::DimensionMismatch(format!(
            "{} items but composite matrix has {} rows",
            items.len(),
            composite.n_rows()
        )));
    }

    let unit = SparseMatrix::new(
        composite
            .matrix()
            .rows()
            .iter()
            .map(SparseVector::normalized)
            .collect(),
        composite.matrix().n_cols(),
    );
    let postings = unit.column_postings();
    let n_rows = unit.n_rows();

    let lists = unit
        .rows()
        .par_iter()
        .enumerate()
        .map_init(
            || (vec![0.0f64; n_rows], vec![false; n_rows]),
            |(scores, touched), (source, row)| {
                let mut visited: Vec<u32> = Vec::new();
                for (column, value) in row.entries() {
                    for (target, target_value) in &postings[*column as usize] {
                        let target_index = *target as usize;
                        if !touched[target_index] {
                            touched[target_index] = true;
                            visited.push(*target);
                        }
                        scores[target_index] += value * target_value;
                    }
                }

                let mut candidates: Vec<Candidate> = Vec::with_capacity(visited.len());
                for target in visited {
                    let target_index = target as usize;
                    let score = clamp_score(scores[target_index]);
                    scores[target_index] = 0.0;
                    touched[target_index] = false;

                    if target_index == source {
                        continue;
                    }
                    candidates.push(Candidate {
                        row: target_index,
                        id: items[target_index].id,
                        score,
                    });
                }

                select_top_k(candidates, items, k)
            },
        )
        .collect::<CandidateLists>();

    let total: usize = lists.iter().map(Vec::len).sum();
    tracing::info!(
        sources = lists.len(),
        candidates = total,
        k,
        "Computed top-k similarity candidates"
    );

    Ok(lists)
}

/// Keeps the `k` best candidates in rank order
fn select_top_k(
    mut candidates: Vec<Candidate>,
    items: &[NormalizedItem],
    k: usize,
) -> Vec<Candidate> {
    let order = |a: &Candidate, b: &Candidate| rank_order(a, b, items);
    if candidates.len() > k {
        if k == 0 {
            return Vec::new();
        }
        candidates.select_nth_unstable_by(k - 1, order);
        candidates.truncate(k);
    }
    candidates.sort_by(order);
    candidates
}

/// Descending score, then descending popularity, then ascending id
pub fn rank_order(a: &Candidate, b: &Candidate, items: &[NormalizedItem]) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| items[b.row].popularity.cmp(&items[a.row].popularity))
        .then_with(|| a.id.cmp(&b.id))
}

/// Clamps floating-point noise into [0, 1] and rounds to six decimals
///
/// Rounding makes identical vectors score exactly 1.0 and keeps the published
/// artifact stable.
pub fn clamp_score(raw: f64) -> f64 {
    if raw.is_nan() {
        return 0.0;
    }
    (raw.clamp(0.0, 1.0) * SCORE_SCALE).round() / SCORE_SCALE
}
