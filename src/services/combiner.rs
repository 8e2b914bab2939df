use crate::{
    error::{AppError, AppResult},
    services::sparse::SparseMatrix,
};

/// Weighted concatenation of the meta and description spaces, one row per item
///
/// Columns `0..meta_dims` are the meta block, the rest the description block.
#[derive(Debug, Clone)]
pub struct CompositeMatrix {
    matrix: SparseMatrix,
    meta_dims: usize,
}

impl CompositeMatrix {
    pub fn matrix(&self) -> &SparseMatrix {
        &self.matrix
    }

    pub fn n_rows(&self) -> usize {
        self.matrix.n_rows()
    }

    pub fn meta_dims(&self) -> usize {
        self.meta_dims
    }

    pub fn description_dims(&self) -> usize {
        self.matrix.n_cols() - self.meta_dims
    }
}

/// Scales each block by its weight and concatenates them column-wise
///
/// The weights are applied exactly as given. Both matrices must describe the
/// same items in the same order; a row-count mismatch is an internal fault.
pub fn combine(
    meta: &SparseMatrix,
    description: &SparseMatrix,
    w_meta: f64,
    w_desc: f64,
) -> AppResult<CompositeMatrix> {
    if meta.n_rows() != description.n_rows() {
        return Err(AppError::DimensionMismatch(format!(
            "meta matrix has {} rows but description matrix has {}",
            meta.n_rows(),
            description.n_rows()
        )));
    }

    if w_meta < 0.0 || w_desc < 0.0 {
        return Err(AppError::InvalidConfig(format!(
            "weights must be non-negative (w_meta = {}, w_desc = {})",
            w_meta, w_desc
        )));
    }

    let offset = u32::try_from(meta.n_cols()).map_err(|_| {
        AppError::DimensionMismatch(format!("meta vocabulary too large: {}", meta.n_cols()))
    })?;

    let rows = meta
        .rows()
        .iter()
        .zip(description.rows())
        .map(|(meta_row, description_row)| {
            meta_row
                .scaled(w_meta)
                .concat(&description_row.scaled(w_desc), offset)
        })
        .collect();

    Ok(CompositeMatrix {
        matrix: SparseMatrix::new(rows, meta.n_cols() + description.n_cols()),
        meta_dims: meta.n_cols(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::sparse::SparseVector;

    fn matrix(rows: Vec<Vec<(u32, f64)>>, n_cols: usize) -> SparseMatrix {
        SparseMatrix::new(
            rows.into_iter().map(SparseVector::from_entries).collect(),
            n_cols,
        )
    }

    #[test]
    fn test_combine_scales_and_concatenates() {
        let meta = matrix(vec![vec![(0, 1.0)], vec![(1, 1.0)]], 2);
        let description = matrix(vec![vec![(2, 1.0)], vec![]], 3);

        let composite = combine(&meta, &description, 0.7, 0.3).unwrap();

        assert_eq!(composite.n_rows(), 2);
        assert_eq!(composite.meta_dims(), 2);
        assert_eq!(composite.description_dims(), 3);
        assert_eq!(composite.matrix().n_cols(), 5);
        assert_eq!(composite.matrix().row(0).entries(), &[(0, 0.7), (4, 0.3)]);
        assert_eq!(composite.matrix().row(1).entries(), &[(1, 0.7)]);
    }

    #[test]
    fn test_combine_does_not_renormalize_weights() {
        let meta = matrix(vec![vec![(0, 1.0)]], 1);
        let description = matrix(vec![vec![(0, 1.0)]], 1);

        let composite = combine(&meta, &description, 2.0, 2.0).unwrap();
        assert_eq!(composite.matrix().row(0).entries(), &[(0, 2.0), (1, 2.0)]);
    }

    #[test]
    fn test_combine_zero_weight_drops_block() {
        let meta = matrix(vec![vec![(0, 1.0)]], 1);
        let description = matrix(vec![vec![(0, 1.0)]], 1);

        let composite = combine(&meta, &description, 1.0, 0.0).unwrap();
        assert_eq!(composite.matrix().row(0).entries(), &[(0, 1.0)]);
    }

    #[test]
    fn test_combine_row_mismatch_is_fatal() {
        let meta = matrix(vec![vec![(0, 1.0)], vec![]], 1);
        let description = matrix(vec![vec![]], 1);

        let result = combine(&meta, &description, 0.7, 0.3);
        assert!(matches!(result, Err(AppError::DimensionMismatch(_))));
    }

    #[test]
    fn test_combine_rejects_negative_weight() {
        let meta = matrix(vec![vec![]], 1);
        let description = matrix(vec![vec![]], 1);
        assert!(combine(&meta, &description, -0.5, 0.3).is_err());
    }
}
