//! Sparse row vectors and row-major sparse matrices
//!
//! Rows store only non-zero entries as index-sorted `(column, value)` pairs, so
//! memory and dot-product cost follow actual vocabulary usage.

/// Sparse vector with strictly increasing column indices
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(u32, f64)>,
}

impl SparseVector {
    /// Builds a vector from arbitrary-order entries, summing repeated columns and dropping zeros
    pub fn from_entries(mut entries: Vec<(u32, f64)>) -> Self {
        entries.sort_by_key(|(column, _)| *column);

        let mut merged: Vec<(u32, f64)> = Vec::with_capacity(entries.len());
        for (column, value) in entries {
            match merged.last_mut() {
                Some((last, total)) if *last == column => *total += value,
                _ => merged.push((column, value)),
            }
        }
        merged.retain(|(_, value)| *value != 0.0);

        Self { entries: merged }
    }

    pub fn entries(&self) -> &[(u32, f64)] {
        &self.entries
    }

    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    pub fn is_zero(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn norm(&self) -> f64 {
        self.entries
            .iter()
            .map(|(_, value)| value * value)
            .sum::<f64>()
            .sqrt()
    }

    /// Scales to unit Euclidean norm; the zero vector stays zero
    pub fn normalized(&self) -> Self {
        let norm = self.norm();
        if norm == 0.0 {
            return Self::default();
        }
        self.scaled(1.0 / norm)
    }

    pub fn scaled(&self, factor: f64) -> Self {
        if factor == 0.0 {
            return Self::default();
        }
        Self {
            entries: self
                .entries
                .iter()
                .map(|(column, value)| (*column, value * factor))
                .collect(),
        }
    }

    /// Dot product by merging the two sorted index lists
    pub fn dot(&self, other: &SparseVector) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut total = 0.0;
        while i < self.entries.len() && j < other.entries.len() {
            let (a_col, a_val) = self.entries[i];
            let (b_col, b_val) = other.entries[j];
            match a_col.cmp(&b_col) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    total += a_val * b_val;
                    i += 1;
                    j += 1;
                }
            }
        }
        total
    }

    /// Appends `other` after this vector, shifting its columns by `offset`
    pub fn concat(&self, other: &SparseVector, offset: u32) -> Self {
        let mut entries = Vec::with_capacity(self.nnz() + other.nnz());
        entries.extend_from_slice(&self.entries);
        entries.extend(
            other
                .entries
                .iter()
                .map(|(column, value)| (column + offset, *value)),
        );
        Self { entries }
    }
}

/// Row-major sparse matrix with a fixed column count
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    rows: Vec<SparseVector>,
    n_cols: usize,
}

impl SparseMatrix {
    pub fn new(rows: Vec<SparseVector>, n_cols: usize) -> Self {
        debug_assert!(rows
            .iter()
            .all(|row| row.entries().iter().all(|(c, _)| (*c as usize) < n_cols)));
        Self { rows, n_cols }
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn row(&self, index: usize) -> &SparseVector {
        &self.rows[index]
    }

    pub fn rows(&self) -> &[SparseVector] {
        &self.rows
    }

    pub fn nnz(&self) -> usize {
        self.rows.iter().map(SparseVector::nnz).sum()
    }

    /// Column postings: for each column, the `(row, value)` pairs that use it
    pub fn column_postings(&self) -> Vec<Vec<(u32, f64)>> {
        let mut postings = vec![Vec::new(); self.n_cols];
        for (row_index, row) in self.rows.iter().enumerate() {
            for (column, value) in row.entries() {
                postings[*column as usize].push((row_index as u32, *value));
            }
        }
        postings
    }
}
