//! Jacobian sparsity pattern.
//!
//! A sparsity pattern is a boolean matrix (rows = outputs, columns =
//! inputs) marking which Jacobian entries may be nonzero:
//! ```text
//! P[i,j] = 1  if output i may depend on input j
//! ```
//!
//! Patterns are immutable once built. Storage is one sorted, deduplicated
//! column list per row, which keeps row walks allocation-free and makes
//! conflict queries (two columns sharing a row) cheap. [`to_csr`] exports
//! the pattern as a `sprs` CSR matrix for downstream sparse algebra.
//!
//! [`to_csr`]: SparsityPattern::to_csr

use serde::{Deserialize, Serialize};
use sprs::{CsMat, TriMat};
use thiserror::Error;

/// Errors from sparsity pattern construction
#[derive(Debug, Error)]
pub enum PatternError {
    /// A row referenced a column index outside the declared width
    #[error("row {row} references column {col}, but the pattern has {n_cols} columns")]
    ColumnOutOfBounds {
        /// Row containing the offending index
        row: usize,
        /// The out-of-bounds column index
        col: usize,
        /// Declared number of columns
        n_cols: usize,
    },
}

/// Jacobian sparsity pattern: rows = outputs, columns = inputs.
///
/// Each row stores the sorted column indices that may be nonzero.
/// Immutable once constructed from a tracing pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparsityPattern {
    /// Number of columns (inputs)
    n_cols: usize,
    /// Per-row sorted, deduplicated column indices
    rows: Vec<Vec<usize>>,
}

impl SparsityPattern {
    /// Build a pattern from per-row column index lists.
    ///
    /// Rows are sorted and deduplicated; indices at or beyond `n_cols` are
    /// rejected.
    pub fn from_rows(n_cols: usize, rows: Vec<Vec<usize>>) -> Result<Self, PatternError> {
        let mut clean = Vec::with_capacity(rows.len());
        for (i, mut row) in rows.into_iter().enumerate() {
            row.sort_unstable();
            row.dedup();
            if let Some(&col) = row.iter().find(|&&c| c >= n_cols) {
                return Err(PatternError::ColumnOutOfBounds { row: i, col, n_cols });
            }
            clean.push(row);
        }
        Ok(Self { n_cols, rows: clean })
    }

    /// Fully dense pattern (every entry possibly nonzero).
    pub fn dense(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_cols,
            rows: vec![(0..n_cols).collect(); n_rows],
        }
    }

    /// All-zero pattern (no input affects any output).
    pub fn zeros(n_rows: usize, n_cols: usize) -> Self {
        Self {
            n_cols,
            rows: vec![Vec::new(); n_rows],
        }
    }

    /// Number of rows (outputs)
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns (inputs)
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Number of possibly-nonzero entries
    pub fn nnz(&self) -> usize {
        self.rows.iter().map(Vec::len).sum()
    }

    /// Fraction of entries that are possibly nonzero
    pub fn density(&self) -> f64 {
        let cells = self.n_rows() * self.n_cols;
        if cells == 0 {
            0.0
        } else {
            self.nnz() as f64 / cells as f64
        }
    }

    /// Is entry (i, j) marked possibly nonzero?
    pub fn is_nonzero(&self, i: usize, j: usize) -> bool {
        self.rows
            .get(i)
            .is_some_and(|row| row.binary_search(&j).is_ok())
    }

    /// Sorted column indices of row `i`.
    ///
    /// Panics if `i` is out of range.
    pub fn row(&self, i: usize) -> &[usize] {
        &self.rows[i]
    }

    /// Iterate over rows as sorted column index slices.
    pub fn rows(&self) -> impl Iterator<Item = &[usize]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Nonzero count per column.
    pub fn column_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_cols];
        for row in &self.rows {
            for &j in row {
                counts[j] += 1;
            }
        }
        counts
    }

    /// Transpose view: sorted row indices per column (CSC-style).
    pub fn columns(&self) -> Vec<Vec<usize>> {
        let mut cols = vec![Vec::new(); self.n_cols];
        for (i, row) in self.rows.iter().enumerate() {
            for &j in row {
                cols[j].push(i);
            }
        }
        // Rows are visited in order, so each column list is already sorted.
        cols
    }

    /// True when no entry is marked nonzero.
    pub fn is_all_zero(&self) -> bool {
        self.rows.iter().all(Vec::is_empty)
    }

    /// Export as a CSR matrix with 1.0 at every possibly-nonzero position.
    pub fn to_csr(&self) -> CsMat<f64> {
        let mut triplets = TriMat::new((self.n_rows(), self.n_cols));
        for (i, row) in self.rows.iter().enumerate() {
            for &j in row {
                triplets.add_triplet(i, j, 1.0);
            }
        }
        triplets.to_csr()
    }
}
