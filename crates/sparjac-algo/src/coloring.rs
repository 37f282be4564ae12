//! Greedy column coloring of a sparsity pattern.
//!
//! A coloring partitions the columns of a Jacobian so that no two columns
//! in the same group share a possibly-nonzero row. One Jacobian-vector
//! product per group then recovers every entry, instead of one per column:
//!
//! ```text
//!         pattern              coloring          seeds (one per color)
//!   ┌ x . x ┐             col 0 -> color 1        s1 = [1 0 0]
//!   │ . x . │             col 1 -> color 2        s2 = [0 1 1]
//!   └ x x . ┘             col 2 -> color 2
//!
//!   2 JVP calls instead of 3; columns 1 and 2 never meet in a row, so
//!   their summed product separates cleanly.
//! ```
//!
//! # Ordering heuristics
//!
//! | Ordering | Rule | Use |
//! |----------|------|-----|
//! | [`ColumnOrdering::Natural`] | index order | deterministic default |
//! | [`ColumnOrdering::LargestFirst`] | decreasing column nnz, index tiebreak | classic color-count heuristic |
//!
//! Greedy coloring is a heuristic: it always produces a **valid** coloring
//! but not necessarily a minimum one (minimum coloring is NP-hard). Given
//! the same pattern and ordering the result is reproducible.

use std::cmp::Reverse;

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sparjac_core::{SparjacError, SparsityPattern};

use crate::graph::conflict_graph;

/// Errors from coloring construction and validation
#[derive(Debug, Error)]
pub enum ColoringError {
    /// Two same-colored columns share a nonzero row.
    ///
    /// This is an internal invariant violation - a bug in the coloring
    /// algorithm, not a recoverable condition. Asserted in tests.
    #[error("columns {col_a} and {col_b} both have color {color} but share row {row}")]
    Conflict {
        row: usize,
        col_a: usize,
        col_b: usize,
        color: usize,
    },

    /// Coloring and pattern disagree on the number of columns
    #[error("coloring covers {coloring_cols} columns but the pattern has {pattern_cols}")]
    SizeMismatch {
        coloring_cols: usize,
        pattern_cols: usize,
    },

    /// Colors must be positive integers
    #[error("column {column} has invalid color {color}; colors are positive integers")]
    InvalidColor { column: usize, color: usize },
}

impl From<ColoringError> for SparjacError {
    fn from(err: ColoringError) -> Self {
        SparjacError::Coloring(err.to_string())
    }
}

/// Column visiting order for the greedy pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColumnOrdering {
    /// Index order: fully deterministic, no preprocessing
    #[default]
    Natural,
    /// Decreasing column nonzero count, index order on ties
    LargestFirst,
}

/// A partition of columns into conflict-free groups.
///
/// Colors are 1-based positive integers, one per column. The number of
/// colors is the compression factor: one JVP evaluation per color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coloring {
    /// 1-based color per column
    colors: Vec<usize>,
    /// Highest color in use (0 for an empty coloring)
    num_colors: usize,
}

impl Coloring {
    /// Wrap an explicit color assignment.
    ///
    /// Colors must be positive; `num_colors` becomes the maximum color.
    /// Validity against a pattern is a separate concern - see
    /// [`Coloring::verify`].
    pub fn from_colors(colors: Vec<usize>) -> Result<Self, ColoringError> {
        if let Some((column, &color)) = colors.iter().enumerate().find(|(_, &c)| c == 0) {
            return Err(ColoringError::InvalidColor { column, color });
        }
        let num_colors = colors.iter().copied().max().unwrap_or(0);
        Ok(Self { colors, num_colors })
    }

    /// 1-based color per column
    pub fn colors(&self) -> &[usize] {
        &self.colors
    }

    /// Color of column `j`.
    ///
    /// Panics if `j` is out of range.
    pub fn color_of(&self, j: usize) -> usize {
        self.colors[j]
    }

    /// Number of columns covered
    pub fn num_columns(&self) -> usize {
        self.colors.len()
    }

    /// Number of colors in use (the compression factor)
    pub fn num_colors(&self) -> usize {
        self.num_colors
    }

    /// Column groups, indexed by color - 1.
    pub fn groups(&self) -> Vec<Vec<usize>> {
        let mut groups = vec![Vec::new(); self.num_colors];
        for (j, &c) in self.colors.iter().enumerate() {
            groups[c - 1].push(j);
        }
        groups
    }

    /// Columns per color: `num_columns / num_colors`.
    pub fn compression_ratio(&self) -> f64 {
        if self.num_colors == 0 {
            1.0
        } else {
            self.colors.len() as f64 / self.num_colors as f64
        }
    }

    /// Check the coloring invariant against a pattern: no two same-colored
    /// columns may share a possibly-nonzero row.
    ///
    /// A [`ColoringError::Conflict`] from a coloring produced by [`color`]
    /// indicates a bug, never an expected runtime condition.
    pub fn verify(&self, pattern: &SparsityPattern) -> Result<(), ColoringError> {
        if self.colors.len() != pattern.n_cols() {
            return Err(ColoringError::SizeMismatch {
                coloring_cols: self.colors.len(),
                pattern_cols: pattern.n_cols(),
            });
        }
        for (i, row) in pattern.rows().enumerate() {
            for (pos, &a) in row.iter().enumerate() {
                for &b in &row[pos + 1..] {
                    if self.colors[a] == self.colors[b] {
                        return Err(ColoringError::Conflict {
                            row: i,
                            col_a: a,
                            col_b: b,
                            color: self.colors[a],
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// Greedily color the columns of a sparsity pattern.
///
/// Visits columns in the chosen order and assigns each the smallest
/// positive color not used by any already-colored conflicting column.
///
/// Conventions:
/// - an all-zero pattern has no conflicts, so every column gets color 1;
/// - a zero-column pattern yields an empty coloring with zero colors.
pub fn color(pattern: &SparsityPattern, ordering: ColumnOrdering) -> Coloring {
    let n = pattern.n_cols();
    let graph = conflict_graph(pattern);

    let order: Vec<usize> = match ordering {
        ColumnOrdering::Natural => (0..n).collect(),
        ColumnOrdering::LargestFirst => {
            let counts = pattern.column_counts();
            let mut idx: Vec<usize> = (0..n).collect();
            idx.sort_by_key(|&j| (Reverse(counts[j]), j));
            idx
        }
    };

    // 0 = unassigned; at most n colors can ever be needed.
    let mut colors = vec![0usize; n];
    let mut forbidden = vec![false; n + 1];
    for &j in &order {
        for neighbor in graph.neighbors(NodeIndex::new(j)) {
            let c = colors[neighbor.index()];
            if c != 0 {
                forbidden[c] = true;
            }
        }
        let mut c = 1;
        while forbidden[c] {
            c += 1;
        }
        colors[j] = c;
        // Reset only what we touched.
        for neighbor in graph.neighbors(NodeIndex::new(j)) {
            forbidden[colors[neighbor.index()]] = false;
        }
    }

    let num_colors = colors.iter().copied().max().unwrap_or(0);
    Coloring { colors, num_colors }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_pattern() -> SparsityPattern {
        // f(x) = [x0 + x2, x1, x0 * x1]
        SparsityPattern::from_rows(3, vec![vec![0, 2], vec![1], vec![0, 1]]).unwrap()
    }

    #[test]
    fn test_demo_pattern_natural_coloring() {
        let coloring = color(&demo_pattern(), ColumnOrdering::Natural);
        // Column 0 conflicts with both others (rows 0 and 2); columns 1 and
        // 2 never share a row, so they share a color.
        assert_eq!(coloring.colors(), &[1, 2, 2]);
        assert_eq!(coloring.num_colors(), 2);
        coloring.verify(&demo_pattern()).unwrap();
    }

    #[test]
    fn test_dense_pattern_needs_all_columns() {
        for ordering in [ColumnOrdering::Natural, ColumnOrdering::LargestFirst] {
            let pattern = SparsityPattern::dense(4, 5);
            let coloring = color(&pattern, ordering);
            assert_eq!(coloring.num_colors(), 5);
            coloring.verify(&pattern).unwrap();
        }
    }

    #[test]
    fn test_single_column_single_color() {
        // One input: a single color regardless of the pattern.
        for rows in [vec![vec![0], vec![0], vec![0]], vec![vec![], vec![0]]] {
            let pattern = SparsityPattern::from_rows(1, rows).unwrap();
            for ordering in [ColumnOrdering::Natural, ColumnOrdering::LargestFirst] {
                let coloring = color(&pattern, ordering);
                assert_eq!(coloring.colors(), &[1]);
                assert_eq!(coloring.num_colors(), 1);
            }
        }
    }

    #[test]
    fn test_all_zero_pattern_single_color() {
        let pattern = SparsityPattern::zeros(4, 6);
        let coloring = color(&pattern, ColumnOrdering::Natural);
        assert_eq!(coloring.colors(), &[1; 6]);
        assert_eq!(coloring.num_colors(), 1);
    }

    #[test]
    fn test_largest_first_visits_hub_first() {
        // Star: column 5 meets every other column in some row.
        let rows = (0..5).map(|j| vec![j, 5]).collect::<Vec<_>>();
        let pattern = SparsityPattern::from_rows(6, rows).unwrap();

        let natural = color(&pattern, ColumnOrdering::Natural);
        let largest = color(&pattern, ColumnOrdering::LargestFirst);
        natural.verify(&pattern).unwrap();
        largest.verify(&pattern).unwrap();

        // Both need two colors, but the hub is colored first (and gets 1)
        // only under LargestFirst.
        assert_eq!(natural.num_colors(), 2);
        assert_eq!(largest.num_colors(), 2);
        assert_eq!(natural.color_of(5), 2);
        assert_eq!(largest.color_of(5), 1);
    }

    #[test]
    fn test_coloring_is_deterministic() {
        let pattern = SparsityPattern::from_rows(
            5,
            vec![vec![0, 1, 4], vec![2, 3], vec![0, 3], vec![1, 2]],
        )
        .unwrap();
        let a = color(&pattern, ColumnOrdering::LargestFirst);
        let b = color(&pattern, ColumnOrdering::LargestFirst);
        assert_eq!(a, b);
    }

    #[test]
    fn test_num_colors_never_exceeds_columns() {
        let patterns = [
            demo_pattern(),
            SparsityPattern::dense(3, 4),
            SparsityPattern::zeros(2, 7),
            SparsityPattern::from_rows(4, vec![vec![0, 1], vec![1, 2], vec![2, 3]]).unwrap(),
        ];
        for pattern in &patterns {
            for ordering in [ColumnOrdering::Natural, ColumnOrdering::LargestFirst] {
                let coloring = color(pattern, ordering);
                assert!(coloring.num_colors() <= pattern.n_cols());
                coloring.verify(pattern).unwrap();
            }
        }
    }

    #[test]
    fn test_verify_rejects_conflicting_assignment() {
        // Columns 0 and 2 share row 0 but are both colored 1.
        let bad = Coloring::from_colors(vec![1, 2, 1]).unwrap();
        let err = bad.verify(&demo_pattern()).unwrap_err();
        assert!(matches!(
            err,
            ColoringError::Conflict { row: 0, col_a: 0, col_b: 2, color: 1 }
        ));
    }

    #[test]
    fn test_verify_rejects_size_mismatch() {
        let short = Coloring::from_colors(vec![1, 2]).unwrap();
        assert!(matches!(
            short.verify(&demo_pattern()),
            Err(ColoringError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_from_colors_rejects_zero() {
        assert!(matches!(
            Coloring::from_colors(vec![1, 0]),
            Err(ColoringError::InvalidColor { column: 1, color: 0 })
        ));
    }

    #[test]
    fn test_groups_partition_columns() {
        let coloring = color(&demo_pattern(), ColumnOrdering::Natural);
        assert_eq!(coloring.groups(), vec![vec![0], vec![1, 2]]);
        assert!((coloring.compression_ratio() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_empty_coloring() {
        let coloring = Coloring::from_colors(vec![]).unwrap();
        assert_eq!(coloring.num_colors(), 0);
        assert!((coloring.compression_ratio() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_serde_round_trip() {
        let coloring = color(&demo_pattern(), ColumnOrdering::Natural);
        let json = serde_json::to_string(&coloring).unwrap();
        let back: Coloring = serde_json::from_str(&json).unwrap();
        assert_eq!(coloring, back);
    }
}
