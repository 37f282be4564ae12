//! Compressed Jacobian evaluation and decompression.
//!
//! With a coloring in hand, the full sparse Jacobian is recovered from one
//! Jacobian-vector product per color instead of one per column:
//!
//! ```text
//! seeds       s_c = indicator of color c's column group
//! compress    B[:, c] = J · s_c          (one engine call per color)
//! decompress  J[i, j] = B[i, color(j)-1]  for every pattern nonzero (i, j)
//! ```
//!
//! Each Jacobian entry (i, j) lands in exactly one compressed column (the
//! one for column j's color) at row i, because no other column of that
//! color has a nonzero in row i - that is precisely the coloring
//! invariant.
//!
//! # Round-trip guarantee
//!
//! For any Jacobian whose true sparsity is a **subset** of the declared
//! pattern, `decompress(compress(...))` reproduces every true nonzero
//! exactly (up to the numerical precision of the engine's JVPs).
//!
//! # Correctness risk: unsound patterns
//!
//! If the declared pattern *omits* a truly nonzero entry, that entry is
//! silently dropped from the reconstruction, and entries sharing its
//! compressed column absorb its value. No runtime detection is attempted
//! here; an unsound pattern only surfaces as disagreement with a dense
//! reference computation (see [`dense_jacobian`]).
//!
//! [`dense_jacobian`]: crate::engine::dense_jacobian

use faer::{FaerMat, Mat};
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use sprs::{CsMat, TriMat};
use thiserror::Error;

use sparjac_core::{SparjacError, SparsityPattern};

use crate::coloring::Coloring;
use crate::engine::JvpEngine;

/// Errors from compressed evaluation and decompression
#[derive(Debug, Error)]
pub enum CompressError {
    /// The external differentiation engine failed; carried unchanged
    #[error("differentiation engine error: {0}")]
    Engine(anyhow::Error),

    /// A seed vector does not match the engine's input dimension
    #[error("seed {index} has length {actual}, engine expects {expected} inputs")]
    SeedDimension {
        index: usize,
        expected: usize,
        actual: usize,
    },

    /// The engine returned a product of the wrong length
    #[error("engine returned {actual} outputs for color {color}, expected {expected}")]
    OutputDimension {
        color: usize,
        expected: usize,
        actual: usize,
    },

    /// Coloring and pattern disagree on the number of columns
    #[error("coloring covers {coloring_cols} columns but the pattern has {pattern_cols}")]
    ColoringMismatch {
        coloring_cols: usize,
        pattern_cols: usize,
    },

    /// Compressed matrix and pattern disagree on the number of rows
    #[error("compressed matrix has {matrix_rows} rows but the pattern has {pattern_rows}")]
    RowMismatch {
        matrix_rows: usize,
        pattern_rows: usize,
    },

    /// Compressed matrix and coloring disagree on the number of colors
    #[error("compressed matrix has {matrix_cols} columns but the coloring uses {num_colors} colors")]
    ColorCount {
        matrix_cols: usize,
        num_colors: usize,
    },
}

impl From<CompressError> for SparjacError {
    fn from(err: CompressError) -> Self {
        match err {
            // Engine failures keep their original error object.
            CompressError::Engine(inner) => SparjacError::Engine(inner),
            other => SparjacError::Compression(other.to_string()),
        }
    }
}

/// Build one 0/1 seed vector per color.
///
/// Seed `c` (0-based) has a 1 at every column assigned color `c + 1`.
pub fn seed_vectors(coloring: &Coloring) -> Vec<Vec<f64>> {
    let mut seeds = vec![vec![0.0; coloring.num_columns()]; coloring.num_colors()];
    for (j, &c) in coloring.colors().iter().enumerate() {
        seeds[c - 1][j] = 1.0;
    }
    seeds
}

fn evaluate_seed(
    engine: &dyn JvpEngine,
    index: usize,
    seed: &[f64],
) -> Result<Vec<f64>, CompressError> {
    let product = engine.jvp(seed).map_err(CompressError::Engine)?;
    if product.len() != engine.output_dim() {
        return Err(CompressError::OutputDimension {
            color: index + 1,
            expected: engine.output_dim(),
            actual: product.len(),
        });
    }
    Ok(product)
}

/// Evaluate one JVP per seed and collect the products as matrix columns.
///
/// The per-seed evaluations share no mutable state; with the `rayon`
/// feature they run in parallel, and results are placed by color index so
/// no ordering guarantee is needed among them.
pub fn compress(
    engine: &dyn JvpEngine,
    seeds: &[Vec<f64>],
) -> Result<Mat<f64>, CompressError> {
    let n = engine.input_dim();
    for (index, seed) in seeds.iter().enumerate() {
        if seed.len() != n {
            return Err(CompressError::SeedDimension {
                index,
                expected: n,
                actual: seed.len(),
            });
        }
    }

    #[cfg(feature = "rayon")]
    let columns = seeds
        .par_iter()
        .enumerate()
        .map(|(c, seed)| evaluate_seed(engine, c, seed))
        .collect::<Result<Vec<_>, _>>()?;

    #[cfg(not(feature = "rayon"))]
    let columns = seeds
        .iter()
        .enumerate()
        .map(|(c, seed)| evaluate_seed(engine, c, seed))
        .collect::<Result<Vec<_>, _>>()?;

    let mut compressed = Mat::zeros(engine.output_dim(), seeds.len());
    for (c, column) in columns.iter().enumerate() {
        for (i, &v) in column.iter().enumerate() {
            compressed.write(i, c, v);
        }
    }
    Ok(compressed)
}

/// Reconstruct the sparse Jacobian from its compressed form.
///
/// Every pattern nonzero (i, j) is read from the compressed matrix at row
/// i, column `color(j) - 1`. An entry is emitted for every declared
/// position - including values that happen to be zero - so the
/// reconstruction's support always equals the declared pattern.
pub fn decompress(
    compressed: &Mat<f64>,
    coloring: &Coloring,
    pattern: &SparsityPattern,
) -> Result<CsMat<f64>, CompressError> {
    if coloring.num_columns() != pattern.n_cols() {
        return Err(CompressError::ColoringMismatch {
            coloring_cols: coloring.num_columns(),
            pattern_cols: pattern.n_cols(),
        });
    }
    if compressed.nrows() != pattern.n_rows() {
        return Err(CompressError::RowMismatch {
            matrix_rows: compressed.nrows(),
            pattern_rows: pattern.n_rows(),
        });
    }
    if compressed.ncols() != coloring.num_colors() {
        return Err(CompressError::ColorCount {
            matrix_cols: compressed.ncols(),
            num_colors: coloring.num_colors(),
        });
    }

    let mut triplets = TriMat::new((pattern.n_rows(), pattern.n_cols()));
    for (i, row) in pattern.rows().enumerate() {
        for &j in row {
            triplets.add_triplet(i, j, compressed.read(i, coloring.color_of(j) - 1));
        }
    }
    Ok(triplets.to_csr())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coloring::{color, ColumnOrdering};
    use crate::engine::MatrixJvp;
    use anyhow::anyhow;

    fn demo_pattern() -> SparsityPattern {
        SparsityPattern::from_rows(3, vec![vec![0, 2], vec![1], vec![0, 1]]).unwrap()
    }

    /// Jacobian whose support matches the demo pattern.
    fn demo_engine() -> MatrixJvp {
        MatrixJvp::from_rows(&[
            vec![1.0, 0.0, 2.0],
            vec![0.0, -3.0, 0.0],
            vec![4.0, 5.0, 0.0],
        ])
        .unwrap()
    }

    struct FailingEngine;

    impl JvpEngine for FailingEngine {
        fn id(&self) -> &str {
            "failing"
        }
        fn input_dim(&self) -> usize {
            3
        }
        fn output_dim(&self) -> usize {
            3
        }
        fn jvp(&self, _seed: &[f64]) -> anyhow::Result<Vec<f64>> {
            Err(anyhow!("deliberate engine failure"))
        }
    }

    #[test]
    fn test_seed_vectors_indicator_structure() {
        let coloring = color(&demo_pattern(), ColumnOrdering::Natural);
        let seeds = seed_vectors(&coloring);
        assert_eq!(seeds, vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 1.0]]);
    }

    #[test]
    fn test_round_trip_recovers_every_entry() {
        let pattern = demo_pattern();
        let coloring = color(&pattern, ColumnOrdering::Natural);
        let engine = demo_engine();

        let compressed = compress(&engine, &seed_vectors(&coloring)).unwrap();
        assert_eq!(compressed.ncols(), 2);

        let jacobian = decompress(&compressed, &coloring, &pattern).unwrap();
        assert_eq!(jacobian.nnz(), pattern.nnz());
        assert_eq!(jacobian.get(0, 0).copied(), Some(1.0));
        assert_eq!(jacobian.get(0, 2).copied(), Some(2.0));
        assert_eq!(jacobian.get(1, 1).copied(), Some(-3.0));
        assert_eq!(jacobian.get(2, 0).copied(), Some(4.0));
        assert_eq!(jacobian.get(2, 1).copied(), Some(5.0));
        // Outside the pattern nothing is reconstructed.
        assert_eq!(jacobian.get(0, 1), None);
        assert_eq!(jacobian.get(2, 2), None);
    }

    #[test]
    fn test_reconstruction_support_equals_pattern() {
        // A true zero inside the pattern stays as an explicit entry, so
        // support comparisons against the pattern remain exact.
        let pattern = demo_pattern();
        let coloring = color(&pattern, ColumnOrdering::Natural);
        let engine = MatrixJvp::from_rows(&[
            vec![1.0, 0.0, 0.0], // (0,2) declared but numerically zero
            vec![0.0, -3.0, 0.0],
            vec![4.0, 5.0, 0.0],
        ])
        .unwrap();

        let compressed = compress(&engine, &seed_vectors(&coloring)).unwrap();
        let jacobian = decompress(&compressed, &coloring, &pattern).unwrap();
        assert_eq!(jacobian.nnz(), pattern.nnz());
        assert_eq!(jacobian.get(0, 2).copied(), Some(0.0));
    }

    #[test]
    fn test_unsound_pattern_silently_drops_entry() {
        // The declared pattern omits (0, 2) even though the Jacobian has a
        // nonzero there. Column 2 then shares color 1 with column 0, the
        // missing entry is dropped, and (0, 0) absorbs its value. This is
        // the documented correctness risk of an unsound pattern - no error
        // is raised.
        let declared =
            SparsityPattern::from_rows(3, vec![vec![0], vec![1], vec![0, 1]]).unwrap();
        let coloring = color(&declared, ColumnOrdering::Natural);
        assert_eq!(coloring.colors(), &[1, 2, 1]);

        let engine = demo_engine();
        let compressed = compress(&engine, &seed_vectors(&coloring)).unwrap();
        let jacobian = decompress(&compressed, &coloring, &declared).unwrap();

        assert_eq!(jacobian.get(0, 2), None);
        assert_eq!(jacobian.get(0, 0).copied(), Some(3.0)); // 1.0 + 2.0
    }

    #[test]
    fn test_engine_failure_propagates_unchanged() {
        let err = compress(&FailingEngine, &[vec![1.0, 0.0, 0.0]]).unwrap_err();
        match err {
            CompressError::Engine(inner) => {
                assert!(inner.to_string().contains("deliberate engine failure"));
            }
            other => panic!("expected Engine error, got {other}"),
        }
    }

    #[test]
    fn test_compress_rejects_bad_seed_length() {
        let engine = demo_engine();
        let err = compress(&engine, &[vec![1.0, 0.0]]).unwrap_err();
        assert!(matches!(
            err,
            CompressError::SeedDimension { index: 0, expected: 3, actual: 2 }
        ));
    }

    #[test]
    fn test_decompress_rejects_mismatched_shapes() {
        let pattern = demo_pattern();
        let coloring = color(&pattern, ColumnOrdering::Natural);
        let engine = demo_engine();
        let compressed = compress(&engine, &seed_vectors(&coloring)).unwrap();

        let short = Coloring::from_colors(vec![1, 2]).unwrap();
        assert!(matches!(
            decompress(&compressed, &short, &pattern),
            Err(CompressError::ColoringMismatch { .. })
        ));

        let tall = Mat::<f64>::zeros(5, 2);
        assert!(matches!(
            decompress(&tall, &coloring, &pattern),
            Err(CompressError::RowMismatch { .. })
        ));

        let wide = Mat::<f64>::zeros(3, 4);
        assert!(matches!(
            decompress(&wide, &coloring, &pattern),
            Err(CompressError::ColorCount { .. })
        ));
    }

    #[test]
    fn test_all_zero_pattern_round_trip() {
        let pattern = SparsityPattern::zeros(3, 3);
        let coloring = color(&pattern, ColumnOrdering::Natural);
        let engine = demo_engine();

        let seeds = seed_vectors(&coloring);
        assert_eq!(seeds.len(), 1);
        let compressed = compress(&engine, &seeds).unwrap();
        let jacobian = decompress(&compressed, &coloring, &pattern).unwrap();
        assert_eq!(jacobian.nnz(), 0);
    }
}
