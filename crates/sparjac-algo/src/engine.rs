//! Differentiation engine boundary.
//!
//! The compression stage needs exactly one capability from the outside
//! world: *given a seed direction vector, return the Jacobian-vector
//! product at the evaluation point*. [`JvpEngine`] captures that contract;
//! the engine itself (forward-mode AD, a tape, an analytical formula) is an
//! opaque collaborator. Engine failures are returned as `anyhow` errors and
//! propagate through the pipeline unchanged - this crate never retries or
//! suppresses them.
//!
//! Two reference engines ship with the crate:
//!
//! - [`FiniteDifferenceJvp`]: central differences around a fixed evaluation
//!   point. Good enough for testing and for functions without an AD
//!   implementation; accuracy is O(h²).
//! - [`MatrixJvp`]: an explicit dense matrix acting as its own Jacobian.
//!   Exact, used to validate recovery without numerical noise.

use anyhow::{anyhow, Result};
use faer::{FaerMat, Mat};

/// Jacobian-vector product oracle at a fixed evaluation point.
///
/// Implementations must be safe to call from multiple threads: the
/// per-color evaluations are mutually independent and may be issued in
/// parallel.
pub trait JvpEngine: Send + Sync {
    /// Unique identifier (e.g. "finite-difference", "dense-matrix")
    fn id(&self) -> &str;

    /// Number of inputs (seed length)
    fn input_dim(&self) -> usize;

    /// Number of outputs (product length)
    fn output_dim(&self) -> usize;

    /// Compute `J · seed` at the engine's evaluation point.
    fn jvp(&self, seed: &[f64]) -> Result<Vec<f64>>;
}

/// Central-difference JVP engine: `J·v ≈ (f(x + h·v) - f(x - h·v)) / 2h`.
///
/// The step is scaled by the magnitude of the evaluation point; override
/// with [`with_step`] when the function's conditioning calls for it.
///
/// [`with_step`]: FiniteDifferenceJvp::with_step
pub struct FiniteDifferenceJvp<F> {
    f: F,
    point: Vec<f64>,
    output_dim: usize,
    step: f64,
}

impl<F> FiniteDifferenceJvp<F>
where
    F: Fn(&[f64]) -> Vec<f64> + Send + Sync,
{
    /// Create an engine for `f` at `point`.
    ///
    /// Probes `f(point)` once to learn the output dimension and to reject
    /// non-finite evaluation points up front.
    pub fn new(f: F, point: Vec<f64>) -> Result<Self> {
        if point.is_empty() {
            return Err(anyhow!("evaluation point must have at least one coordinate"));
        }
        let probe = f(&point);
        if probe.is_empty() {
            return Err(anyhow!("function produced no outputs at the evaluation point"));
        }
        if probe.iter().any(|v| !v.is_finite()) {
            return Err(anyhow!("function is not finite at the evaluation point"));
        }
        Ok(Self {
            f,
            point,
            output_dim: probe.len(),
            // Optimal central-difference step scales like eps^(1/3).
            step: f64::EPSILON.cbrt(),
        })
    }

    /// Override the base finite-difference step.
    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    /// The evaluation point.
    pub fn point(&self) -> &[f64] {
        &self.point
    }
}

impl<F> JvpEngine for FiniteDifferenceJvp<F>
where
    F: Fn(&[f64]) -> Vec<f64> + Send + Sync,
{
    fn id(&self) -> &str {
        "finite-difference"
    }

    fn input_dim(&self) -> usize {
        self.point.len()
    }

    fn output_dim(&self) -> usize {
        self.output_dim
    }

    fn jvp(&self, seed: &[f64]) -> Result<Vec<f64>> {
        let n = self.point.len();
        if seed.len() != n {
            return Err(anyhow!(
                "seed has length {}, expected input dimension {}",
                seed.len(),
                n
            ));
        }

        let scale = self
            .point
            .iter()
            .fold(0.0f64, |acc, &x| acc.max(x.abs()));
        let h = self.step * (1.0 + scale);

        let plus: Vec<f64> = (0..n).map(|i| self.point[i] + h * seed[i]).collect();
        let minus: Vec<f64> = (0..n).map(|i| self.point[i] - h * seed[i]).collect();
        let f_plus = (self.f)(&plus);
        let f_minus = (self.f)(&minus);
        if f_plus.len() != self.output_dim || f_minus.len() != self.output_dim {
            return Err(anyhow!(
                "function changed output dimension during differencing (expected {})",
                self.output_dim
            ));
        }

        Ok(f_plus
            .iter()
            .zip(f_minus.iter())
            .map(|(p, m)| (p - m) / (2.0 * h))
            .collect())
    }
}

/// Exact JVP engine backed by an explicit dense matrix.
pub struct MatrixJvp {
    matrix: Mat<f64>,
}

impl MatrixJvp {
    /// Use `matrix` as the Jacobian.
    pub fn new(matrix: Mat<f64>) -> Self {
        Self { matrix }
    }

    /// Build from row slices; all rows must have equal length.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self> {
        let m = rows.len();
        let n = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != n) {
            return Err(anyhow!("matrix rows have unequal lengths"));
        }
        let mut matrix = Mat::zeros(m, n);
        for (i, row) in rows.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                matrix.write(i, j, v);
            }
        }
        Ok(Self { matrix })
    }

    /// The underlying matrix.
    pub fn matrix(&self) -> &Mat<f64> {
        &self.matrix
    }
}

impl JvpEngine for MatrixJvp {
    fn id(&self) -> &str {
        "dense-matrix"
    }

    fn input_dim(&self) -> usize {
        self.matrix.ncols()
    }

    fn output_dim(&self) -> usize {
        self.matrix.nrows()
    }

    fn jvp(&self, seed: &[f64]) -> Result<Vec<f64>> {
        let (m, n) = (self.matrix.nrows(), self.matrix.ncols());
        if seed.len() != n {
            return Err(anyhow!(
                "seed has length {}, expected input dimension {}",
                seed.len(),
                n
            ));
        }
        let mut out = vec![0.0; m];
        for i in 0..m {
            let mut acc = 0.0;
            for (j, &s) in seed.iter().enumerate() {
                acc += self.matrix.read(i, j) * s;
            }
            out[i] = acc;
        }
        Ok(out)
    }
}

/// Dense reference Jacobian: one JVP per coordinate basis vector.
///
/// This is the uncompressed baseline the compressed pipeline is validated
/// against - `input_dim` engine calls instead of one per color.
pub fn dense_jacobian(engine: &dyn JvpEngine) -> Result<Mat<f64>> {
    let (m, n) = (engine.output_dim(), engine.input_dim());
    let mut jac = Mat::zeros(m, n);
    let mut seed = vec![0.0; n];
    for j in 0..n {
        seed[j] = 1.0;
        let col = engine.jvp(&seed)?;
        seed[j] = 0.0;
        if col.len() != m {
            return Err(anyhow!(
                "engine returned {} outputs, expected {}",
                col.len(),
                m
            ));
        }
        for (i, &v) in col.iter().enumerate() {
            jac.write(i, j, v);
        }
    }
    Ok(jac)
}
