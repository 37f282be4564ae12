//! Shared fixtures for module tests: small systems with known sparsity,
//! provided both as tracer-typed closures (for pattern detection) and as
//! plain numeric functions (for the differentiation engines).

use sparjac_core::{TraceError, Tracer};

/// Three-output demo system: `f(x) = [x0 + x2, x1, x0 * x1]`.
///
/// Pattern rows {0,2}, {1}, {0,1}; two colors under natural ordering.
pub fn demo_system(x: &[Tracer]) -> Result<Vec<Tracer>, TraceError> {
    Ok(vec![&x[0] + &x[2], x[1].clone(), &x[0] * &x[1]])
}

/// Numeric twin of [`demo_system`].
pub fn demo_system_values(x: &[f64]) -> Vec<f64> {
    vec![x[0] + x[2], x[1], x[0] * x[1]]
}

/// Tridiagonal coupling: `y_i = x_i * (x_{i-1} + x_i + x_{i+1})`, with
/// out-of-range neighbors absent.
///
/// The pattern is banded with bandwidth 1 and admits 3 colors at any size.
pub fn tridiagonal_system(x: &[Tracer]) -> Result<Vec<Tracer>, TraceError> {
    let n = x.len();
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let mut s = x[i].clone();
        if i > 0 {
            s = &s + &x[i - 1];
        }
        if i + 1 < n {
            s = &s + &x[i + 1];
        }
        out.push(&x[i] * &s);
    }
    Ok(out)
}

/// Numeric twin of [`tridiagonal_system`].
pub fn tridiagonal_values(x: &[f64]) -> Vec<f64> {
    let n = x.len();
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let mut s = x[i];
        if i > 0 {
            s += x[i - 1];
        }
        if i + 1 < n {
            s += x[i + 1];
        }
        out.push(x[i] * s);
    }
    out
}
