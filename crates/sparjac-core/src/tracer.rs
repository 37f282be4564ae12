//! Dependency-set tracer for sparsity pattern detection.
//!
//! A [`Tracer`] stands in for a numeric input during an abstract evaluation
//! of the target function. It carries no value - only the set of input
//! indices the computed quantity may depend on:
//!
//! ```text
//! x0 = Tracer{0}          x1 = Tracer{1}         x2 = Tracer{2}
//!
//! x0 + x2   -> Tracer{0, 2}        (union of operand sets)
//! x0 * x1   -> Tracer{0, 1}
//! x1.sin()  -> Tracer{1}           (unary ops keep the set)
//! x1 * 3.0  -> Tracer{1}           (scalars contribute nothing)
//! x0.signum() -> Tracer{}          (derivative-zero op, set cleared)
//! ```
//!
//! The union rule is a sound over-approximation: it may mark entries whose
//! derivative happens to be zero, but never omits an entry with a nonzero
//! derivative - with the single documented exception of the derivative-zero
//! operations (`signum`, `floor`, `ceil`, `round`), which clear the set to
//! keep piecewise-constant factors out of the pattern. That narrowing is a
//! false-negative risk at non-smooth branch points; results built from such
//! operations are flagged and [`trace_with_diagnostics`] reports them.
//!
//! Tracers are purely functional: no operation mutates an operand, and
//! re-tracing the same function yields the same pattern.

use std::collections::BTreeSet;
use std::ops::{Add, Div, Mul, Neg, Sub};

use thiserror::Error;

use crate::diagnostics::Diagnostics;
use crate::pattern::{PatternError, SparsityPattern};

/// Errors from sparsity tracing
#[derive(Debug, Error)]
pub enum TraceError {
    /// The traced function needed a concrete numeric value (branching,
    /// comparison) that a tracer cannot provide
    #[error("function is not trace-compatible: {0}")]
    Incompatible(String),

    /// Tracing a zero-input function is meaningless
    #[error("cannot trace a function of zero inputs")]
    NoInputs,

    /// The traced function returned no outputs
    #[error("traced function produced no outputs")]
    NoOutputs,

    /// An output referenced an input index outside the traced dimension
    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// Abstract value tracking which inputs a computed quantity may depend on.
///
/// Created per input via [`Tracer::input`]; every operation derives a new
/// tracer whose dependency set is the union of its operands' sets. See the
/// module docs for the propagation rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tracer {
    /// Input indices this quantity may depend on (sorted, unique)
    deps: BTreeSet<usize>,
    /// Set when a derivative-zero operation contributed to this value
    narrowed: bool,
}

impl Tracer {
    /// Seed tracer for input `index`: dependency set `{index}`.
    pub fn input(index: usize) -> Self {
        Self {
            deps: BTreeSet::from([index]),
            narrowed: false,
        }
    }

    /// Tracer for a constant: empty dependency set.
    pub fn constant() -> Self {
        Self {
            deps: BTreeSet::new(),
            narrowed: false,
        }
    }

    /// Input indices this value may depend on.
    pub fn deps(&self) -> &BTreeSet<usize> {
        &self.deps
    }

    /// Does this value possibly depend on input `j`?
    pub fn depends_on(&self, j: usize) -> bool {
        self.deps.contains(&j)
    }

    /// True when the dependency set is empty.
    pub fn is_constant(&self) -> bool {
        self.deps.is_empty()
    }

    /// True when a derivative-zero operation contributed to this value.
    ///
    /// The pattern derived from a narrowed output may omit entries that are
    /// nonzero off the smooth branch.
    pub fn narrowed(&self) -> bool {
        self.narrowed
    }

    /// Union of both operands' dependency sets.
    fn join(&self, other: &Tracer) -> Tracer {
        Tracer {
            deps: self.deps.union(&other.deps).copied().collect(),
            narrowed: self.narrowed || other.narrowed,
        }
    }

    /// Same dependency set (unary smooth operation, or a scalar operand).
    fn propagate(&self) -> Tracer {
        self.clone()
    }

    /// Empty dependency set with the narrowing flag raised.
    fn narrow(&self) -> Tracer {
        Tracer {
            deps: BTreeSet::new(),
            narrowed: true,
        }
    }

    // --- Elementary operations (closed supported set) -------------------
    //
    // Every operation a traced function may invoke has an explicit variant
    // here; the derivative structure of the operation decides whether the
    // set is propagated, joined, or cleared.

    /// Sine
    pub fn sin(&self) -> Tracer {
        self.propagate()
    }

    /// Cosine
    pub fn cos(&self) -> Tracer {
        self.propagate()
    }

    /// Tangent
    pub fn tan(&self) -> Tracer {
        self.propagate()
    }

    /// Hyperbolic tangent
    pub fn tanh(&self) -> Tracer {
        self.propagate()
    }

    /// Logistic sigmoid
    pub fn sigmoid(&self) -> Tracer {
        self.propagate()
    }

    /// Exponential
    pub fn exp(&self) -> Tracer {
        self.propagate()
    }

    /// Natural logarithm
    pub fn ln(&self) -> Tracer {
        self.propagate()
    }

    /// Square root
    pub fn sqrt(&self) -> Tracer {
        self.propagate()
    }

    /// Reciprocal
    pub fn recip(&self) -> Tracer {
        self.propagate()
    }

    /// Integer power.
    ///
    /// `x.powi(0)` still reports dependence on `x`; the over-approximation
    /// is deliberate (soundness over precision).
    pub fn powi(&self, _n: i32) -> Tracer {
        self.propagate()
    }

    /// Real power with a constant exponent
    pub fn powf(&self, _n: f64) -> Tracer {
        self.propagate()
    }

    /// Power with a traced exponent: depends on base and exponent
    pub fn powt(&self, exponent: &Tracer) -> Tracer {
        self.join(exponent)
    }

    /// Absolute value.
    ///
    /// The subgradient is nonzero away from the kink, so dependencies are
    /// kept.
    pub fn abs(&self) -> Tracer {
        self.propagate()
    }

    /// Elementwise minimum of two traced values.
    ///
    /// Either branch may be active, so the sets are joined.
    pub fn min(&self, other: &Tracer) -> Tracer {
        self.join(other)
    }

    /// Elementwise maximum of two traced values.
    pub fn max(&self, other: &Tracer) -> Tracer {
        self.join(other)
    }

    /// Euclidean norm of `(self, other)`
    pub fn hypot(&self, other: &Tracer) -> Tracer {
        self.join(other)
    }

    // --- Derivative-zero operations -------------------------------------

    /// Sign function: clears the dependency set.
    ///
    /// `signum` is piecewise constant, so its derivative is zero wherever
    /// it exists and the result is treated as independent of the inputs.
    /// This narrows the pattern but is a false-negative risk when the
    /// traced function is evaluated at the jump; the result is flagged as
    /// narrowed and surfaced through [`trace_with_diagnostics`].
    pub fn signum(&self) -> Tracer {
        self.narrow()
    }

    /// Floor: derivative-zero, clears the dependency set (see [`signum`]).
    ///
    /// [`signum`]: Tracer::signum
    pub fn floor(&self) -> Tracer {
        self.narrow()
    }

    /// Ceiling: derivative-zero, clears the dependency set (see [`signum`]).
    ///
    /// [`signum`]: Tracer::signum
    pub fn ceil(&self) -> Tracer {
        self.narrow()
    }

    /// Round: derivative-zero, clears the dependency set (see [`signum`]).
    ///
    /// [`signum`]: Tracer::signum
    pub fn round(&self) -> Tracer {
        self.narrow()
    }

    // --- Trace-incompatible accesses ------------------------------------

    /// Concrete numeric value of this tracer.
    ///
    /// Always fails: tracers carry dependency sets, not numbers. A traced
    /// function that calls this (directly or to branch on the result) is
    /// not trace-compatible, and the failure must reach the caller rather
    /// than be approximated away.
    pub fn value(&self) -> Result<f64, TraceError> {
        Err(TraceError::Incompatible(
            "the function read a tracer's concrete numeric value; tracers carry \
             dependency sets only"
                .into(),
        ))
    }

    /// Ordering comparison against another tracer.
    ///
    /// Always fails: comparing tracers would require concrete values. Use
    /// [`Tracer::min`] / [`Tracer::max`] for branch-free formulations.
    pub fn compare(&self, _other: &Tracer) -> Result<std::cmp::Ordering, TraceError> {
        Err(TraceError::Incompatible(
            "the function compared tracer values; control flow on traced inputs \
             cannot be analyzed"
                .into(),
        ))
    }
}

macro_rules! tracer_binop {
    ($imp:ident, $method:ident) => {
        impl $imp<Tracer> for Tracer {
            type Output = Tracer;
            fn $method(self, rhs: Tracer) -> Tracer {
                self.join(&rhs)
            }
        }

        impl<'a> $imp<&'a Tracer> for Tracer {
            type Output = Tracer;
            fn $method(self, rhs: &'a Tracer) -> Tracer {
                self.join(rhs)
            }
        }

        impl<'a> $imp<Tracer> for &'a Tracer {
            type Output = Tracer;
            fn $method(self, rhs: Tracer) -> Tracer {
                self.join(&rhs)
            }
        }

        impl<'a, 'b> $imp<&'b Tracer> for &'a Tracer {
            type Output = Tracer;
            fn $method(self, rhs: &'b Tracer) -> Tracer {
                self.join(rhs)
            }
        }

        impl $imp<f64> for Tracer {
            type Output = Tracer;
            fn $method(self, _rhs: f64) -> Tracer {
                self.propagate()
            }
        }

        impl<'a> $imp<f64> for &'a Tracer {
            type Output = Tracer;
            fn $method(self, _rhs: f64) -> Tracer {
                self.propagate()
            }
        }

        impl $imp<Tracer> for f64 {
            type Output = Tracer;
            fn $method(self, rhs: Tracer) -> Tracer {
                rhs.propagate()
            }
        }

        impl<'a> $imp<&'a Tracer> for f64 {
            type Output = Tracer;
            fn $method(self, rhs: &'a Tracer) -> Tracer {
                rhs.propagate()
            }
        }
    };
}

tracer_binop!(Add, add);
tracer_binop!(Sub, sub);
tracer_binop!(Mul, mul);
tracer_binop!(Div, div);

impl Neg for Tracer {
    type Output = Tracer;
    fn neg(self) -> Tracer {
        self.propagate()
    }
}

impl Neg for &Tracer {
    type Output = Tracer;
    fn neg(self) -> Tracer {
        self.propagate()
    }
}

/// Trace a function's Jacobian sparsity pattern.
///
/// Seeds one tracer per input (singleton dependency set), invokes `f` on
/// the tracer vector, and reads each output's dependency set into a pattern
/// row. No derivative values are computed.
///
/// # Errors
///
/// - [`TraceError::NoInputs`] / [`TraceError::NoOutputs`] for degenerate
///   dimensions
/// - [`TraceError::Incompatible`] when `f` needed a concrete value
///   (propagated from the closure)
pub fn trace<F>(f: F, n_inputs: usize) -> Result<SparsityPattern, TraceError>
where
    F: FnOnce(&[Tracer]) -> Result<Vec<Tracer>, TraceError>,
{
    let (pattern, _) = trace_with_diagnostics(f, n_inputs)?;
    Ok(pattern)
}

/// [`trace`], additionally collecting soundness diagnostics.
///
/// A warning is emitted for every output whose value was built from a
/// derivative-zero operation (`signum`, `floor`, `ceil`, `round`): the
/// pattern row may omit entries that are nonzero off the smooth branch.
pub fn trace_with_diagnostics<F>(
    f: F,
    n_inputs: usize,
) -> Result<(SparsityPattern, Diagnostics), TraceError>
where
    F: FnOnce(&[Tracer]) -> Result<Vec<Tracer>, TraceError>,
{
    if n_inputs == 0 {
        return Err(TraceError::NoInputs);
    }

    let inputs: Vec<Tracer> = (0..n_inputs).map(Tracer::input).collect();
    let outputs = f(&inputs)?;
    if outputs.is_empty() {
        return Err(TraceError::NoOutputs);
    }

    let mut diagnostics = Diagnostics::new();
    let mut rows = Vec::with_capacity(outputs.len());
    for (i, out) in outputs.iter().enumerate() {
        if out.narrowed() {
            diagnostics.add_warning_with_entity(
                "soundness",
                "value built from a derivative-zero operation (signum/floor/ceil/round); \
                 the pattern row may omit entries that are nonzero off the smooth branch",
                format!("output {i}"),
            );
        }
        rows.push(out.deps().iter().copied().collect::<Vec<usize>>());
    }

    let pattern = SparsityPattern::from_rows(n_inputs, rows)?;
    Ok((pattern, diagnostics))
}
