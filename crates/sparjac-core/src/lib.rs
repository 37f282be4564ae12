//! # sparjac-core: Sparsity Detection Core
//!
//! Provides the fundamental data structures for sparsity-aware Jacobian
//! computation: dependency-set tracer values, sparsity patterns, and the
//! unified error type shared across the workspace.
//!
//! ## Design Philosophy
//!
//! Jacobian sparsity is detected **abstractly**, without computing any
//! derivative values:
//!
//! - **Tracer values**: each input is seeded with a singleton dependency set
//!   `{i}`. Every arithmetic operation produces a new tracer whose set is
//!   the union of its operands' sets - a sound over-approximation of "may
//!   influence the result". Tracers carry no numeric payload, so a single
//!   evaluation of the target function yields its full structural pattern.
//! - **Sparsity patterns**: immutable boolean matrices (rows = outputs,
//!   columns = inputs) stored as per-row sorted column lists, convertible
//!   to CSR for downstream sparse algebra.
//! - **Diagnostics**: soundness caveats (e.g. derivative-zero operations
//!   that deliberately narrow the pattern) are collected as warnings, never
//!   silently discarded.
//!
//! ## Quick Start
//!
//! ```
//! use sparjac_core::{trace, Tracer};
//!
//! // f(x) = [x0 + x2, x1, x0 * x1]
//! let pattern = trace(
//!     |x: &[Tracer]| Ok(vec![&x[0] + &x[2], x[1].clone(), &x[0] * &x[1]]),
//!     3,
//! )
//! .unwrap();
//!
//! assert_eq!(pattern.row(0), &[0, 2]);
//! assert_eq!(pattern.row(1), &[1]);
//! assert_eq!(pattern.row(2), &[0, 1]);
//! ```
//!
//! ## Soundness
//!
//! The union rule never omits an index whose true derivative is nonzero,
//! with one documented exception: operations whose derivative is zero
//! everywhere it exists (`signum`, `floor`, `ceil`, `round`) return an
//! empty dependency set. This narrows the pattern for piecewise-constant
//! factors but is a false-negative risk when the traced function has a
//! non-smooth branch; [`trace_with_diagnostics`] surfaces a warning
//! whenever such an operation reaches an output.

pub mod diagnostics;
pub mod error;
pub mod pattern;
pub mod tracer;

pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{SparjacError, SparjacResult};
pub use pattern::{PatternError, SparsityPattern};
pub use tracer::{trace, trace_with_diagnostics, TraceError, Tracer};
