//! # sparjac-algo: Compressed Sparse Jacobian Recovery
//!
//! This crate provides the algorithmic pipeline for sparsity-aware Jacobian
//! computation: column conflict graphs, greedy coloring, compressed
//! evaluation through an external differentiation engine, and decompression
//! into a sparse matrix.
//!
//! ## Pipeline
//!
//! | Stage | Module | Cost |
//! |-------|--------|------|
//! | Pattern tracing | `sparjac-core` | one abstract evaluation |
//! | Conflict graph | [`graph`] | O(nnz per row²) |
//! | Greedy coloring | [`coloring`] | O(V + E) |
//! | Compressed JVPs | [`compress`] | one engine call **per color** |
//! | Decompression | [`compress`] | O(pattern nnz) |
//!
//! The payoff is the per-color (instead of per-column) engine cost: a
//! banded Jacobian with bandwidth 1 needs 3 JVP evaluations whether it has
//! 10 columns or 10 million.
//!
//! ### Architecture
//!
//! The differentiation engine is a collaborator, not a component: the
//! [`engine::JvpEngine`] trait is the entire boundary, and everything
//! upstream of it is structural. Two reference engines ship for testing
//! and for functions without an AD implementation (central differences and
//! an explicit matrix).
//!
//! [`solver::SparseJacobianSolver`] orchestrates the stages and reports
//! pattern, coloring, reconstructed Jacobian, and soundness diagnostics in
//! one result struct.
//!
//! ## Example
//!
//! ```
//! use sparjac_algo::engine::FiniteDifferenceJvp;
//! use sparjac_algo::solver::SparseJacobianSolver;
//! use sparjac_core::Tracer;
//!
//! // f(x) = [x0 + x2, x1, x0 * x1]
//! let engine = FiniteDifferenceJvp::new(
//!     |x: &[f64]| vec![x[0] + x[2], x[1], x[0] * x[1]],
//!     vec![1.5, -2.0, 0.5],
//! )
//! .unwrap();
//!
//! let report = SparseJacobianSolver::new()
//!     .compute(
//!         |x: &[Tracer]| Ok(vec![&x[0] + &x[2], x[1].clone(), &x[0] * &x[1]]),
//!         &engine,
//!     )
//!     .unwrap();
//!
//! println!(
//!     "{} nonzeros recovered from {} JVP calls",
//!     report.jacobian.nnz(),
//!     report.jvp_calls
//! );
//! ```
//!
//! ## Correctness caveats
//!
//! - Greedy coloring is a heuristic: valid, deterministic, but not
//!   minimum-color (that problem is NP-hard).
//! - An **unsound pattern** (one that omits a truly nonzero entry) makes
//!   decompression silently drop that entry and corrupt its color group;
//!   see the [`compress`] module docs. Patterns traced without
//!   derivative-zero operations are sound by construction.

pub mod coloring;
pub mod compress;
pub mod engine;
pub mod graph;
pub mod solver;
pub mod test_utils;

pub use coloring::{color, Coloring, ColoringError, ColumnOrdering};
pub use compress::{compress, decompress, seed_vectors, CompressError};
pub use engine::{dense_jacobian, FiniteDifferenceJvp, JvpEngine, MatrixJvp};
pub use graph::{conflict_graph, conflict_stats, ConflictStats};
pub use solver::{SolverOptions, SolverSummary, SparseJacobianReport, SparseJacobianSolver};
