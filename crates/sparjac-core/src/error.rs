//! Unified error types for the sparjac workspace
//!
//! This module provides a common error type [`SparjacError`] that can
//! represent failures from any stage of the pipeline. Stage-specific error
//! enums convert into `SparjacError` for uniform handling at API
//! boundaries.
//!
//! # Example
//!
//! ```ignore
//! use sparjac_core::{SparjacError, SparjacResult};
//!
//! fn run_pipeline() -> SparjacResult<()> {
//!     let pattern = trace(f, n)?;
//!     let coloring = color(&pattern)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::pattern::PatternError;
use crate::tracer::TraceError;

/// Unified error type for all sparjac operations.
///
/// Stage-specific errors (tracing, coloring, compression) convert into
/// this enum so callers of the pipeline facade handle one type.
#[derive(Error, Debug)]
pub enum SparjacError {
    /// Sparsity tracing failed (e.g. the function is not trace-compatible)
    #[error("Trace error: {0}")]
    Trace(#[from] TraceError),

    /// Sparsity pattern construction or validation failed
    #[error("Pattern error: {0}")]
    Pattern(#[from] PatternError),

    /// Column coloring failed or violated its invariant
    #[error("Coloring error: {0}")]
    Coloring(String),

    /// Compressed evaluation or decompression failed
    #[error("Compression error: {0}")]
    Compression(String),

    /// The external differentiation engine failed; the underlying error is
    /// carried unchanged
    #[error("Differentiation engine error: {0}")]
    Engine(anyhow::Error),

    /// Input validation errors (dimension mismatches, etc.)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using SparjacError.
pub type SparjacResult<T> = Result<T, SparjacError>;

// Conversion from anyhow::Error
impl From<anyhow::Error> for SparjacError {
    fn from(err: anyhow::Error) -> Self {
        SparjacError::Other(err.to_string())
    }
}

// Conversion from string-like types for convenience
impl From<String> for SparjacError {
    fn from(s: String) -> Self {
        SparjacError::Other(s)
    }
}

impl From<&str> for SparjacError {
    fn from(s: &str) -> Self {
        SparjacError::Other(s.to_string())
    }
}
