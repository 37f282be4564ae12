//! Diagnostics collected alongside pipeline results.
//!
//! Sparsity tracing can complete successfully and still carry caveats the
//! caller should see - most importantly the soundness narrowing from
//! derivative-zero operations. This module provides a small collector for
//! such issues:
//!
//! - Severity levels (Warning, Error)
//! - Categories for grouping issues (soundness, validation, ...)
//! - Optional entity references (e.g. "output 3", "column 7")
//! - Serialization for JSON output
//!
//! # Example
//!
//! ```
//! use sparjac_core::diagnostics::{Diagnostics, Severity};
//!
//! let mut diag = Diagnostics::new();
//! diag.add_warning("soundness", "pattern may omit non-smooth entries");
//! diag.add_error_with_entity("validation", "empty dependency row", "output 2");
//!
//! assert_eq!(diag.warning_count(), 1);
//! assert_eq!(diag.error_count(), 1);
//! assert!(diag.has_errors());
//! ```

use serde::Serialize;

/// Severity level for diagnostic issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Unusual but the operation continued (e.g. narrowed pattern)
    Warning,
    /// Could not complete an element/operation
    Error,
}

/// A single diagnostic issue encountered during an operation
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticIssue {
    /// Severity of the issue
    pub severity: Severity,
    /// Category for grouping (e.g. "soundness", "validation")
    pub category: String,
    /// Human-readable description of the issue
    pub message: String,
    /// Optional entity reference (e.g. "output 3", "column 7")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
}

/// Collector for diagnostic issues raised during an operation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a warning
    pub fn add_warning(&mut self, category: impl Into<String>, message: impl Into<String>) {
        self.issues.push(DiagnosticIssue {
            severity: Severity::Warning,
            category: category.into(),
            message: message.into(),
            entity: None,
        });
    }

    /// Add a warning with an entity reference
    pub fn add_warning_with_entity(
        &mut self,
        category: impl Into<String>,
        message: impl Into<String>,
        entity: impl Into<String>,
    ) {
        self.issues.push(DiagnosticIssue {
            severity: Severity::Warning,
            category: category.into(),
            message: message.into(),
            entity: Some(entity.into()),
        });
    }

    /// Add an error
    pub fn add_error(&mut self, category: impl Into<String>, message: impl Into<String>) {
        self.issues.push(DiagnosticIssue {
            severity: Severity::Error,
            category: category.into(),
            message: message.into(),
            entity: None,
        });
    }

    /// Add an error with an entity reference
    pub fn add_error_with_entity(
        &mut self,
        category: impl Into<String>,
        message: impl Into<String>,
        entity: impl Into<String>,
    ) {
        self.issues.push(DiagnosticIssue {
            severity: Severity::Error,
            category: category.into(),
            message: message.into(),
            entity: Some(entity.into()),
        });
    }

    /// All collected issues, in insertion order
    pub fn issues(&self) -> &[DiagnosticIssue] {
        &self.issues
    }

    /// Number of warnings
    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count()
    }

    /// Number of errors
    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Error)
            .count()
    }

    /// Any errors recorded?
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    /// No issues at all?
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Absorb all issues from another collector
    pub fn merge(&mut self, other: Diagnostics) {
        self.issues.extend(other.issues);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let mut diag = Diagnostics::new();
        assert!(diag.is_empty());

        diag.add_warning("soundness", "narrowed pattern");
        diag.add_warning_with_entity("soundness", "narrowed pattern", "output 0");
        diag.add_error("validation", "bad dimension");

        assert_eq!(diag.warning_count(), 2);
        assert_eq!(diag.error_count(), 1);
        assert!(diag.has_errors());
        assert!(!diag.is_empty());
    }

    #[test]
    fn test_merge() {
        let mut a = Diagnostics::new();
        a.add_warning("soundness", "one");
        let mut b = Diagnostics::new();
        b.add_error("validation", "two");

        a.merge(b);
        assert_eq!(a.issues().len(), 2);
        assert!(a.has_errors());
    }

    #[test]
    fn test_serialization_skips_missing_entity() {
        let mut diag = Diagnostics::new();
        diag.add_warning("soundness", "no entity here");
        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("\"soundness\""));
        assert!(!json.contains("entity"));
    }
}
