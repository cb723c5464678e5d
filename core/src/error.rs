//! Error types shared by every quickscript crate.
//!
//! [`SchemaError`] is raised while deriving a schema and is fatal: the model
//! cannot be exposed on the command line. [`FieldViolation`] describes one
//! field-level problem found while constructing a model from values; callers
//! collect them into their own aggregated errors.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structural problem with a model's declared fields.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaIssue {
    /// Field shape has no command-line form (list, map).
    #[error("field `{path}` is a {shape}, which has no command-line form")]
    Unrepresentable {
        /// Dotted field path.
        path: String,
        /// Declared shape that was rejected.
        shape: String,
    },
    /// Field name is empty or whitespace-only.
    #[error("field name cannot be empty")]
    EmptyFieldName,
    /// Field name contains characters that cannot appear in a flag.
    #[error("invalid field name: {0}")]
    InvalidFieldName(String),
    /// Two fields (or a field and a boolean negation) produce the same flag.
    #[error("duplicate flag: --{0}")]
    DuplicateFlag(String),
    /// Field uses a name reserved by the parser.
    #[error("field name is reserved: {0}")]
    ReservedName(String),
    /// A field path is also used as the parent of a nested path.
    #[error("field `{0}` conflicts with a nested field of the same prefix")]
    PathConflict(String),
    /// Choice field declares no choices.
    #[error("choice field `{0}` declares no choices")]
    EmptyChoices(String),
    /// Default value does not coerce to the declared type.
    #[error("default for `{path}` is invalid: {message}")]
    InvalidDefault {
        /// Dotted field path.
        path: String,
        /// Coercion failure.
        message: String,
    },
}

/// A model cannot be turned into an argument schema.
///
/// Lists every [`SchemaIssue`] found, not just the first.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("model `{model}` cannot be exposed on the command line: {}", join_issues(.issues))]
pub struct SchemaError {
    /// Model name.
    pub model: String,
    /// Every problem found.
    pub issues: Vec<SchemaIssue>,
}

fn join_issues(issues: &[SchemaIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Category of a [`FieldViolation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationKind {
    /// A required field has no value.
    Missing,
    /// A value was supplied for a field the model does not declare.
    Unknown,
    /// A value failed coercion or a constraint.
    Invalid,
}

/// One field-addressable problem found while constructing a model.
///
/// An empty `path` addresses the model as a whole.
///
/// # Examples
///
/// ```
/// use quickscript_core::{FieldViolation, ViolationKind};
///
/// let v = FieldViolation::missing("mode");
/// assert_eq!(v.kind, ViolationKind::Missing);
/// assert_eq!(v.to_string(), "mode: field required");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// Dotted field path, empty for model-level problems.
    pub path: String,
    /// Violation category.
    pub kind: ViolationKind,
    /// Human readable message.
    pub message: String,
}

impl FieldViolation {
    /// A required field has no value.
    pub fn missing(path: &str) -> Self {
        Self {
            path: path.to_string(),
            kind: ViolationKind::Missing,
            message: "field required".to_string(),
        }
    }

    /// A value was supplied for an undeclared field.
    pub fn unknown(path: &str) -> Self {
        Self {
            path: path.to_string(),
            kind: ViolationKind::Unknown,
            message: "unexpected field".to_string(),
        }
    }

    /// A value is invalid for the field.
    pub fn invalid(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            kind: ViolationKind::Invalid,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "(model): {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

impl std::error::Error for FieldViolation {}
