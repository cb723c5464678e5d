//! Guard error types.
//!
//! Every error a guarded call returns is a [`GuardError`]. The first three
//! variants mean the guard rejected the call; [`GuardError::Failed`] means
//! the wrapped function itself returned an error.

use std::fmt;

use quickscript_core::FieldViolation;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::UnmetDependency;

/// Intent of a guarded function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuardKind {
    /// Read-only retrieval; may declare an output shape.
    Query,
    /// Side-effecting action; output shape is never checked.
    Mutation,
}

impl GuardKind {
    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            GuardKind::Query => "query",
            GuardKind::Mutation => "mutation",
        }
    }
}

impl fmt::Display for GuardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input did not satisfy the declared model. Raised before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid input for `{function}`:\n{}", lines(.violations))]
pub struct ValidationError {
    /// Guarded function name.
    pub function: String,
    /// Every violation found.
    pub violations: Vec<FieldViolation>,
}

/// One or more dependencies are unmet. Raised before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unmet dependencies for `{function}`:\n{}", lines(.unmet))]
pub struct DependencyError {
    /// Guarded function name.
    pub function: String,
    /// Every unmet dependency, in declaration order.
    pub unmet: Vec<UnmetDependency>,
}

/// Returned value has a different shape label than declared.
///
/// Raised after the call, so its side effects have already happened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{function}` returned `{actual}`, expected `{expected}`")]
pub struct OutputShapeError {
    /// Guarded function name.
    pub function: String,
    /// Declared label.
    pub expected: String,
    /// Label of the returned value.
    pub actual: String,
}

fn lines<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| format!("  {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Error returned by a guarded call wrapping a function that fails with `E`.
#[derive(Debug, Error)]
pub enum GuardError<E> {
    /// Input rejected before the call.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Dependencies unmet before the call.
    #[error(transparent)]
    Dependency(#[from] DependencyError),

    /// Output shape mismatch after the call.
    #[error(transparent)]
    OutputShape(#[from] OutputShapeError),

    /// The wrapped function returned an error.
    #[error("{kind} `{function}` failed: {source}")]
    Failed {
        /// Guard kind.
        kind: GuardKind,
        /// Guarded function name.
        function: String,
        /// The function's own error, unchanged.
        #[source]
        source: E,
    },
}

impl<E> GuardError<E> {
    /// Returns `true` when the guard rejected the call, as opposed to the
    /// wrapped function failing.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, GuardError::Failed { .. })
    }

    /// The wrapped function's error, if that is what happened.
    pub fn into_source(self) -> Option<E> {
        match self {
            GuardError::Failed { source, .. } => Some(source),
            _ => None,
        }
    }
}
