//! Argument parsing errors.

use quickscript_core::{FieldViolation, SchemaError, ViolationKind};
use thiserror::Error;

/// One problem found in a process argument vector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentIssue {
    /// A flag the schema does not declare.
    #[error("{0}: unknown flag")]
    UnknownFlag(String),
    /// A token that is not a flag and not a flag's value.
    #[error("unexpected value `{0}`")]
    UnexpectedValue(String),
    /// A value flag at the end of the vector, or a boolean given a value.
    #[error("{flag}: {message}")]
    Malformed {
        /// Offending flag as written.
        flag: String,
        /// What was wrong with it.
        message: String,
    },
    /// Field-level failure from model construction.
    #[error("{}", field_line(.0))]
    Field(FieldViolation),
}

fn field_line(violation: &FieldViolation) -> String {
    if violation.path.is_empty() {
        violation.message.clone()
    } else {
        format!("--{}: {}", violation.path, violation.message)
    }
}

/// Every problem found while turning arguments into a model.
///
/// Displays as one line per issue so it can be printed to stderr as is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid arguments for `{program}`:\n{}", render_issues(.issues))]
pub struct ArgumentError {
    /// Program the arguments were meant for.
    pub program: String,
    /// Every issue, in discovery order.
    pub issues: Vec<ArgumentIssue>,
}

fn render_issues(issues: &[ArgumentIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("  {issue}"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl ArgumentError {
    /// Names of required fields that were not supplied.
    pub fn missing_fields(&self) -> Vec<&str> {
        self.issues
            .iter()
            .filter_map(|issue| match issue {
                ArgumentIssue::Field(v) if v.kind == ViolationKind::Missing => {
                    Some(v.path.as_str())
                }
                _ => None,
            })
            .collect()
    }

    /// Returns `true` if any issue addresses `field` (by path or flag).
    pub fn mentions(&self, field: &str) -> bool {
        let flag = format!("--{field}");
        self.issues.iter().any(|issue| match issue {
            ArgumentIssue::Field(v) => v.path == field,
            ArgumentIssue::UnknownFlag(f) => f == field || *f == flag,
            ArgumentIssue::Malformed { flag: f, .. } => f == field || f.starts_with(&flag),
            ArgumentIssue::UnexpectedValue(_) => false,
        })
    }
}

/// Failure of a one-shot parse: either the model or the arguments.
#[derive(Debug, Error)]
pub enum SynthError {
    /// The model has no command-line form.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// The arguments do not match the schema.
    #[error(transparent)]
    Argument(#[from] ArgumentError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argument_error_renders_one_line_per_issue() {
        let err = ArgumentError {
            program: "greet".to_string(),
            issues: vec![
                ArgumentIssue::Field(FieldViolation::missing("name")),
                ArgumentIssue::Field(FieldViolation::invalid("age", "expected an integer, got `x`")),
                ArgumentIssue::UnknownFlag("--colour".to_string()),
            ],
        };

        assert_eq!(
            err.to_string(),
            "invalid arguments for `greet`:\n  --name: field required\n  --age: expected an integer, got `x`\n  --colour: unknown flag"
        );
        assert_eq!(err.missing_fields(), vec!["name"]);
        assert!(err.mentions("age"));
        assert!(err.mentions("colour"));
        assert!(!err.mentions("verbose"));
    }
}
