//! Structural validation of argument schemas.
//!
//! Catches problems that would otherwise surface as confusing parser errors:
//! names that cannot be flags, duplicate flags (including boolean negations),
//! the reserved `help` name, empty choice lists and defaults that do not fit
//! the declared type.
//!
//! # Examples
//!
//! ```
//! use quickscript_core::*;
//!
//! let mut schema = ArgumentSchema::new("Args");
//! schema.fields.push(FieldSchema::new("mode", FieldType::String));
//! assert!(validate_schema(&schema).is_empty());
//!
//! // `help` is reserved for the usage flag
//! schema.fields.push(FieldSchema::new("help", FieldType::Boolean));
//! assert_eq!(
//!     validate_schema(&schema),
//!     vec![SchemaIssue::ReservedName("help".to_string())]
//! );
//! ```

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::{ArgumentSchema, FieldType, SchemaIssue, coerce_value};

/// Flag names the parser claims for itself.
pub const RESERVED_NAMES: &[&str] = &["help"];

static SEGMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").expect("static regex must compile")
});

/// Validates an argument schema, returning every issue found.
pub fn validate_schema(schema: &ArgumentSchema) -> Vec<SchemaIssue> {
    let mut issues = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for field in &schema.fields {
        let name = field.name.trim();
        if name.is_empty() {
            issues.push(SchemaIssue::EmptyFieldName);
            continue;
        }

        if !name.split('.').all(|segment| SEGMENT_RE.is_match(segment)) {
            issues.push(SchemaIssue::InvalidFieldName(name.to_string()));
            continue;
        }

        if RESERVED_NAMES.contains(&name) {
            issues.push(SchemaIssue::ReservedName(name.to_string()));
        }

        if !seen.insert(name.to_string()) {
            issues.push(SchemaIssue::DuplicateFlag(name.to_string()));
        }
        if field.field_type.is_boolean() {
            let negation = format!("no-{name}");
            if !seen.insert(negation.clone()) {
                issues.push(SchemaIssue::DuplicateFlag(negation));
            }
        }

        if let FieldType::Choice(choices) = &field.field_type {
            if choices.is_empty() {
                issues.push(SchemaIssue::EmptyChoices(name.to_string()));
                continue;
            }
        }

        match &field.default {
            None => {}
            Some(Value::Null) if field.optional => {}
            Some(default) => {
                if let Err(message) = coerce_value(&field.field_type, default) {
                    issues.push(SchemaIssue::InvalidDefault {
                        path: name.to_string(),
                        message,
                    });
                }
            }
        }
    }

    for field in &schema.fields {
        let prefix = format!("{}.", field.name);
        if schema.fields.iter().any(|other| other.name.starts_with(&prefix)) {
            issues.push(SchemaIssue::PathConflict(field.name.clone()));
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldSchema;

    fn schema_with(fields: Vec<FieldSchema>) -> ArgumentSchema {
        let mut schema = ArgumentSchema::new("Args");
        schema.fields = fields;
        schema
    }

    #[test]
    fn test_validate_rejects_negation_collision() {
        let schema = schema_with(vec![
            FieldSchema::new("verbose", FieldType::Boolean),
            FieldSchema::new("no-verbose", FieldType::String),
        ]);

        assert_eq!(
            validate_schema(&schema),
            vec![SchemaIssue::DuplicateFlag("no-verbose".to_string())]
        );
    }

    #[test]
    fn test_validate_rejects_bad_names() {
        let schema = schema_with(vec![
            FieldSchema::new("", FieldType::String),
            FieldSchema::new("two words", FieldType::String),
            FieldSchema::new("9lives", FieldType::Integer),
        ]);

        assert_eq!(
            validate_schema(&schema),
            vec![
                SchemaIssue::EmptyFieldName,
                SchemaIssue::InvalidFieldName("two words".to_string()),
                SchemaIssue::InvalidFieldName("9lives".to_string()),
            ]
        );
    }

    #[test]
    fn test_validate_checks_defaults_and_choices() {
        let schema = schema_with(vec![
            FieldSchema::new("mode", FieldType::Choice(vec!["a".into(), "b".into()]))
                .with_default("c"),
            FieldSchema::new("level", FieldType::Choice(Vec::new())),
            FieldSchema::new("count", FieldType::Integer).with_default("ten"),
        ]);

        let issues = validate_schema(&schema);
        assert_eq!(issues.len(), 3);
        assert!(matches!(&issues[0], SchemaIssue::InvalidDefault { path, .. } if path == "mode"));
        assert_eq!(issues[1], SchemaIssue::EmptyChoices("level".to_string()));
        assert!(matches!(&issues[2], SchemaIssue::InvalidDefault { path, .. } if path == "count"));
    }

    #[test]
    fn test_validate_rejects_path_conflict() {
        let schema = schema_with(vec![
            FieldSchema::new("db", FieldType::String),
            FieldSchema::new("db.host", FieldType::String),
        ]);

        assert_eq!(
            validate_schema(&schema),
            vec![SchemaIssue::PathConflict("db".to_string())]
        );
    }

    #[test]
    fn test_validate_accepts_dotted_paths() {
        let schema = schema_with(vec![
            FieldSchema::new("db.host", FieldType::String),
            FieldSchema::new("db.port", FieldType::Integer).with_default(5432),
            FieldSchema::new("dry-run", FieldType::Boolean).with_default(false),
        ]);

        assert!(validate_schema(&schema).is_empty());
    }
}
