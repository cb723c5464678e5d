//! Model introspection.
//!
//! Turns an [`ArgsModel`]'s declared fields into an [`ArgumentSchema`].
//! Nested models are flattened into dotted paths (`db.host`); lists and maps
//! are rejected because they have no single-flag form. The result is checked
//! by [`validate_schema`] before it is returned, so a schema that comes out
//! of here can always be turned into a parser.

use serde_json::Value;

use crate::{
    ArgsModel, ArgumentSchema, DeclaredType, FieldDecl, FieldSchema, FieldType, SchemaError,
    SchemaIssue, validate_schema,
};

/// Derives the argument schema of `A`.
///
/// Pure function of `A`'s declarations: calling it twice yields identical
/// schemas.
///
/// # Errors
///
/// Returns [`SchemaError`] listing every field that cannot be represented on
/// the command line and every structural problem of the flattened schema.
///
/// # Examples
///
/// ```
/// use quickscript_core::{ArgsModel, FieldDecl, FieldType, introspect};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Args {
///     input_file: String,
///     mode: String,
/// }
///
/// impl ArgsModel for Args {
///     fn fields() -> Vec<FieldDecl> {
///         vec![
///             FieldDecl::string("input_file").with_default("default.txt"),
///             FieldDecl::string("mode").with_description("Processing mode"),
///         ]
///     }
/// }
///
/// let schema = introspect::<Args>().unwrap();
/// assert_eq!(schema.field_names(), vec!["input_file", "mode"]);
/// assert!(!schema.fields[0].required);
/// assert!(schema.fields[1].required);
/// assert_eq!(schema.fields[1].field_type, FieldType::String);
/// ```
pub fn introspect<A: ArgsModel>() -> Result<ArgumentSchema, SchemaError> {
    introspect_fields(A::model_name(), A::description(), &A::fields())
}

/// Derives a schema from explicit declarations.
///
/// [`introspect`] is the usual entry point; this form serves callers that
/// hold declarations without a model type.
pub fn introspect_fields(
    model: &str,
    description: Option<&str>,
    decls: &[FieldDecl],
) -> Result<ArgumentSchema, SchemaError> {
    let mut schema = ArgumentSchema::new(model);
    schema.description = description.map(str::to_string);

    let mut issues = Vec::new();
    flatten(
        None,
        decls,
        false,
        &mut schema.fields,
        &mut schema.optional_groups,
        &mut issues,
    );
    issues.extend(validate_schema(&schema));

    if issues.is_empty() {
        Ok(schema)
    } else {
        Err(SchemaError {
            model: model.to_string(),
            issues,
        })
    }
}

fn flatten(
    prefix: Option<&str>,
    decls: &[FieldDecl],
    parent_optional: bool,
    out: &mut Vec<FieldSchema>,
    groups: &mut Vec<String>,
    issues: &mut Vec<SchemaIssue>,
) {
    for decl in decls {
        let path = match prefix {
            Some(prefix) => format!("{prefix}.{}", decl.name),
            None => decl.name.clone(),
        };

        let mut declared = &decl.declared;
        let mut own_optional = false;
        while let DeclaredType::Optional(inner) = declared {
            own_optional = true;
            declared = inner.as_ref();
        }
        let optional = parent_optional || own_optional;

        let field_type = match declared {
            DeclaredType::String => FieldType::String,
            DeclaredType::Integer => FieldType::Integer,
            DeclaredType::Float => FieldType::Float,
            DeclaredType::Boolean => FieldType::Boolean,
            DeclaredType::Choice(choices) => FieldType::Choice(choices.clone()),
            DeclaredType::Nested(children) => {
                if own_optional {
                    groups.push(path.clone());
                }
                flatten(Some(&path), children, optional, out, groups, issues);
                continue;
            }
            DeclaredType::List(_) => {
                issues.push(SchemaIssue::Unrepresentable {
                    path,
                    shape: "list".to_string(),
                });
                continue;
            }
            DeclaredType::Map(_) => {
                issues.push(SchemaIssue::Unrepresentable {
                    path,
                    shape: "map".to_string(),
                });
                continue;
            }
            DeclaredType::Optional(_) => unreachable!("optional layers were unwrapped above"),
        };

        let mut default = decl.default.clone();
        if default.is_none() && field_type.is_boolean() && !optional {
            default = Some(Value::Bool(false));
        }
        let required = decl
            .cli_required
            .unwrap_or(default.is_none() && !optional);

        out.push(FieldSchema {
            name: path,
            field_type,
            default,
            required,
            optional,
            description: decl.description.clone(),
            example: decl.example.clone(),
        });
    }
}
