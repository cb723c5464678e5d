//! Model construction from key/value mappings.
//!
//! This is the validation layer both the CLI synthesizer and the guards hand
//! their raw values to. Each value is coerced to its field's [`FieldType`],
//! defaults are applied, dotted paths are folded back into nested objects
//! and the result goes through serde and then [`ArgsModel::validate`].
//!
//! Every problem is collected before reporting; construction never stops at
//! the first bad field.

use serde_json::{Map, Number, Value};

use crate::{ArgsModel, ArgumentSchema, FieldType, FieldViolation};

/// Flat key/value mapping keyed by dotted field path.
pub type RawArgs = Map<String, Value>;

/// Coerces `value` to `field_type`.
///
/// Strings are accepted for every type so command-line tokens can be passed
/// through unchanged.
///
/// # Examples
///
/// ```
/// use quickscript_core::{FieldType, coerce_value};
/// use serde_json::json;
///
/// assert_eq!(coerce_value(&FieldType::Integer, &json!("42")).unwrap(), json!(42));
/// assert_eq!(coerce_value(&FieldType::Boolean, &json!("yes")).unwrap(), json!(true));
/// assert!(coerce_value(&FieldType::Float, &json!("fast")).is_err());
/// ```
pub fn coerce_value(field_type: &FieldType, value: &Value) -> Result<Value, String> {
    match (field_type, value) {
        (FieldType::String, Value::String(_)) => Ok(value.clone()),
        (FieldType::String, other) => Err(format!("expected a string, got {other}")),

        (FieldType::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(value.clone()),
        (FieldType::Integer, Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| format!("expected an integer, got `{s}`")),
        (FieldType::Integer, other) => Err(format!("expected an integer, got {other}")),

        (FieldType::Float, Value::Number(_)) => Ok(value.clone()),
        (FieldType::Float, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| format!("expected a number, got `{s}`")),
        (FieldType::Float, other) => Err(format!("expected a number, got {other}")),

        (FieldType::Boolean, Value::Bool(_)) => Ok(value.clone()),
        (FieldType::Boolean, Value::String(s)) => parse_bool(s)
            .map(Value::Bool)
            .ok_or_else(|| format!("expected a boolean, got `{s}`")),
        (FieldType::Boolean, other) => Err(format!("expected a boolean, got {other}")),

        (FieldType::Choice(choices), Value::String(s)) => {
            if choices.iter().any(|c| c == s) {
                Ok(value.clone())
            } else {
                Err(format!(
                    "expected one of {}, got `{s}`",
                    choices.join(", ")
                ))
            }
        }
        (FieldType::Choice(choices), other) => Err(format!(
            "expected one of {}, got {other}",
            choices.join(", ")
        )),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Builds `A` from a flat mapping checked against `schema`.
///
/// Unknown keys, missing required fields and coercion failures are reported
/// together. A required field is reported missing even when it declares a
/// default. An optional nested group with none of its fields supplied is
/// built as `null`. Serde errors and [`ArgsModel::validate`] violations follow once
/// every field coerced cleanly.
///
/// # Examples
///
/// ```
/// use quickscript_core::{ArgsModel, FieldDecl, RawArgs, construct, introspect};
/// use serde::{Deserialize, Serialize};
/// use serde_json::json;
///
/// #[derive(Debug, Serialize, Deserialize)]
/// struct Args {
///     input_file: String,
///     mode: String,
/// }
///
/// impl ArgsModel for Args {
///     fn fields() -> Vec<FieldDecl> {
///         vec![
///             FieldDecl::string("input_file").with_default("default.txt"),
///             FieldDecl::string("mode"),
///         ]
///     }
/// }
///
/// let schema = introspect::<Args>().unwrap();
/// let mut raw = RawArgs::new();
/// raw.insert("mode".into(), json!("fast"));
///
/// let args: Args = construct(&schema, &raw).unwrap();
/// assert_eq!(args.input_file, "default.txt");
/// assert_eq!(args.mode, "fast");
///
/// let errors = construct::<Args>(&schema, &RawArgs::new()).unwrap_err();
/// assert_eq!(errors[0].path, "mode");
/// ```
pub fn construct<A: ArgsModel>(
    schema: &ArgumentSchema,
    raw: &RawArgs,
) -> Result<A, Vec<FieldViolation>> {
    let mut violations = Vec::new();

    for key in raw.keys() {
        if schema.find(key).is_none() {
            violations.push(FieldViolation::unknown(key));
        }
    }

    let absent_groups: Vec<&str> = schema
        .optional_groups
        .iter()
        .map(String::as_str)
        .filter(|group| {
            !raw
                .iter()
                .any(|(key, value)| !value.is_null() && within(key, group))
        })
        .collect();

    let mut flat = RawArgs::new();
    for group in &absent_groups {
        if !absent_groups.iter().any(|outer| within(group, outer)) {
            flat.insert(group.to_string(), Value::Null);
        }
    }

    for field in &schema.fields {
        if absent_groups.iter().any(|group| within(&field.name, group)) {
            continue;
        }
        match raw.get(&field.name) {
            None | Some(Value::Null) => {
                if field.required {
                    violations.push(FieldViolation::missing(&field.name));
                } else if let Some(default) = &field.default {
                    flat.insert(field.name.clone(), default.clone());
                } else if field.optional && schema.optional_group_of(&field.name).is_none() {
                    flat.insert(field.name.clone(), Value::Null);
                }
            }
            Some(value) => match coerce_value(&field.field_type, value) {
                Ok(coerced) => {
                    flat.insert(field.name.clone(), coerced);
                }
                Err(message) => violations.push(FieldViolation::invalid(&field.name, message)),
            },
        }
    }

    if !violations.is_empty() {
        return Err(violations);
    }

    let model: A = serde_path_to_error::deserialize(unflatten(flat))
        .map_err(|err| vec![violation_from_serde(&err)])?;

    let constraints = model.validate();
    if constraints.is_empty() {
        Ok(model)
    } else {
        Err(constraints)
    }
}

/// Folds dotted keys into nested objects (`db.host` → `{"db": {"host": …}}`).
pub fn unflatten(flat: RawArgs) -> Value {
    let mut root = Map::new();
    for (path, value) in flat {
        let mut segments: Vec<&str> = path.split('.').collect();
        let Some(leaf) = segments.pop() else {
            continue;
        };
        let mut node = &mut root;
        for segment in segments {
            let entry = node
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            node = match entry {
                Value::Object(map) => map,
                _ => unreachable!("entry was just made an object"),
            };
        }
        node.insert(leaf.to_string(), value);
    }
    Value::Object(root)
}

fn within(path: &str, group: &str) -> bool {
    path.strip_prefix(group)
        .is_some_and(|rest| rest.starts_with('.'))
}

fn violation_from_serde(err: &serde_path_to_error::Error<serde_json::Error>) -> FieldViolation {
    let path = match err.path().to_string() {
        root if root == "." => String::new(),
        path => path,
    };
    let message = err.inner().to_string();

    let missing = message
        .strip_prefix("missing field `")
        .and_then(|rest| rest.split('`').next());
    match missing {
        Some(field) if path.is_empty() => FieldViolation::missing(field),
        Some(field) => FieldViolation::missing(&format!("{path}.{field}")),
        None => FieldViolation::invalid(&path, message),
    }
}
