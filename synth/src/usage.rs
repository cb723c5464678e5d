//! Usage listing rendered from an argument schema.

use quickscript_core::{ArgumentSchema, FieldSchema, FieldType};

/// Renders the `--help` text for `program`.
///
/// Every line comes from the schema: flag, value placeholder, help text,
/// choices, default or "required", and example.
///
/// # Examples
///
/// ```
/// use quickscript_core::{ArgumentSchema, FieldSchema, FieldType};
/// use quickscript_synth::render_usage;
///
/// let mut schema = ArgumentSchema::new("Args");
/// schema.fields.push(FieldSchema::new("mode", FieldType::String).with_description("Run mode"));
///
/// let usage = render_usage("job", &schema);
/// assert!(usage.starts_with("Usage: job [OPTIONS] --mode <STRING>"));
/// assert!(usage.contains("Run mode [required]"));
/// ```
pub fn render_usage(program: &str, schema: &ArgumentSchema) -> String {
    let mut out = String::new();

    let mut synopsis = format!("Usage: {program} [OPTIONS]");
    for field in schema.required_fields() {
        synopsis.push(' ');
        synopsis.push_str(&flag_column(field));
    }
    out.push_str(&synopsis);
    out.push('\n');

    if let Some(description) = &schema.description {
        out.push('\n');
        out.push_str(description);
        out.push('\n');
    }

    let mut rows: Vec<(String, String)> = schema
        .fields
        .iter()
        .map(|field| (flag_column(field), help_column(field)))
        .collect();
    rows.push(("-h, --help".to_string(), "Print help".to_string()));

    let width = rows.iter().map(|(left, _)| left.len()).max().unwrap_or(0);

    out.push_str("\nOptions:\n");
    for (left, right) in rows {
        if right.is_empty() {
            out.push_str(&format!("  {left}\n"));
        } else {
            out.push_str(&format!("  {left:<width$}  {right}\n"));
        }
    }

    out
}

fn flag_column(field: &FieldSchema) -> String {
    match field.negation_flag() {
        Some(negation) => format!("{} / {negation}", field.flag()),
        None => format!("{} {}", field.flag(), field.field_type.placeholder()),
    }
}

fn help_column(field: &FieldSchema) -> String {
    let mut parts = Vec::new();
    if let Some(description) = &field.description {
        parts.push(description.clone());
    }
    if let FieldType::Choice(choices) = &field.field_type {
        parts.push(format!("[possible values: {}]", choices.join(", ")));
    }
    if field.required {
        parts.push("[required]".to_string());
    } else if let Some(default) = field.default_display() {
        parts.push(format!("[default: {default}]"));
    } else if field.optional {
        parts.push("[optional]".to_string());
    }
    if let Some(example) = &field.example {
        parts.push(format!("[example: {example}]"));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_lists_every_field() {
        let mut schema = ArgumentSchema::new("Args");
        schema.description = Some("Copy files around".to_string());
        schema.fields.push(
            FieldSchema::new("input_file", FieldType::String)
                .with_default("default.txt")
                .with_description("File to read"),
        );
        schema.fields.push(
            FieldSchema::new("mode", FieldType::Choice(vec!["fast".into(), "safe".into()]))
                .with_example("fast"),
        );
        schema
            .fields
            .push(FieldSchema::new("verbose", FieldType::Boolean).with_default(false));

        let usage = render_usage("copy", &schema);

        assert!(usage.starts_with("Usage: copy [OPTIONS] --mode <CHOICE>\n"));
        assert!(usage.contains("Copy files around"));
        assert!(usage.contains("--input_file <STRING>"));
        assert!(usage.contains("File to read [default: default.txt]"));
        assert!(usage.contains("[possible values: fast, safe] [required] [example: fast]"));
        assert!(usage.contains("--verbose / --no-verbose"));
        assert!(usage.contains("[default: false]"));
        assert!(usage.contains("-h, --help"));
    }

    #[test]
    fn test_usage_for_empty_schema() {
        let schema = ArgumentSchema::new("NoArgs");
        let usage = render_usage("hello", &schema);

        assert!(usage.starts_with("Usage: hello [OPTIONS]\n"));
        assert!(usage.contains("-h, --help"));
    }
}
