//! Argument schema definitions.
//!
//! An [`ArgumentSchema`] is the command-line view of an argument model: an
//! ordered list of [`FieldSchema`] values, one per flag. Schemas are derived
//! by the introspector, never built by hand in normal use, and they serialize
//! with [`serde`] so they can be printed as JSON or YAML.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Version of the serialized argument schema contract (semver).
pub const SCHEMA_CONTRACT_VERSION: &str = "1.0.0";

/// Command-line representable value type of a field.
///
/// Every field of an argument model must map onto one of these primitives.
/// Composite shapes (lists, maps) are rejected by the introspector and
/// nested models are flattened.
///
/// # Examples
///
/// ```
/// use quickscript_core::FieldType;
///
/// let mode = FieldType::Choice(vec!["fast".into(), "safe".into()]);
/// assert_eq!(mode.name(), "choice");
/// assert_eq!(FieldType::Integer.placeholder(), "<INT>");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    /// Free-form string.
    String,
    /// Signed 64-bit integer.
    Integer,
    /// Finite floating point number.
    Float,
    /// Boolean switch (`--name` / `--no-name`).
    Boolean,
    /// One of a finite set of strings.
    Choice(Vec<String>),
}

impl FieldType {
    /// Short lowercase name used in usage listings and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Boolean => "boolean",
            FieldType::Choice(_) => "choice",
        }
    }

    /// Value placeholder shown after the flag in usage output.
    pub fn placeholder(&self) -> &'static str {
        match self {
            FieldType::String => "<STRING>",
            FieldType::Integer => "<INT>",
            FieldType::Float => "<FLOAT>",
            FieldType::Boolean => "",
            FieldType::Choice(_) => "<CHOICE>",
        }
    }

    /// Returns `true` for [`FieldType::Boolean`].
    pub fn is_boolean(&self) -> bool {
        matches!(self, FieldType::Boolean)
    }
}

/// One flag of an argument schema.
///
/// # Examples
///
/// ```
/// use quickscript_core::{FieldSchema, FieldType};
///
/// let field = FieldSchema::new("input_file", FieldType::String)
///     .with_default("default.txt")
///     .with_description("File to read");
/// assert_eq!(field.flag(), "--input_file");
/// assert!(!field.required);
///
/// let verbose = FieldSchema::new("verbose", FieldType::Boolean);
/// assert_eq!(verbose.negation_flag().as_deref(), Some("--no-verbose"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    /// Field path; nested fields use dotted paths (`db.host`).
    pub name: String,
    /// Primitive type of the value.
    pub field_type: FieldType,
    /// Default applied when the flag is omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Whether the flag must be supplied.
    pub required: bool,
    /// Whether the field may be absent entirely (maps to `null`).
    #[serde(default)]
    pub optional: bool,
    /// Help text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Example value shown in usage output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
}

impl FieldSchema {
    /// Creates a required field with no default.
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            default: None,
            required: true,
            optional: false,
            description: None,
            example: None,
        }
    }

    /// Sets a default value, which also makes the field not required.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self.required = false;
        self
    }

    /// Adds help text.
    pub fn with_description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    /// Adds an example value.
    pub fn with_example(mut self, example: &str) -> Self {
        self.example = Some(example.to_string());
        self
    }

    /// The long flag for this field (`--name`).
    pub fn flag(&self) -> String {
        format!("--{}", self.name)
    }

    /// The negation flag of a boolean field (`--no-name`).
    pub fn negation_flag(&self) -> Option<String> {
        self.field_type
            .is_boolean()
            .then(|| format!("--no-{}", self.name))
    }

    /// Human readable default, if any.
    pub fn default_display(&self) -> Option<String> {
        self.default.as_ref().map(|value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// Derived command-line schema of an argument model.
///
/// # Examples
///
/// ```
/// use quickscript_core::{ArgumentSchema, FieldSchema, FieldType};
///
/// let mut schema = ArgumentSchema::new("Args");
/// schema.fields.push(FieldSchema::new("mode", FieldType::String));
/// schema.fields.push(FieldSchema::new("input_file", FieldType::String).with_default("default.txt"));
///
/// assert_eq!(schema.field_names(), vec!["mode", "input_file"]);
/// assert_eq!(schema.required_fields().count(), 1);
/// assert!(schema.find("mode").is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArgumentSchema {
    /// Schema contract version (populated from [`SCHEMA_CONTRACT_VERSION`]).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    /// Name of the model the schema was derived from.
    pub model: String,
    /// Model description, used as the parser's about text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Fields in declaration order.
    pub fields: Vec<FieldSchema>,
    /// Paths of optional nested models (`proxy` for `proxy.url`). A group
    /// with none of its fields supplied is constructed as `null`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub optional_groups: Vec<String>,
}

impl ArgumentSchema {
    /// Creates an empty schema for `model`.
    pub fn new(model: &str) -> Self {
        Self {
            schema_version: Some(SCHEMA_CONTRACT_VERSION.to_string()),
            model: model.to_string(),
            description: None,
            fields: Vec::new(),
            optional_groups: Vec::new(),
        }
    }

    /// Finds a field by its (dotted) name.
    pub fn find(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// All field names in declaration order.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Fields that must be supplied on the command line.
    pub fn required_fields(&self) -> impl Iterator<Item = &FieldSchema> {
        self.fields.iter().filter(|f| f.required)
    }

    /// The outermost optional group containing `path`, if any.
    pub fn optional_group_of(&self, path: &str) -> Option<&str> {
        self.optional_groups
            .iter()
            .map(String::as_str)
            .filter(|group| {
                path.strip_prefix(group)
                    .is_some_and(|rest| rest.starts_with('.'))
            })
            .min_by_key(|group| group.len())
    }

    /// SHA-256 hex digest of the schema's JSON form.
    ///
    /// Two derivations of the same model always produce the same
    /// fingerprint.
    pub fn fingerprint(&self) -> String {
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        let hash = Sha256::digest(&bytes);
        format!("{:x}", hash)
    }
}
