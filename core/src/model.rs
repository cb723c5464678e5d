//! The schema provider seam.
//!
//! [`ArgsModel`] is the only thing the rest of quickscript knows about an
//! argument type: its declared fields, how to build it from a JSON object
//! (through serde) and an optional constraint hook. Any type that derives
//! `Serialize` and `Deserialize` can implement it by listing its fields.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::FieldViolation;

/// Declared type of a model field, before introspection.
///
/// Unlike [`FieldType`](crate::FieldType) this may describe shapes that have
/// no command-line form; the introspector flattens or rejects them.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclaredType {
    /// `String`.
    String,
    /// Any integer type.
    Integer,
    /// `f32` / `f64`.
    Float,
    /// `bool`.
    Boolean,
    /// Unit-only enum or string restricted to a set of values.
    Choice(Vec<String>),
    /// `Option<T>`.
    Optional(Box<DeclaredType>),
    /// A nested model, flattened with dotted paths.
    Nested(Vec<FieldDecl>),
    /// `Vec<T>` and friends. Rejected.
    List(Box<DeclaredType>),
    /// `HashMap<String, T>` and friends. Rejected.
    Map(Box<DeclaredType>),
}

/// Field declaration supplied by an [`ArgsModel`].
///
/// # Examples
///
/// ```
/// use quickscript_core::{DeclaredType, FieldDecl};
///
/// let field = FieldDecl::string("input_file")
///     .with_default("default.txt")
///     .with_description("File to read");
/// assert_eq!(field.declared, DeclaredType::String);
///
/// let port = FieldDecl::optional("port", DeclaredType::Integer);
/// assert!(matches!(port.declared, DeclaredType::Optional(_)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    /// Field name as serde sees it.
    pub name: String,
    /// Declared type.
    pub declared: DeclaredType,
    /// Default value, as the JSON serde would read.
    pub default: Option<Value>,
    /// Help text.
    pub description: Option<String>,
    /// Example value for usage output.
    pub example: Option<String>,
    /// Overrides the derived required-ness on the command line.
    pub cli_required: Option<bool>,
}

impl FieldDecl {
    /// Declares a field of any type.
    pub fn new(name: &str, declared: DeclaredType) -> Self {
        Self {
            name: name.to_string(),
            declared,
            default: None,
            description: None,
            example: None,
            cli_required: None,
        }
    }

    /// Declares a string field.
    pub fn string(name: &str) -> Self {
        Self::new(name, DeclaredType::String)
    }

    /// Declares an integer field.
    pub fn integer(name: &str) -> Self {
        Self::new(name, DeclaredType::Integer)
    }

    /// Declares a float field.
    pub fn float(name: &str) -> Self {
        Self::new(name, DeclaredType::Float)
    }

    /// Declares a boolean field.
    pub fn boolean(name: &str) -> Self {
        Self::new(name, DeclaredType::Boolean)
    }

    /// Declares a field restricted to `choices`.
    pub fn choice(name: &str, choices: &[&str]) -> Self {
        Self::new(
            name,
            DeclaredType::Choice(choices.iter().map(|c| c.to_string()).collect()),
        )
    }

    /// Declares an `Option<_>` field.
    pub fn optional(name: &str, inner: DeclaredType) -> Self {
        Self::new(name, DeclaredType::Optional(Box::new(inner)))
    }

    /// Declares a nested model field.
    pub fn nested(name: &str, fields: Vec<FieldDecl>) -> Self {
        Self::new(name, DeclaredType::Nested(fields))
    }

    /// Sets the default value.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
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

    /// Forces the field to be required (or not) on the command line.
    pub fn cli_required(mut self, required: bool) -> Self {
        self.cli_required = Some(required);
        self
    }
}

/// A schema-validated argument type.
///
/// Implementors list their fields in declaration order; construction goes
/// through serde, so field names must match the serialized names.
///
/// # Examples
///
/// ```
/// use quickscript_core::{ArgsModel, FieldDecl, FieldViolation};
/// use serde::{Deserialize, Serialize};
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
///
///     fn validate(&self) -> Vec<FieldViolation> {
///         if self.mode.is_empty() {
///             vec![FieldViolation::invalid("mode", "must not be empty")]
///         } else {
///             Vec::new()
///         }
///     }
/// }
///
/// assert_eq!(Args::model_name(), "Args");
/// ```
pub trait ArgsModel: Serialize + DeserializeOwned {
    /// Name used in schemas and error messages.
    fn model_name() -> &'static str {
        let full = std::any::type_name::<Self>();
        let base = full.split('<').next().unwrap_or(full);
        base.rsplit("::").next().unwrap_or(base)
    }

    /// Optional model description (about text of the generated parser).
    fn description() -> Option<&'static str> {
        None
    }

    /// Declared fields, in order.
    fn fields() -> Vec<FieldDecl>;

    /// Constraint checks run after construction. Empty means valid.
    fn validate(&self) -> Vec<FieldViolation> {
        Vec::new()
    }
}

/// Argument model with no fields, for functions that take no arguments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoArgs {}

impl ArgsModel for NoArgs {
    fn fields() -> Vec<FieldDecl> {
        Vec::new()
    }
}
