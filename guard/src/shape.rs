//! Output shape labels.
//!
//! A shape label is a short string naming what kind of value a function
//! returned, such as `frame:polars` or `list`. Query guards compare the label
//! of the returned value with the declared one. Only the label is compared;
//! the value's contents are never inspected.

use serde_json::Value;

/// A value that can name its own shape.
///
/// # Examples
///
/// ```
/// use quickscript_guard::Shaped;
///
/// struct Frame {
///     rows: Vec<Vec<String>>,
/// }
///
/// impl Shaped for Frame {
///     fn shape_label(&self) -> String {
///         "frame:rows".to_string()
///     }
/// }
///
/// let frame = Frame { rows: Vec::new() };
/// assert_eq!(frame.shape_label(), "frame:rows");
/// assert_eq!((frame, "meta").shape_label(), "frame:rows");
/// ```
pub trait Shaped {
    /// Label of this value's kind.
    fn shape_label(&self) -> String;
}

impl Shaped for String {
    fn shape_label(&self) -> String {
        "string".to_string()
    }
}

impl<T> Shaped for Vec<T> {
    fn shape_label(&self) -> String {
        "list".to_string()
    }
}

impl<T: Shaped> Shaped for Option<T> {
    fn shape_label(&self) -> String {
        match self {
            Some(value) => value.shape_label(),
            None => "none".to_string(),
        }
    }
}

impl Shaped for Value {
    fn shape_label(&self) -> String {
        match self {
            Value::Null => "none",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "list",
            Value::Object(_) => "mapping",
        }
        .to_string()
    }
}

/// A `(value, metadata)` pair has the shape of its value.
impl<T: Shaped, M> Shaped for (T, M) {
    fn shape_label(&self) -> String {
        self.0.shape_label()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_json_labels() {
        assert_eq!(json!([1, 2]).shape_label(), "list");
        assert_eq!(json!({"a": 1}).shape_label(), "mapping");
        assert_eq!(Value::Null.shape_label(), "none");
    }

    #[test]
    fn test_option_and_pair_delegate() {
        let rows: Option<Vec<i64>> = Some(vec![1]);
        assert_eq!(rows.shape_label(), "list");
        assert_eq!(None::<String>.shape_label(), "none");
        assert_eq!((String::new(), 3).shape_label(), "string");
    }
}
