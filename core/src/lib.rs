//! Argument schemas and the schema-provider seam for quickscript.
//!
//! This crate holds everything the rest of the workspace needs to know about
//! argument models:
//!
//! - [`ArgsModel`]: the trait an argument type implements (declared fields,
//!   serde construction and an optional constraint hook).
//! - [`introspect`]: derives an [`ArgumentSchema`] (ordered
//!   [`FieldSchema`]s) from a model, flattening nested models into dotted
//!   paths and rejecting shapes with no command-line form.
//! - [`construct`]: builds a model from a flat key/value mapping, coercing
//!   values and collecting every [`FieldViolation`].
//! - [`validate_schema`]: structural checks run on every derived schema.
//!
//! # Example
//!
//! ```
//! use quickscript_core::*;
//! use serde::{Deserialize, Serialize};
//! use serde_json::json;
//!
//! #[derive(Debug, Serialize, Deserialize)]
//! struct Args {
//!     input_file: String,
//!     mode: String,
//! }
//!
//! impl ArgsModel for Args {
//!     fn fields() -> Vec<FieldDecl> {
//!         vec![
//!             FieldDecl::string("input_file").with_default("default.txt"),
//!             FieldDecl::string("mode"),
//!         ]
//!     }
//! }
//!
//! let schema = introspect::<Args>().unwrap();
//! assert_eq!(schema.required_fields().count(), 1);
//!
//! let mut raw = RawArgs::new();
//! raw.insert("mode".into(), json!("fast"));
//! let args: Args = construct(&schema, &raw).unwrap();
//! assert_eq!(args.input_file, "default.txt");
//! ```

mod construct;
mod error;
mod introspect;
mod model;
mod types;
mod validate;

pub use construct::{RawArgs, coerce_value, construct, unflatten};
pub use error::{FieldViolation, SchemaError, SchemaIssue, ViolationKind};
pub use introspect::{introspect, introspect_fields};
pub use model::{ArgsModel, DeclaredType, FieldDecl, NoArgs};
pub use types::*;
pub use validate::{RESERVED_NAMES, validate_schema};
