//! Argument validation, dependency declarations and logging scaffolding for
//! single-file scripts.
//!
//! A script declares its arguments as a serde struct implementing
//! [`ArgsModel`] and hands its `main` to [`script`]:
//!
//! ```no_run
//! use quickscript::{ArgsModel, FieldDecl, Logger, script};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Args {
//!     input_file: String,
//!     mode: String,
//! }
//!
//! impl ArgsModel for Args {
//!     fn fields() -> Vec<FieldDecl> {
//!         vec![
//!             FieldDecl::string("input_file").with_default("default.txt"),
//!             FieldDecl::string("mode").with_description("Processing mode"),
//!         ]
//!     }
//! }
//!
//! fn main() {
//!     script("process", |args: Args, logger: &dyn Logger| {
//!         logger.info(&format!("reading {}", args.input_file));
//!         Ok(())
//!     })
//!     .run()
//! }
//! ```
//!
//! The command line (`--input_file`, `--mode`, `--help`) is synthesized from
//! the model. Bad arguments exit with [`EXIT_USAGE`], a failing `main` with
//! [`EXIT_FAILURE`].
//!
//! Functions inside a script can be wrapped with [`queryable`] and
//! [`mutatable`] guards, re-exported here with the rest of the schema and
//! parser API.

mod config;
mod logger;
pub mod logging;
mod script;

pub use config::{CONFIG_VAR, ConfigError, LOG_FORMAT_VAR, LOG_VAR, LogFormat, Settings};
pub use logger::{Logger, MemoryLogger, TracingLogger};
pub use script::{
    BlockingMain, EXIT_FAILURE, EXIT_SUCCESS, EXIT_USAGE, Entrypoint, Runnable, Script,
    ScriptError, ScriptOutcome, ScriptState, SuspendableMain, script, script_async,
};

pub use quickscript_core::{
    ArgsModel, ArgumentSchema, DeclaredType, FieldDecl, FieldSchema, FieldType, FieldViolation,
    NoArgs, RawArgs, SchemaError, SchemaIssue, ViolationKind, construct, introspect,
};
pub use quickscript_guard::{
    CallLedger, CollectedItem, Collection, Dependency, DependencyError, EnvProvider, GuardError,
    GuardKind, GuardMetadata, Guarded, ItemKind, MapEnv, OutputShapeError, ProcessEnv, Shaped,
    UnmetDependency, ValidationError, mutatable, mutatable_async, queryable, queryable_async,
    set_runtime_checks_disabled,
};
pub use quickscript_synth::{ArgumentError, ArgumentIssue, Parsed, Synthesizer, render_usage};
