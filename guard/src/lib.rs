//! Guarded calls for quickscript.
//!
//! [`queryable`] and [`mutatable`] wrap a function taking an
//! [`ArgsModel`](quickscript_core::ArgsModel) so that every call validates
//! its input, checks declared [`Dependency`]s through an injected
//! [`EnvProvider`], optionally checks the returned value's shape label and
//! tags failures with the function's name and guard kind.
//!
//! ```
//! use quickscript_core::{ArgsModel, FieldDecl};
//! use quickscript_guard::{Dependency, MapEnv, mutatable};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Upload {
//!     path: String,
//! }
//!
//! impl ArgsModel for Upload {
//!     fn fields() -> Vec<FieldDecl> {
//!         vec![FieldDecl::string("path")]
//!     }
//! }
//!
//! let upload = mutatable("upload", |args: Upload| Ok::<_, std::io::Error>(args.path.len()))
//!     .depends_on(Dependency::env_var("BUCKET"))
//!     .with_env(MapEnv::new().with("BUCKET", "reports"));
//!
//! assert_eq!(upload.call(Upload { path: "a.csv".into() }).unwrap(), 5);
//! ```

mod collection;
mod dependency;
mod env;
mod error;
mod guard;
mod ledger;
mod shape;

pub use collection::{CollectedItem, Collection, ItemKind};
pub use dependency::{Dependency, UnmetDependency};
pub use env::{
    DISABLE_RUNTIME_CHECKS_VAR, EnvProvider, MapEnv, ProcessEnv, is_truthy,
    runtime_checks_disabled, runtime_checks_disabled_globally, set_runtime_checks_disabled,
};
pub use error::{DependencyError, GuardError, GuardKind, OutputShapeError, ValidationError};
pub use guard::{
    GuardMetadata, Guarded, mutatable, mutatable_async, queryable, queryable_async,
};
pub use ledger::CallLedger;
pub use shape::Shaped;
