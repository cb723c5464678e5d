//! Guard wrappers.
//!
//! A [`Guarded`] holds a user function together with its [`GuardMetadata`],
//! built once when the guard is declared. Every call runs the same pipeline:
//!
//! 1. Input validation (`ArgsModel::validate`, or construction from a raw
//!    mapping for [`Guarded::call_raw`]).
//! 2. Dependency evaluation; every unmet item is reported at once.
//! 3. The wrapped function.
//! 4. Output shape check, query guards only.
//! 5. Ledger record on success; function errors are tagged with the guard's
//!    kind and name.
//!
//! Steps 1, 2 and 4 are the runtime checks. They can be switched off per
//! guard with [`Guarded::runtime_checks`], or for every guard with
//! [`DISABLE_RUNTIME_CHECKS_VAR`](crate::DISABLE_RUNTIME_CHECKS_VAR) (read at
//! construction) or [`set_runtime_checks_disabled`](crate::set_runtime_checks_disabled)
//! (read on every call).
//! Construction from a raw mapping always runs since the call needs a model.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use quickscript_core::{
    ArgsModel, ArgumentSchema, FieldViolation, RawArgs, SchemaError, construct, introspect,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    CallLedger, Dependency, DependencyError, EnvProvider, GuardError, GuardKind, OutputShapeError,
    ProcessEnv, Shaped, ValidationError, runtime_checks_disabled,
    runtime_checks_disabled_globally,
};

/// Everything declared about a guarded function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuardMetadata {
    /// Function name used in errors and the call ledger.
    pub name: String,
    /// Query or mutation.
    pub kind: GuardKind,
    /// Human readable summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Name of the declared input model.
    pub input_model: String,
    /// Declared output shape label (queries only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_shape: Option<String>,
    /// Dependencies, in declaration order.
    pub dependencies: Vec<Dependency>,
    /// Whether the wrapped function is asynchronous.
    pub suspendable: bool,
    /// Whether runtime checks run on each call.
    pub runtime_checks: bool,
}

/// A function wrapped by a query or mutation guard.
///
/// Built with [`queryable`], [`mutatable`] or their `_async` variants, then
/// configured with the builder methods before first use.
///
/// # Examples
///
/// ```
/// use quickscript_core::{ArgsModel, FieldDecl};
/// use quickscript_guard::{Dependency, GuardError, MapEnv, queryable};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Lookup {
///     user: String,
/// }
///
/// impl ArgsModel for Lookup {
///     fn fields() -> Vec<FieldDecl> {
///         vec![FieldDecl::string("user")]
///     }
/// }
///
/// let lookup = queryable("lookup", |args: Lookup| {
///     Ok::<_, std::io::Error>(format!("found {}", args.user))
/// })
/// .depends_on(Dependency::env_var("DIRECTORY_URL"))
/// .with_env(MapEnv::new());
///
/// let err = lookup.call(Lookup { user: "ada".into() }).unwrap_err();
/// assert!(matches!(err, GuardError::Dependency(_)));
/// ```
pub struct Guarded<F, A, R> {
    meta: GuardMetadata,
    schema: Result<ArgumentSchema, SchemaError>,
    env: Arc<dyn EnvProvider>,
    ledger: Option<CallLedger>,
    checks_requested: bool,
    shape_of: Option<fn(&R) -> String>,
    func: F,
    _marker: PhantomData<fn(A) -> R>,
}

impl<F, A: ArgsModel, R> Guarded<F, A, R> {
    fn new(kind: GuardKind, name: &str, suspendable: bool, func: F) -> Self {
        let mut guard = Self {
            meta: GuardMetadata {
                name: name.to_string(),
                kind,
                description: A::description().map(str::to_string),
                input_model: A::model_name().to_string(),
                output_shape: None,
                dependencies: Vec::new(),
                suspendable,
                runtime_checks: true,
            },
            schema: introspect::<A>(),
            env: Arc::new(ProcessEnv),
            ledger: None,
            checks_requested: true,
            shape_of: None,
            func,
            _marker: PhantomData,
        };
        guard.refresh_checks();
        guard
    }

    /// Replaces the description taken from the model.
    pub fn with_description(mut self, description: &str) -> Self {
        self.meta.description = Some(description.to_string());
        self
    }

    /// Adds a dependency.
    pub fn depends_on(mut self, dependency: Dependency) -> Self {
        self.meta.dependencies.push(dependency);
        self
    }

    /// Reads dependencies and the runtime-check switch from `env` instead of
    /// the process environment.
    pub fn with_env(self, env: impl EnvProvider + 'static) -> Self {
        self.with_shared_env(Arc::new(env))
    }

    /// Like [`with_env`](Self::with_env), for a provider shared between
    /// guards.
    pub fn with_shared_env(mut self, env: Arc<dyn EnvProvider>) -> Self {
        self.env = env;
        self.refresh_checks();
        self
    }

    /// Records successful calls in `ledger` and resolves prior-call
    /// dependencies against it.
    pub fn with_ledger(mut self, ledger: CallLedger) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Turns runtime checks on or off for this guard. The environment switch
    /// still wins when set.
    pub fn runtime_checks(mut self, enabled: bool) -> Self {
        self.checks_requested = enabled;
        self.refresh_checks();
        self
    }

    /// Declares the shape label the function must return.
    ///
    /// Only query guards check output; on a mutation the declaration is
    /// ignored.
    pub fn expect_shape(mut self, label: &str) -> Self
    where
        R: Shaped,
    {
        if self.meta.kind == GuardKind::Mutation {
            warn!(
                function = %self.meta.name,
                label,
                "output shape is not checked for mutations"
            );
            return self;
        }
        self.meta.output_shape = Some(label.to_string());
        self.shape_of = Some(|value: &R| value.shape_label());
        self
    }

    /// Metadata declared for this guard.
    pub fn metadata(&self) -> &GuardMetadata {
        &self.meta
    }

    /// Argument schema of the input model, if it has a command-line form.
    pub fn schema(&self) -> Option<&ArgumentSchema> {
        self.schema.as_ref().ok()
    }

    /// The attached ledger.
    pub fn ledger(&self) -> Option<&CallLedger> {
        self.ledger.as_ref()
    }

    /// Calls the wrapped function with a typed model.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Validation`] or [`GuardError::Dependency`]
    /// before the function runs, [`GuardError::OutputShape`] after it ran,
    /// and [`GuardError::Failed`] when the function itself fails.
    pub fn call<E>(&self, args: A) -> Result<R, GuardError<E>>
    where
        F: Fn(A) -> Result<R, E>,
    {
        self.check_input(&args)?;
        self.invoke(args)
    }

    /// Builds the model from a raw mapping, then calls like
    /// [`call`](Self::call).
    ///
    /// # Errors
    ///
    /// As [`call`](Self::call); construction failures are
    /// [`GuardError::Validation`] listing every field.
    pub fn call_raw<E>(&self, raw: &RawArgs) -> Result<R, GuardError<E>>
    where
        F: Fn(A) -> Result<R, E>,
    {
        let args = self.construct_args(raw)?;
        self.invoke(args)
    }

    /// Awaits the wrapped asynchronous function with a typed model.
    ///
    /// Suspends only where the function does.
    ///
    /// # Errors
    ///
    /// As [`call`](Self::call).
    pub async fn call_async<E, Fut>(&self, args: A) -> Result<R, GuardError<E>>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<R, E>>,
    {
        self.check_input(&args)?;
        self.invoke_async(args).await
    }

    /// Builds the model from a raw mapping, then calls like
    /// [`call_async`](Self::call_async).
    ///
    /// # Errors
    ///
    /// As [`call_raw`](Self::call_raw).
    pub async fn call_raw_async<E, Fut>(&self, raw: &RawArgs) -> Result<R, GuardError<E>>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<R, E>>,
    {
        let args = self.construct_args(raw)?;
        self.invoke_async(args).await
    }

    fn invoke<E>(&self, args: A) -> Result<R, GuardError<E>>
    where
        F: Fn(A) -> Result<R, E>,
    {
        self.check_dependencies()?;
        let output = (self.func)(args).map_err(|source| self.failed(source))?;
        self.finish(output)
    }

    async fn invoke_async<E, Fut>(&self, args: A) -> Result<R, GuardError<E>>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<R, E>>,
    {
        self.check_dependencies()?;
        let output = (self.func)(args)
            .await
            .map_err(|source| self.failed(source))?;
        self.finish(output)
    }

    fn finish<E>(&self, output: R) -> Result<R, GuardError<E>> {
        self.check_output(&output)?;
        if let Some(ledger) = &self.ledger {
            ledger.record(&self.meta.name);
        }
        debug!(function = %self.meta.name, kind = %self.meta.kind, "guarded call succeeded");
        Ok(output)
    }

    fn check_input(&self, args: &A) -> Result<(), ValidationError> {
        if !self.checks_active() {
            return Ok(());
        }
        let violations = args.validate();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(self.invalid(violations))
        }
    }

    fn construct_args(&self, raw: &RawArgs) -> Result<A, ValidationError> {
        let schema = self
            .schema
            .as_ref()
            .map_err(|err| self.invalid(vec![FieldViolation::invalid("", err.to_string())]))?;
        let args = construct::<A>(schema, raw).map_err(|violations| self.invalid(violations))?;
        Ok(args)
    }

    fn check_dependencies(&self) -> Result<(), DependencyError> {
        if !self.checks_active() {
            return Ok(());
        }
        let unmet: Vec<_> = self
            .meta
            .dependencies
            .iter()
            .filter_map(|dep| dep.check(self.env.as_ref(), self.ledger.as_ref()).err())
            .collect();
        if unmet.is_empty() {
            return Ok(());
        }
        debug!(
            function = %self.meta.name,
            unmet = unmet.len(),
            "dependency check failed"
        );
        Err(DependencyError {
            function: self.meta.name.clone(),
            unmet,
        })
    }

    fn check_output(&self, output: &R) -> Result<(), OutputShapeError> {
        if !self.checks_active() || self.meta.kind != GuardKind::Query {
            return Ok(());
        }
        let (Some(expected), Some(shape_of)) = (&self.meta.output_shape, self.shape_of) else {
            return Ok(());
        };
        let actual = shape_of(output);
        if &actual == expected {
            Ok(())
        } else {
            Err(OutputShapeError {
                function: self.meta.name.clone(),
                expected: expected.clone(),
                actual,
            })
        }
    }

    fn invalid(&self, violations: Vec<FieldViolation>) -> ValidationError {
        debug!(
            function = %self.meta.name,
            violations = violations.len(),
            "input validation failed"
        );
        ValidationError {
            function: self.meta.name.clone(),
            violations,
        }
    }

    fn failed<E>(&self, source: E) -> GuardError<E> {
        GuardError::Failed {
            kind: self.meta.kind,
            function: self.meta.name.clone(),
            source,
        }
    }

    fn checks_active(&self) -> bool {
        self.meta.runtime_checks && !runtime_checks_disabled_globally()
    }

    fn refresh_checks(&mut self) {
        self.meta.runtime_checks =
            self.checks_requested && !runtime_checks_disabled(self.env.as_ref());
    }
}

impl<F, A, R> std::fmt::Debug for Guarded<F, A, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Guarded")
            .field("meta", &self.meta)
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

/// Wraps a read-only function.
pub fn queryable<A, R, E, F>(name: &str, func: F) -> Guarded<F, A, R>
where
    A: ArgsModel,
    F: Fn(A) -> Result<R, E>,
{
    Guarded::new(GuardKind::Query, name, false, func)
}

/// Wraps a side-effecting function.
pub fn mutatable<A, R, E, F>(name: &str, func: F) -> Guarded<F, A, R>
where
    A: ArgsModel,
    F: Fn(A) -> Result<R, E>,
{
    Guarded::new(GuardKind::Mutation, name, false, func)
}

/// Wraps a read-only asynchronous function.
pub fn queryable_async<A, R, E, F, Fut>(name: &str, func: F) -> Guarded<F, A, R>
where
    A: ArgsModel,
    F: Fn(A) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    Guarded::new(GuardKind::Query, name, true, func)
}

/// Wraps a side-effecting asynchronous function.
pub fn mutatable_async<A, R, E, F, Fut>(name: &str, func: F) -> Guarded<F, A, R>
where
    A: ArgsModel,
    F: Fn(A) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    Guarded::new(GuardKind::Mutation, name, true, func)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use quickscript_core::{FieldDecl, ViolationKind};
    use serde::Deserialize;
    use serde_json::json;
    use thiserror::Error;

    use super::*;
    use crate::{DISABLE_RUNTIME_CHECKS_VAR, MapEnv};

    #[derive(Debug, Error, PartialEq)]
    #[error("backend unavailable")]
    struct Unavailable;

    #[derive(Debug, Serialize, Deserialize)]
    struct Fetch {
        table: String,
        limit: i64,
    }

    impl ArgsModel for Fetch {
        fn description() -> Option<&'static str> {
            Some("Fetch rows from a table")
        }

        fn fields() -> Vec<FieldDecl> {
            vec![
                FieldDecl::string("table"),
                FieldDecl::integer("limit").with_default(10),
            ]
        }

        fn validate(&self) -> Vec<FieldViolation> {
            if self.limit < 0 {
                vec![FieldViolation::invalid("limit", "must not be negative")]
            } else {
                Vec::new()
            }
        }
    }

    fn fetch(table: &str, limit: i64) -> Fetch {
        Fetch {
            table: table.to_string(),
            limit,
        }
    }

    #[test]
    fn test_metadata_is_built_once_from_declarations() {
        let guard = queryable("fetch_rows", |_: Fetch| Ok::<_, Unavailable>(Vec::<i64>::new()))
            .depends_on(Dependency::env_var("DB_URL"))
            .expect_shape("list")
            .with_env(MapEnv::new());

        let meta = guard.metadata();
        assert_eq!(meta.name, "fetch_rows");
        assert_eq!(meta.kind, GuardKind::Query);
        assert_eq!(meta.description.as_deref(), Some("Fetch rows from a table"));
        assert_eq!(meta.input_model, "Fetch");
        assert_eq!(meta.output_shape.as_deref(), Some("list"));
        assert_eq!(meta.dependencies, vec![Dependency::env_var("DB_URL")]);
        assert!(!meta.suspendable);
        assert!(meta.runtime_checks);
        assert!(guard.schema().is_some());
    }

    #[test]
    fn test_unmet_dependency_never_runs_body() {
        let calls = Cell::new(0);
        let guard = mutatable("drop_table", |_: Fetch| {
            calls.set(calls.get() + 1);
            Ok::<_, Unavailable>(())
        })
        .depends_on(Dependency::env_var("DB_URL"))
        .depends_on(Dependency::env_var("DB_PASSWORD"))
        .with_env(MapEnv::new().with("DB_URL", "postgres://localhost"));

        let err = guard.call(fetch("users", 1)).unwrap_err();

        assert_eq!(calls.get(), 0);
        let GuardError::Dependency(err) = err else {
            panic!("expected a dependency error");
        };
        assert_eq!(err.function, "drop_table");
        assert_eq!(err.unmet.len(), 1);
        assert_eq!(err.unmet[0].dependency, "env var `DB_PASSWORD`");
    }

    #[test]
    fn test_all_unmet_dependencies_are_listed() {
        let guard = mutatable("sync", |_: Fetch| Ok::<_, Unavailable>(()))
            .depends_on(Dependency::env_var("A"))
            .depends_on(Dependency::env_var("B"))
            .depends_on(Dependency::program("rsync"))
            .with_env(MapEnv::new());

        let Err(GuardError::Dependency(err)) = guard.call(fetch("t", 1)) else {
            panic!("expected a dependency error");
        };
        assert_eq!(err.unmet.len(), 3);
    }

    #[test]
    fn test_environment_is_reread_on_every_call() {
        let env = Arc::new(std::sync::RwLock::new(MapEnv::new()));

        struct Shared(Arc<std::sync::RwLock<MapEnv>>);
        impl EnvProvider for Shared {
            fn var(&self, name: &str) -> Option<String> {
                self.0.read().ok()?.var(name)
            }
        }

        let guard = queryable("ping", |_: Fetch| Ok::<_, Unavailable>(1))
            .depends_on(Dependency::env_var("TOKEN"))
            .with_env(Shared(Arc::clone(&env)));

        assert!(guard.call(fetch("t", 1)).is_err());
        env.write().unwrap().set("TOKEN", "abc");
        assert_eq!(guard.call(fetch("t", 1)).unwrap(), 1);
    }

    #[test]
    fn test_shape_mismatch_after_side_effects() {
        let side_effects = Cell::new(0);
        let guard = queryable("load", |_: Fetch| {
            side_effects.set(side_effects.get() + 1);
            Ok::<_, Unavailable>(json!({"rows": []}))
        })
        .expect_shape("list")
        .with_env(MapEnv::new());

        let err = guard.call(fetch("users", 5)).unwrap_err();

        assert_eq!(side_effects.get(), 1);
        let GuardError::OutputShape(err) = err else {
            panic!("expected an output shape error");
        };
        assert_eq!(err.expected, "list");
        assert_eq!(err.actual, "mapping");
    }

    #[test]
    fn test_matching_shape_passes() {
        let guard = queryable("load", |args: Fetch| {
            Ok::<_, Unavailable>(json!(vec![args.limit; 2]))
        })
        .expect_shape("list")
        .with_env(MapEnv::new());

        assert_eq!(guard.call(fetch("users", 5)).unwrap(), json!([5, 5]));
    }

    #[test]
    fn test_mutation_ignores_shape_declaration() {
        let guard = mutatable("write", |_: Fetch| Ok::<_, Unavailable>(String::new()))
            .expect_shape("list")
            .with_env(MapEnv::new());

        assert_eq!(guard.metadata().output_shape, None);
        assert!(guard.call(fetch("users", 5)).is_ok());
    }

    #[test]
    fn test_invalid_input_is_rejected_before_call() {
        let calls = Cell::new(0);
        let guard = queryable("fetch", |_: Fetch| {
            calls.set(calls.get() + 1);
            Ok::<_, Unavailable>(())
        })
        .with_env(MapEnv::new());

        let err = guard.call(fetch("users", -1)).unwrap_err();

        assert_eq!(calls.get(), 0);
        let GuardError::Validation(err) = err else {
            panic!("expected a validation error");
        };
        assert_eq!(err.violations[0].path, "limit");
    }

    #[test]
    fn test_call_raw_constructs_and_reports_every_field() {
        let guard = queryable("fetch", |args: Fetch| Ok::<_, Unavailable>(args.limit))
            .with_env(MapEnv::new());

        let mut raw = RawArgs::new();
        raw.insert("table".into(), json!("users"));
        assert_eq!(guard.call_raw(&raw).unwrap(), 10);

        let mut raw = RawArgs::new();
        raw.insert("limit".into(), json!("lots"));
        raw.insert("colour".into(), json!("red"));
        let Err(GuardError::Validation(err)) = guard.call_raw(&raw) else {
            panic!("expected a validation error");
        };
        let kinds: Vec<_> = err.violations.iter().map(|v| v.kind).collect();
        assert_eq!(err.violations.len(), 3);
        assert!(kinds.contains(&ViolationKind::Unknown));
        assert!(kinds.contains(&ViolationKind::Missing));
        assert!(kinds.contains(&ViolationKind::Invalid));
    }

    #[test]
    fn test_function_error_is_tagged() {
        let guard = mutatable("save", |_: Fetch| Err::<(), _>(Unavailable)).with_env(MapEnv::new());

        match guard.call(fetch("users", 1)).unwrap_err() {
            GuardError::Failed {
                kind,
                function,
                source,
            } => {
                assert_eq!(kind, GuardKind::Mutation);
                assert_eq!(function, "save");
                assert_eq!(source, Unavailable);
            }
            other => panic!("expected a tagged failure, got {other}"),
        }
    }

    #[test]
    fn test_environment_switch_disables_runtime_checks() {
        let calls = Cell::new(0);
        let guard = queryable("fetch", |_: Fetch| {
            calls.set(calls.get() + 1);
            Ok::<_, Unavailable>(String::new())
        })
        .depends_on(Dependency::env_var("DB_URL"))
        .expect_shape("list")
        .with_env(MapEnv::new().with(DISABLE_RUNTIME_CHECKS_VAR, "1"));

        assert!(!guard.metadata().runtime_checks);
        assert!(guard.call(fetch("users", -1)).is_ok());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_per_guard_switch() {
        let guard = queryable("fetch", |_: Fetch| Ok::<_, Unavailable>(()))
            .depends_on(Dependency::env_var("DB_URL"))
            .with_env(MapEnv::new())
            .runtime_checks(false);

        assert!(guard.call(fetch("users", 1)).is_ok());
    }

    #[test]
    fn test_prior_call_dependency_uses_shared_ledger() {
        let ledger = CallLedger::new();
        let load = queryable("load", |_: Fetch| Ok::<_, Unavailable>(()))
            .with_env(MapEnv::new())
            .with_ledger(ledger.clone());
        let publish = mutatable("publish", |_: Fetch| Ok::<_, Unavailable>(()))
            .depends_on(Dependency::prior_call("load"))
            .with_env(MapEnv::new())
            .with_ledger(ledger.clone());

        assert!(matches!(
            publish.call(fetch("t", 1)),
            Err(GuardError::Dependency(_))
        ));
        load.call(fetch("t", 1)).unwrap();
        publish.call(fetch("t", 1)).unwrap();
        assert_eq!(ledger.calls(), vec!["load", "publish"]);
    }

    #[test]
    fn test_failed_call_is_not_recorded() {
        let ledger = CallLedger::new();
        let guard = mutatable("save", |_: Fetch| Err::<(), _>(Unavailable))
            .with_env(MapEnv::new())
            .with_ledger(ledger.clone());

        assert!(guard.call(fetch("t", 1)).is_err());
        assert!(!ledger.has_succeeded("save"));
    }

    #[tokio::test]
    async fn test_async_guard_runs_pipeline() {
        let guard = queryable_async("fetch_remote", |args: Fetch| async move {
            tokio::task::yield_now().await;
            Ok::<_, Unavailable>(vec![args.table; args.limit as usize])
        })
        .expect_shape("list")
        .with_env(MapEnv::new());

        assert!(guard.metadata().suspendable);
        let rows = guard.call_async(fetch("users", 2)).await.unwrap();
        assert_eq!(rows, vec!["users", "users"]);
    }

    #[tokio::test]
    async fn test_async_guard_unmet_dependency_never_awaits_body() {
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let guard = mutatable_async("push", move |_: Fetch| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                Ok::<_, Unavailable>(())
            }
        })
        .depends_on(Dependency::env_var("REMOTE"))
        .with_env(MapEnv::new());

        let err = guard.call_async(fetch("t", 1)).await.unwrap_err();
        assert!(err.is_rejection());
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);

        let mut raw = RawArgs::new();
        raw.insert("table".into(), json!("t"));
        assert!(guard.call_raw_async(&raw).await.is_err());
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }
}
