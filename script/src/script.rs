//! Script entrypoints.
//!
//! [`script`] wraps a `main(args, logger)` function. Running it derives the
//! argument schema, parses the argument vector, checks script-level
//! dependencies, calls `main` and maps the result to an exit code:
//!
//! | outcome                            | exit code        |
//! |------------------------------------|------------------|
//! | success, or `--help`               | [`EXIT_SUCCESS`] |
//! | `main` returned an error, panicked | [`EXIT_FAILURE`] |
//! | bad arguments, schema or deps      | [`EXIT_USAGE`]   |

use std::any::Any;
use std::future::Future;
use std::marker::PhantomData;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, anyhow, bail};
use quickscript_core::{ArgsModel, ArgumentSchema, SchemaError, introspect};
use quickscript_guard::{
    CollectedItem, Dependency, EnvProvider, ItemKind, ProcessEnv, UnmetDependency,
};
use quickscript_synth::{ArgumentError, Parsed, Synthesizer};
use thiserror::Error;
use tracing::debug;

use crate::{Logger, Settings, TracingLogger, logging};

/// Clean return or help.
pub const EXIT_SUCCESS: i32 = 0;
/// `main` failed.
pub const EXIT_FAILURE: i32 = 1;
/// The script could not start: bad arguments, schema, settings or
/// dependencies.
pub const EXIT_USAGE: i32 = 2;

/// Lifecycle of one script run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptState {
    /// Not run yet.
    NotStarted,
    /// Turning the argument vector into a model.
    ParsingArgs,
    /// Help was requested and printed. Terminal.
    HelpShown,
    /// The script could not start. Terminal.
    ArgsInvalid,
    /// Arguments parsed and dependencies met.
    ArgsValid,
    /// `main` is executing.
    Running,
    /// `main` returned an error or panicked. Terminal.
    Failed,
    /// `main` returned cleanly. Terminal.
    Succeeded,
}

impl ScriptState {
    /// Exit code of a terminal state.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ScriptState::HelpShown | ScriptState::Succeeded => Some(EXIT_SUCCESS),
            ScriptState::ArgsInvalid => Some(EXIT_USAGE),
            ScriptState::Failed => Some(EXIT_FAILURE),
            _ => None,
        }
    }

    /// Returns `true` for states a run ends in.
    pub fn is_terminal(&self) -> bool {
        self.exit_code().is_some()
    }
}

/// What ended a script run unsuccessfully.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The argument model has no command-line form.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The argument vector did not match the schema.
    #[error(transparent)]
    Arguments(#[from] ArgumentError),

    /// Script-level dependencies are unmet.
    #[error("unmet dependencies for script `{script}`:\n{}", render_unmet(.unmet))]
    Dependencies {
        /// Script name.
        script: String,
        /// Every unmet dependency.
        unmet: Vec<UnmetDependency>,
    },

    /// `main` returned an error or panicked.
    #[error("script `{script}` failed: {source}")]
    Failed {
        /// Script name.
        script: String,
        /// The error `main` returned.
        #[source]
        source: anyhow::Error,
    },
}

fn render_unmet(unmet: &[UnmetDependency]) -> String {
    unmet
        .iter()
        .map(|item| format!("  {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl ScriptError {
    /// Exit code this error maps to.
    pub fn exit_code(&self) -> i32 {
        match self {
            ScriptError::Failed { .. } => EXIT_FAILURE,
            _ => EXIT_USAGE,
        }
    }
}

/// Result of [`Script::run_with`].
#[derive(Debug)]
pub struct ScriptOutcome {
    /// Terminal state reached.
    pub state: ScriptState,
    /// Process exit code for `state`.
    pub exit_code: i32,
    /// Why the run did not succeed.
    pub error: Option<ScriptError>,
    /// Wall time from start to terminal state.
    pub elapsed: Duration,
}

impl ScriptOutcome {
    /// Returns `true` if the run exits 0.
    pub fn is_success(&self) -> bool {
        self.exit_code == EXIT_SUCCESS
    }
}

/// How a script body is invoked.
pub trait Entrypoint<A> {
    /// Runs the body to completion.
    ///
    /// # Errors
    ///
    /// Returns whatever the body returns.
    fn invoke(&self, args: A, logger: Arc<dyn Logger>) -> anyhow::Result<()>;
}

/// Synchronous `main(args, &logger)`.
pub struct BlockingMain<M>(M);

impl<A, M> Entrypoint<A> for BlockingMain<M>
where
    M: Fn(A, &dyn Logger) -> anyhow::Result<()>,
{
    fn invoke(&self, args: A, logger: Arc<dyn Logger>) -> anyhow::Result<()> {
        (self.0)(args, logger.as_ref())
    }
}

/// Asynchronous `main(args, logger)`, driven on a current-thread runtime.
///
/// The runtime is created per run, so a suspendable script cannot be run
/// from inside another tokio runtime; doing so fails the run with an error
/// saying so.
pub struct SuspendableMain<M>(M);

impl<A, M, Fut> Entrypoint<A> for SuspendableMain<M>
where
    M: Fn(A, Arc<dyn Logger>) -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    fn invoke(&self, args: A, logger: Arc<dyn Logger>) -> anyhow::Result<()> {
        if tokio::runtime::Handle::try_current().is_ok() {
            bail!(
                "suspendable scripts start their own runtime and cannot run inside an existing \
                 tokio runtime; call `run_with` from blocking code"
            );
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to start the async runtime")?;
        runtime.block_on((self.0)(args, logger))
    }
}

/// A script entrypoint: a `main` function bound to an argument model.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use quickscript::{ArgsModel, FieldDecl, Logger, MemoryLogger, script};
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
///             FieldDecl::string("mode"),
///         ]
///     }
/// }
///
/// let job = script("job", |args: Args, logger: &dyn Logger| {
///     logger.info(&format!("processing {} in {} mode", args.input_file, args.mode));
///     Ok(())
/// });
///
/// let logger = Arc::new(MemoryLogger::new());
/// assert_eq!(job.run_with(["--mode", "fast"], logger.clone()).exit_code, 0);
/// assert_eq!(job.run_with(Vec::<String>::new(), logger).exit_code, 2);
/// ```
pub struct Script<A, E> {
    name: String,
    description: Option<String>,
    dependencies: Vec<Dependency>,
    env: Arc<dyn EnvProvider>,
    entry: E,
    _marker: PhantomData<fn(A)>,
}

/// Wraps a synchronous script body.
pub fn script<A, M>(name: &str, main: M) -> Script<A, BlockingMain<M>>
where
    A: ArgsModel,
    M: Fn(A, &dyn Logger) -> anyhow::Result<()>,
{
    Script::new(name, BlockingMain(main))
}

/// Wraps an asynchronous script body.
pub fn script_async<A, M, Fut>(name: &str, main: M) -> Script<A, SuspendableMain<M>>
where
    A: ArgsModel,
    M: Fn(A, Arc<dyn Logger>) -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    Script::new(name, SuspendableMain(main))
}

impl<A: ArgsModel, E: Entrypoint<A>> Script<A, E> {
    fn new(name: &str, entry: E) -> Self {
        Self {
            name: name.to_string(),
            description: A::description().map(str::to_string),
            dependencies: Vec::new(),
            env: Arc::new(ProcessEnv),
            entry,
            _marker: PhantomData,
        }
    }

    /// Replaces the description taken from the model.
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Adds a dependency checked after the arguments parse.
    pub fn depends_on(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Reads dependencies and settings from `env`.
    pub fn with_env(mut self, env: impl EnvProvider + 'static) -> Self {
        self.env = Arc::new(env);
        self
    }

    /// Script name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Argument schema of the script's model.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if the model has no command-line form.
    pub fn schema(&self) -> Result<ArgumentSchema, SchemaError> {
        introspect::<A>()
    }

    /// Collection entry for this script.
    pub fn item(&self) -> CollectedItem {
        CollectedItem {
            name: self.name.clone(),
            kind: ItemKind::Script,
            description: self.description.clone(),
            input_model: A::model_name().to_string(),
        }
    }

    /// Runs against the process arguments with settings from the
    /// environment, then exits the process.
    pub fn run(&self) -> ! {
        let settings = match Settings::from_env(self.env.as_ref()) {
            Ok(settings) => settings,
            Err(err) => {
                eprintln!("error: {err}");
                std::process::exit(EXIT_USAGE);
            }
        };
        if let Err(err) = logging::init(&settings) {
            eprintln!("error: {err}");
            std::process::exit(EXIT_USAGE);
        }
        settings.apply_runtime_checks();

        let logger = Arc::new(TracingLogger::new(&self.name));
        let outcome = self.run_with(std::env::args().skip(1), logger);
        std::process::exit(outcome.exit_code)
    }

    /// Runs against `argv` (without the program name).
    ///
    /// Usage is printed to stdout and argument problems to stderr; failures
    /// of `main` go to `logger` as a single error entry.
    pub fn run_with<I, T>(&self, argv: I, logger: Arc<dyn Logger>) -> ScriptOutcome
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let started = Instant::now();
        let mut state = ScriptState::NotStarted;
        self.advance(&mut state, ScriptState::ParsingArgs);

        let args = match self.parse(argv) {
            Ok(Parsed::Args(args)) => args,
            Ok(Parsed::Help(usage)) => {
                print!("{usage}");
                self.advance(&mut state, ScriptState::HelpShown);
                return self.outcome(state, None, started);
            }
            Err(err) => {
                eprintln!("{err}");
                self.advance(&mut state, ScriptState::ArgsInvalid);
                return self.outcome(state, Some(err), started);
            }
        };
        self.advance(&mut state, ScriptState::ArgsValid);

        self.advance(&mut state, ScriptState::Running);
        let result = catch_unwind(AssertUnwindSafe(|| {
            self.entry.invoke(args, Arc::clone(&logger))
        }))
        .unwrap_or_else(|payload| Err(anyhow!("panicked: {}", panic_message(payload.as_ref()))));

        match result {
            Ok(()) => {
                self.advance(&mut state, ScriptState::Succeeded);
                logger.info(&format!("finished in {:.3}s", started.elapsed().as_secs_f64()));
                self.outcome(state, None, started)
            }
            Err(err) => {
                logger.error(&format!("{err:?}"));
                self.advance(&mut state, ScriptState::Failed);
                let err = ScriptError::Failed {
                    script: self.name.clone(),
                    source: err,
                };
                self.outcome(state, Some(err), started)
            }
        }
    }

    fn parse<I, T>(&self, argv: I) -> Result<Parsed<A>, ScriptError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let synth = Synthesizer::for_model::<A>(&self.name)?;
        let parsed = synth.parse::<A, _, _>(argv)?;
        if let Parsed::Args(_) = parsed {
            self.check_dependencies()?;
        }
        Ok(parsed)
    }

    fn check_dependencies(&self) -> Result<(), ScriptError> {
        let unmet: Vec<_> = self
            .dependencies
            .iter()
            .filter_map(|dep| dep.check(self.env.as_ref(), None).err())
            .collect();
        if unmet.is_empty() {
            Ok(())
        } else {
            Err(ScriptError::Dependencies {
                script: self.name.clone(),
                unmet,
            })
        }
    }

    fn advance(&self, state: &mut ScriptState, next: ScriptState) {
        debug!(script = %self.name, from = ?state, to = ?next, "script state");
        *state = next;
    }

    fn outcome(
        &self,
        state: ScriptState,
        error: Option<ScriptError>,
        started: Instant,
    ) -> ScriptOutcome {
        ScriptOutcome {
            state,
            exit_code: state.exit_code().unwrap_or(EXIT_FAILURE),
            error,
            elapsed: started.elapsed(),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Object-safe view of a [`Script`], for registries of scripts with
/// different argument models.
pub trait Runnable {
    /// Script name.
    fn name(&self) -> &str;
    /// Collection entry.
    fn item(&self) -> CollectedItem;
    /// Argument schema.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if the model has no command-line form.
    fn schema(&self) -> Result<ArgumentSchema, SchemaError>;
    /// Runs against `argv`; see [`Script::run_with`].
    fn run_with(&self, argv: Vec<String>, logger: Arc<dyn Logger>) -> ScriptOutcome;
}

impl<A: ArgsModel, E: Entrypoint<A>> Runnable for Script<A, E> {
    fn name(&self) -> &str {
        Script::name(self)
    }

    fn item(&self) -> CollectedItem {
        Script::item(self)
    }

    fn schema(&self) -> Result<ArgumentSchema, SchemaError> {
        Script::schema(self)
    }

    fn run_with(&self, argv: Vec<String>, logger: Arc<dyn Logger>) -> ScriptOutcome {
        Script::run_with(self, argv, logger)
    }
}
