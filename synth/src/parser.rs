//! Schema-driven argument parser.
//!
//! [`Synthesizer`] owns an [`ArgumentSchema`] and the `clap` command generated
//! from it. Parsing happens in three passes:
//!
//! 1. A pre-scan sifts the vector: unknown flags (with the value they
//!    consumed), stray values, value flags with no value and switches given
//!    a value are recorded and dropped.
//! 2. `clap` tokenizes what is left. It enforces no required-ness; values
//!    are kept as raw strings.
//! 3. The raw mapping goes to [`construct`], which coerces values, applies
//!    defaults and reports every missing or invalid field.
//!
//! Issues from all three passes end up in one [`ArgumentError`].

use std::collections::HashSet;

use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{Arg, ArgAction, ArgMatches, Command};
use quickscript_core::{
    ArgsModel, ArgumentSchema, RawArgs, ViolationKind, construct, introspect,
};
use serde_json::Value;
use tracing::debug;

use crate::{ArgumentError, ArgumentIssue, SynthError, render_usage};

const HELP_ID: &str = "help";

/// Outcome of a successful parse.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed<T> {
    /// Arguments matched the schema.
    Args(T),
    /// `-h`/`--help` was requested; carries the usage listing.
    Help(String),
}

/// A command-line parser synthesized from an argument schema.
///
/// # Examples
///
/// ```
/// use quickscript_core::{ArgsModel, FieldDecl};
/// use quickscript_synth::{Parsed, Synthesizer};
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
/// }
///
/// let synth = Synthesizer::for_model::<Args>("job").unwrap();
///
/// let Parsed::Args(args) = synth.parse::<Args, _, _>(["--mode", "fast"]).unwrap() else {
///     panic!("expected arguments");
/// };
/// assert_eq!(args.input_file, "default.txt");
/// assert_eq!(args.mode, "fast");
///
/// let err = synth.parse::<Args, _, &str>([]).unwrap_err();
/// assert_eq!(err.missing_fields(), vec!["mode"]);
/// ```
#[derive(Debug, Clone)]
pub struct Synthesizer {
    program: String,
    schema: ArgumentSchema,
    command: Command,
    value_flags: HashSet<String>,
    switch_flags: HashSet<String>,
}

impl Synthesizer {
    /// Builds a parser for an already derived schema.
    pub fn new(program: &str, schema: ArgumentSchema) -> Self {
        let mut command = Command::new(program.to_string())
            .no_binary_name(true)
            .disable_help_flag(true)
            .disable_version_flag(true)
            .args_override_self(true)
            .arg(
                Arg::new(HELP_ID)
                    .short('h')
                    .long(HELP_ID)
                    .action(ArgAction::SetTrue),
            );
        if let Some(description) = &schema.description {
            command = command.about(description.clone());
        }

        let mut value_flags = HashSet::new();
        let mut switch_flags = HashSet::from([HELP_ID.to_string()]);

        for field in &schema.fields {
            if field.field_type.is_boolean() {
                let negation = format!("no-{}", field.name);
                command = command
                    .arg(
                        Arg::new(field.name.clone())
                            .long(field.name.clone())
                            .action(ArgAction::SetTrue)
                            .overrides_with(negation.clone()),
                    )
                    .arg(
                        Arg::new(negation.clone())
                            .long(negation.clone())
                            .action(ArgAction::SetTrue)
                            .overrides_with(field.name.clone()),
                    );
                switch_flags.insert(field.name.clone());
                switch_flags.insert(negation);
            } else {
                command = command.arg(
                    Arg::new(field.name.clone())
                        .long(field.name.clone())
                        .value_name(field.field_type.placeholder())
                        .action(ArgAction::Set)
                        .num_args(1)
                        .allow_hyphen_values(true),
                );
                value_flags.insert(field.name.clone());
            }
        }

        Self {
            program: program.to_string(),
            schema,
            command,
            value_flags,
            switch_flags,
        }
    }

    /// Derives `A`'s schema and builds a parser for it.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`](quickscript_core::SchemaError) if `A` cannot be
    /// represented on the command line.
    pub fn for_model<A: ArgsModel>(program: &str) -> Result<Self, quickscript_core::SchemaError> {
        Ok(Self::new(program, introspect::<A>()?))
    }

    /// The schema this parser was built from.
    pub fn schema(&self) -> &ArgumentSchema {
        &self.schema
    }

    /// Program name used in usage and errors.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The usage listing printed for `--help`.
    pub fn usage(&self) -> String {
        render_usage(&self.program, &self.schema)
    }

    /// Parses `tokens` (without the program name) into `A`.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError`] listing unknown flags, malformed tokens and
    /// every missing or invalid field.
    pub fn parse<A, I, T>(&self, tokens: I) -> Result<Parsed<A>, ArgumentError>
    where
        A: ArgsModel,
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let scan = self.scan(tokens)?;
        if scan.help && scan.issues.is_empty() {
            return Ok(Parsed::Help(self.usage()));
        }

        let mut issues = scan.issues;
        match construct::<A>(&self.schema, &scan.raw) {
            Ok(args) if issues.is_empty() => Ok(Parsed::Args(args)),
            Ok(_) => Err(self.error(issues)),
            Err(violations) => {
                // A flag already reported as malformed is not also "required".
                let malformed: HashSet<String> = issues
                    .iter()
                    .filter_map(|issue| match issue {
                        ArgumentIssue::Malformed { flag, .. } => {
                            flag.strip_prefix("--").map(str::to_string)
                        }
                        _ => None,
                    })
                    .collect();
                issues.extend(
                    violations
                        .into_iter()
                        .filter(|v| {
                            v.kind != ViolationKind::Missing || !malformed.contains(&v.path)
                        })
                        .map(ArgumentIssue::Field),
                );
                Err(self.error(issues))
            }
        }
    }

    /// Tokenizes `tokens` into a flat mapping of raw string and boolean
    /// values, without coercion or required-field checks.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentError`] for unknown flags and malformed tokens.
    pub fn parse_raw<I, T>(&self, tokens: I) -> Result<Parsed<RawArgs>, ArgumentError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let scan = self.scan(tokens)?;
        if !scan.issues.is_empty() {
            return Err(self.error(scan.issues));
        }
        if scan.help {
            return Ok(Parsed::Help(self.usage()));
        }
        Ok(Parsed::Args(scan.raw))
    }

    fn scan<I, T>(&self, tokens: I) -> Result<Scan, ArgumentError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let tokens: Vec<String> = tokens.into_iter().map(Into::into).collect();
        debug!(
            program = %self.program,
            tokens = tokens.len(),
            fields = self.schema.fields.len(),
            "parsing arguments"
        );

        let (kept, mut issues) = self.sift(tokens);

        let matches = match self.command.clone().try_get_matches_from(&kept) {
            Ok(matches) => matches,
            Err(err) => {
                issues.push(issue_from_clap(&err));
                return Err(self.error(issues));
            }
        };

        Ok(Scan {
            help: matches.get_flag(HELP_ID),
            raw: self.collect_values(&matches),
            issues,
        })
    }

    fn collect_values(&self, matches: &ArgMatches) -> RawArgs {
        let mut raw = RawArgs::new();
        for field in &self.schema.fields {
            if field.field_type.is_boolean() {
                let negation = format!("no-{}", field.name);
                if matches.get_flag(&field.name) {
                    raw.insert(field.name.clone(), Value::Bool(true));
                } else if matches.get_flag(&negation) {
                    raw.insert(field.name.clone(), Value::Bool(false));
                }
            } else if let Some(value) = matches.get_one::<String>(&field.name) {
                raw.insert(field.name.clone(), Value::String(value.clone()));
            }
        }
        raw
    }

    /// Walks the tokens the way the parser will. Returns the tokens `clap`
    /// can accept and an issue for every one it would reject.
    fn sift(&self, tokens: Vec<String>) -> (Vec<String>, Vec<ArgumentIssue>) {
        let mut kept = Vec::with_capacity(tokens.len());
        let mut issues = Vec::new();
        let mut iter = tokens.into_iter().peekable();

        while let Some(token) = iter.next() {
            if token == "--" {
                issues.extend(iter.by_ref().map(ArgumentIssue::UnexpectedValue));
                break;
            }

            if let Some(long) = token.strip_prefix("--") {
                let (name, inline_value) = match long.split_once('=') {
                    Some((name, _)) => (name.to_string(), true),
                    None => (long.to_string(), false),
                };
                if self.value_flags.contains(&name) {
                    if inline_value {
                        kept.push(token);
                    } else if let Some(value) = iter.next_if(|next| !self.is_known_flag(next)) {
                        kept.push(token);
                        kept.push(value);
                    } else {
                        issues.push(ArgumentIssue::Malformed {
                            flag: format!("--{name}"),
                            message: "a value is required but none was supplied".to_string(),
                        });
                    }
                } else if self.switch_flags.contains(&name) {
                    if inline_value {
                        issues.push(ArgumentIssue::Malformed {
                            flag: format!("--{name}"),
                            message: "this flag takes no value".to_string(),
                        });
                    } else {
                        kept.push(token);
                    }
                } else {
                    issues.push(ArgumentIssue::UnknownFlag(format!("--{name}")));
                    if !inline_value {
                        iter.next_if(|next| !next.starts_with('-') || is_number(next));
                    }
                }
            } else if token == "-h" {
                kept.push(token);
            } else if token.starts_with('-') && token.len() > 1 {
                issues.push(ArgumentIssue::UnknownFlag(token));
            } else {
                issues.push(ArgumentIssue::UnexpectedValue(token));
            }
        }

        (kept, issues)
    }

    fn is_known_flag(&self, token: &str) -> bool {
        if token == "-h" {
            return true;
        }
        token.strip_prefix("--").is_some_and(|long| {
            let name = long.split_once('=').map_or(long, |(name, _)| name);
            self.value_flags.contains(name) || self.switch_flags.contains(name)
        })
    }

    fn error(&self, issues: Vec<ArgumentIssue>) -> ArgumentError {
        ArgumentError {
            program: self.program.clone(),
            issues,
        }
    }
}

struct Scan {
    help: bool,
    raw: RawArgs,
    issues: Vec<ArgumentIssue>,
}

fn is_number(token: &str) -> bool {
    token.parse::<f64>().is_ok()
}

fn issue_from_clap(err: &clap::Error) -> ArgumentIssue {
    let offending = match err.get(ContextKind::InvalidArg) {
        Some(ContextValue::String(arg)) => arg.clone(),
        _ => String::new(),
    };

    match err.kind() {
        ErrorKind::UnknownArgument if offending.starts_with('-') => {
            ArgumentIssue::UnknownFlag(offending)
        }
        ErrorKind::UnknownArgument => ArgumentIssue::UnexpectedValue(offending),
        ErrorKind::InvalidValue | ErrorKind::NoEquals | ErrorKind::WrongNumberOfValues => {
            ArgumentIssue::Malformed {
                flag: offending,
                message: "a value is required but none was supplied".to_string(),
            }
        }
        ErrorKind::TooManyValues => ArgumentIssue::Malformed {
            flag: offending,
            message: "this flag takes no value".to_string(),
        },
        _ => {
            let rendered = err.render().to_string();
            let first = rendered
                .lines()
                .next()
                .unwrap_or_default()
                .trim_start_matches("error: ")
                .to_string();
            ArgumentIssue::Malformed {
                flag: offending,
                message: first,
            }
        }
    }
}

/// Derives `A`'s schema and parses `tokens` in one step.
///
/// # Errors
///
/// Returns [`SynthError::Schema`] if `A` has no command-line form and
/// [`SynthError::Argument`] if the tokens do not match.
pub fn parse_args<A, I, T>(program: &str, tokens: I) -> Result<Parsed<A>, SynthError>
where
    A: ArgsModel,
    I: IntoIterator<Item = T>,
    T: Into<String>,
{
    let synth = Synthesizer::for_model::<A>(program)?;
    Ok(synth.parse(tokens)?)
}
