use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use quickscript::{
    EXIT_FAILURE, EXIT_SUCCESS, EXIT_USAGE, ItemKind, ProcessEnv, Settings, TracingLogger,
    logging,
};

mod demo;

use demo::Demo;

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliKind {
    Query,
    Mutation,
    Script,
}

impl From<CliKind> for ItemKind {
    fn from(kind: CliKind) -> Self {
        match kind {
            CliKind::Query => Self::Query,
            CliKind::Mutation => Self::Mutation,
            CliKind::Script => Self::Script,
        }
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum ListFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum SchemaFormat {
    Json,
    Yaml,
}

#[derive(Debug, Parser)]
#[command(name = "quickscript", version)]
#[command(about = "List, describe and run guarded functions and scripts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the entries of the bundled collection.
    List(ListArgs),
    /// Print the argument schema of an entry.
    Schema(SchemaArgs),
    /// Run an entry with its synthesized command line.
    Run(RunArgs),
}

#[derive(Debug, Args)]
struct ListArgs {
    /// Only list entries of this kind.
    #[arg(long)]
    kind: Option<CliKind>,
    /// Output format.
    #[arg(long, default_value = "text")]
    format: ListFormat,
}

#[derive(Debug, Args)]
struct SchemaArgs {
    /// Entry name.
    name: String,
    /// Output format.
    #[arg(long, default_value = "json")]
    format: SchemaFormat,
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Entry name.
    name: String,
    /// Arguments for the entry, e.g. `--name Ada --age 36`.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    let settings = match Settings::from_env(&ProcessEnv) {
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

    let demo = Demo::new();
    let result = match cli.command {
        Command::List(args) => run_list(&demo, args),
        Command::Schema(args) => run_schema(&demo, args),
        Command::Run(args) => run_entry(&demo, args),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(EXIT_FAILURE);
        }
    }
}

fn run_list(demo: &Demo, args: ListArgs) -> anyhow::Result<i32> {
    let collection = match args.kind {
        Some(kind) => demo.collection().filter(kind.into()),
        None => demo.collection().clone(),
    };

    match args.format {
        ListFormat::Text => print!("{}", collection.render()),
        ListFormat::Json => println!("{}", serde_json::to_string_pretty(&collection)?),
    }
    Ok(EXIT_SUCCESS)
}

fn run_schema(demo: &Demo, args: SchemaArgs) -> anyhow::Result<i32> {
    let Some(entry) = demo.find(&args.name) else {
        return Ok(unknown_entry(&args.name));
    };
    let schema = match entry.schema() {
        Ok(schema) => schema,
        Err(err) => {
            eprintln!("error: {err}");
            return Ok(EXIT_USAGE);
        }
    };

    match args.format {
        SchemaFormat::Json => println!("{}", serde_json::to_string_pretty(&schema)?),
        SchemaFormat::Yaml => print!("{}", serde_yaml::to_string(&schema)?),
    }
    Ok(EXIT_SUCCESS)
}

fn run_entry(demo: &Demo, args: RunArgs) -> anyhow::Result<i32> {
    let Some(entry) = demo.find(&args.name) else {
        return Ok(unknown_entry(&args.name));
    };
    let logger = Arc::new(TracingLogger::new(entry.name()));
    let outcome = entry.run_with(args.args, logger);
    Ok(outcome.exit_code)
}

fn unknown_entry(name: &str) -> i32 {
    eprintln!("error: no entry named `{name}` (see `quickscript list`)");
    EXIT_USAGE
}
