//! The bundled demo collection.
//!
//! Four guarded greeting functions (two queries, two mutations) and one
//! plain script. Guarded functions are exposed through a script wrapper so
//! `quickscript run` treats every entry the same way.

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use quickscript::{
    ArgsModel, CollectedItem, Collection, FieldDecl, FieldViolation, GuardKind, Guarded, Logger,
    NoArgs, Runnable, Shaped, mutatable_async, queryable_async, script, script_async,
};
use serde::{Deserialize, Serialize};

/// Response of every greeting function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleResponse {
    pub message: String,
}

impl Shaped for SimpleResponse {
    fn shape_label(&self) -> String {
        "SimpleResponse".to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoreComplexArgs {
    pub name: String,
    pub age: i64,
}

impl ArgsModel for MoreComplexArgs {
    fn description() -> Option<&'static str> {
        Some("Greet someone by name and age.")
    }

    fn fields() -> Vec<FieldDecl> {
        vec![
            FieldDecl::string("name")
                .with_description("The name of the person to greet.")
                .with_example("Ada"),
            FieldDecl::integer("age").with_description("The age of the person to greet."),
        ]
    }

    fn validate(&self) -> Vec<FieldViolation> {
        if self.age < 0 {
            vec![FieldViolation::invalid("age", "must not be negative")]
        } else {
            Vec::new()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessArgs {
    pub input_file: String,
    pub mode: String,
}

impl ArgsModel for ProcessArgs {
    fn description() -> Option<&'static str> {
        Some("Count the lines of a file.")
    }

    fn fields() -> Vec<FieldDecl> {
        vec![
            FieldDecl::string("input_file")
                .with_default("default.txt")
                .with_description("File to read."),
            FieldDecl::string("mode")
                .with_description("Processing mode.")
                .with_example("fast"),
        ]
    }
}

async fn hello_world(_: NoArgs) -> Result<SimpleResponse, Infallible> {
    Ok(SimpleResponse {
        message: "Hello, world!".to_string(),
    })
}

async fn more_complex(args: MoreComplexArgs) -> Result<SimpleResponse, Infallible> {
    Ok(SimpleResponse {
        message: format!("Hello, {}! You are {} years old.", args.name, args.age),
    })
}

fn process(args: ProcessArgs, logger: &dyn Logger) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&args.input_file)
        .with_context(|| format!("failed to read {}", args.input_file))?;
    let lines = text.lines().count();
    logger.info(&format!("read {lines} lines in {} mode", args.mode));
    println!("{lines} lines read from {}", args.input_file);
    Ok(())
}

#[derive(Serialize)]
struct CallReport<'a> {
    function: &'a str,
    kind: GuardKind,
    elapsed_ms: f64,
    result: &'a SimpleResponse,
}

/// Every demo entry, as metadata and as something runnable.
pub struct Demo {
    collection: Collection,
    runners: Vec<Box<dyn Runnable>>,
}

impl Demo {
    /// Builds the demo entries.
    pub fn new() -> Self {
        let mut demo = Self {
            collection: Collection::new("demo"),
            runners: Vec::new(),
        };

        demo.add_guard(
            queryable_async("hello_world", hello_world)
                .with_description("Say hello to the world.")
                .expect_shape("SimpleResponse"),
        );
        demo.add_guard(
            queryable_async("more_complex", more_complex)
                .expect_shape("SimpleResponse"),
        );
        demo.add_guard(
            mutatable_async("mutate_no_args", hello_world)
                .with_description("Say hello, with side effects."),
        );
        demo.add_guard(
            mutatable_async("mutate_with_args", more_complex)
                .with_description("Greet someone, with side effects."),
        );

        let line_count = script("process", process);
        demo.collection.add(line_count.item());
        demo.runners.push(Box::new(line_count));

        demo
    }

    fn add_guard<A, F, Fut>(&mut self, guard: Guarded<F, A, SimpleResponse>)
    where
        A: ArgsModel + 'static,
        F: Fn(A) -> Fut + 'static,
        Fut: Future<Output = Result<SimpleResponse, Infallible>> + 'static,
    {
        let item = CollectedItem::from(guard.metadata());
        let guard = Arc::new(guard);

        let runner = script_async(&item.name, move |args: A, logger: Arc<dyn Logger>| {
            let guard = Arc::clone(&guard);
            async move {
                let started = Instant::now();
                let response = guard.call_async(args).await?;
                let meta = guard.metadata();
                let report = CallReport {
                    function: &meta.name,
                    kind: meta.kind,
                    elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
                    result: &response,
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
                logger.info(&format!("{} `{}` returned", meta.kind, meta.name));
                Ok::<(), anyhow::Error>(())
            }
        });

        self.collection.add(item);
        self.runners.push(Box::new(runner));
    }

    /// Metadata of every entry.
    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    /// The entry called `name`.
    pub fn find(&self, name: &str) -> Option<&dyn Runnable> {
        self.runners
            .iter()
            .find(|runner| runner.name() == name)
            .map(|runner| runner.as_ref())
    }
}

impl Default for Demo {
    fn default() -> Self {
        Self::new()
    }
}
