//! Script entrypoint scenarios through the public facade.

use std::sync::{Arc, Mutex};

use quickscript::{
    ArgsModel, CallLedger, Dependency, EXIT_FAILURE, EXIT_SUCCESS, EXIT_USAGE, FieldDecl,
    GuardError, Logger, MapEnv, MemoryLogger, NoArgs, Runnable, ScriptError, ScriptState,
    mutatable, queryable, script,
};
use serde::{Deserialize, Serialize};
use tracing::Level;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Args {
    input_file: String,
    mode: String,
}

impl ArgsModel for Args {
    fn fields() -> Vec<FieldDecl> {
        vec![
            FieldDecl::string("input_file").with_default("default.txt"),
            FieldDecl::string("mode"),
        ]
    }
}

fn logger() -> (Arc<MemoryLogger>, Arc<dyn Logger>) {
    let memory = Arc::new(MemoryLogger::new());
    let handle: Arc<dyn Logger> = memory.clone();
    (memory, handle)
}

#[test]
fn test_main_receives_parsed_model_with_defaults() {
    let seen = Arc::new(Mutex::new(None));
    let captured = Arc::clone(&seen);
    let job = script("job", move |args: Args, _: &dyn Logger| {
        *captured.lock().unwrap() = Some(args);
        Ok(())
    });

    let (_, handle) = logger();
    let outcome = job.run_with(["--mode", "fast"], handle);

    assert_eq!(outcome.exit_code, EXIT_SUCCESS);
    assert_eq!(
        seen.lock().unwrap().clone(),
        Some(Args {
            input_file: "default.txt".to_string(),
            mode: "fast".to_string(),
        })
    );
}

#[test]
fn test_missing_mode_is_a_usage_error_naming_mode() {
    let job = script("job", |_: Args, _: &dyn Logger| Ok(()));

    let (memory, handle) = logger();
    let outcome = job.run_with(Vec::<String>::new(), handle);

    assert_eq!(outcome.state, ScriptState::ArgsInvalid);
    assert_eq!(outcome.exit_code, EXIT_USAGE);
    assert!(memory.entries().is_empty());
    let Some(ScriptError::Arguments(err)) = outcome.error else {
        panic!("expected an argument error");
    };
    assert_eq!(err.missing_fields(), vec!["mode"]);
}

#[test]
fn test_guard_failure_inside_main_is_a_runtime_error() {
    let ledger = CallLedger::new();
    let load = queryable("load", |_: NoArgs| Ok::<_, std::io::Error>(vec![1, 2, 3]))
        .with_env(MapEnv::new())
        .with_ledger(ledger.clone());
    let publish = mutatable("publish", |_: NoArgs| Ok::<_, std::io::Error>(()))
        .depends_on(Dependency::env_var("PUBLISH_TOKEN"))
        .with_env(MapEnv::new())
        .with_ledger(ledger.clone());

    let job = script("nightly", move |_: NoArgs, logger: &dyn Logger| {
        let rows = load.call(NoArgs {})?;
        logger.info(&format!("loaded {} rows", rows.len()));
        publish.call(NoArgs {})?;
        Ok(())
    });

    let (memory, handle) = logger();
    let outcome = job.run_with(Vec::<String>::new(), handle);

    assert_eq!(outcome.exit_code, EXIT_FAILURE);
    assert_eq!(memory.messages(Level::INFO), vec!["loaded 3 rows"]);
    let errors = memory.messages(Level::ERROR);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("env var `PUBLISH_TOKEN`: not set"));
    assert_eq!(ledger.calls(), vec!["load"]);

    let Some(ScriptError::Failed { source, .. }) = outcome.error else {
        panic!("expected a runtime failure");
    };
    assert!(matches!(
        source.downcast_ref::<GuardError<std::io::Error>>(),
        Some(GuardError::Dependency(_))
    ));
}

#[test]
fn test_scripts_run_through_object_safe_view() {
    let scripts: Vec<Box<dyn Runnable>> = vec![
        Box::new(script("ok", |_: NoArgs, _: &dyn Logger| Ok(()))),
        Box::new(script("needs_mode", |_: Args, _: &dyn Logger| Ok(()))),
    ];

    let codes: Vec<i32> = scripts
        .iter()
        .map(|s| s.run_with(Vec::new(), logger().1).exit_code)
        .collect();

    assert_eq!(codes, vec![EXIT_SUCCESS, EXIT_USAGE]);
    assert_eq!(scripts[1].schema().unwrap().field_names(), vec!["input_file", "mode"]);
}
