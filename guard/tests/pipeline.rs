//! Guard pipeline behaviour seen from outside the crate.

use std::sync::atomic::{AtomicUsize, Ordering};

use quickscript_core::{ArgsModel, FieldDecl, FieldType, NoArgs};
use quickscript_guard::{
    CallLedger, Collection, Dependency, GuardError, ItemKind, MapEnv, Shaped, mutatable,
    queryable, queryable_async,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("query failed")]
struct QueryFailed;

struct Frame {
    columns: Vec<String>,
}

impl Shaped for Frame {
    fn shape_label(&self) -> String {
        "frame:polars".to_string()
    }
}

#[derive(Debug)]
struct Table;

impl Shaped for Table {
    fn shape_label(&self) -> String {
        "frame:arrow".to_string()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Report {
    name: String,
    pages: i64,
}

impl ArgsModel for Report {
    fn fields() -> Vec<FieldDecl> {
        vec![FieldDecl::string("name"), FieldDecl::integer("pages").with_default(1)]
    }
}

#[test]
fn test_unmet_dependency_keeps_counter_at_zero() {
    static WRITES: AtomicUsize = AtomicUsize::new(0);

    let write = mutatable("write_report", |_: Report| {
        WRITES.fetch_add(1, Ordering::SeqCst);
        Ok::<_, QueryFailed>(())
    })
    .depends_on(Dependency::env_var("REPORT_DIR"))
    .depends_on(Dependency::typed_env_var("REPORT_LIMIT", FieldType::Integer))
    .with_env(MapEnv::new().with("REPORT_LIMIT", "many"));

    let err = write
        .call(Report {
            name: "q3".to_string(),
            pages: 2,
        })
        .unwrap_err();

    assert_eq!(WRITES.load(Ordering::SeqCst), 0);
    let GuardError::Dependency(err) = err else {
        panic!("expected a dependency error");
    };
    assert_eq!(err.unmet.len(), 2);
    assert!(err.to_string().contains("env var `REPORT_DIR`: not set"));
    assert!(err.to_string().contains("expected an integer, got `many`"));
}

#[test]
fn test_shape_mismatch_raised_after_side_effects() {
    static LOADS: AtomicUsize = AtomicUsize::new(0);

    let load = queryable("load_table", |_: NoArgs| {
        LOADS.fetch_add(1, Ordering::SeqCst);
        Ok::<_, QueryFailed>(Table)
    })
    .expect_shape("frame:polars")
    .with_env(MapEnv::new());

    let err = load.call(NoArgs {}).unwrap_err();

    assert_eq!(LOADS.load(Ordering::SeqCst), 1);
    assert_eq!(
        err.to_string(),
        "`load_table` returned `frame:arrow`, expected `frame:polars`"
    );
}

#[test]
fn test_frame_and_metadata_pair_passes_shape_check() {
    let load = queryable("load_frame", |_: NoArgs| {
        Ok::<_, QueryFailed>((
            Frame {
                columns: vec!["id".to_string()],
            },
            json!({"source": "warehouse"}),
        ))
    })
    .expect_shape("frame:polars")
    .with_env(MapEnv::new());

    let (frame, meta) = load.call(NoArgs {}).unwrap();
    assert_eq!(frame.columns, vec!["id"]);
    assert_eq!(meta["source"], "warehouse");
}

#[tokio::test]
async fn test_suspendable_query_with_prior_call() {
    let ledger = CallLedger::new();
    let prepare = mutatable("prepare", |_: NoArgs| Ok::<_, QueryFailed>(()))
        .with_env(MapEnv::new())
        .with_ledger(ledger.clone());
    let fetch = queryable_async("fetch", |args: Report| async move {
        Ok::<_, QueryFailed>(vec![args.name; args.pages as usize])
    })
    .depends_on(Dependency::prior_call("prepare"))
    .expect_shape("list")
    .with_env(MapEnv::new())
    .with_ledger(ledger.clone());

    let mut raw = serde_json::Map::new();
    raw.insert("name".to_string(), json!("weekly"));
    raw.insert("pages".to_string(), json!("2"));

    let err = fetch.call_raw_async(&raw).await.unwrap_err();
    assert!(err.is_rejection());

    prepare.call(NoArgs {}).unwrap();
    let pages = fetch.call_raw_async(&raw).await.unwrap();
    assert_eq!(pages, vec!["weekly", "weekly"]);
}

#[test]
fn test_collection_from_guard_metadata() {
    let load = queryable("load", |_: NoArgs| Ok::<_, QueryFailed>(()))
        .with_description("Load everything")
        .with_env(MapEnv::new());
    let save = mutatable("save", |_: Report| Ok::<_, QueryFailed>(())).with_env(MapEnv::new());

    let collection = Collection::new("jobs")
        .with(load.metadata())
        .with(save.metadata());

    assert_eq!(collection.of_kind(ItemKind::Query).count(), 1);
    assert_eq!(collection.find("save").map(|item| item.input_model.as_str()), Some("Report"));
    assert!(collection.render().contains("load  Load everything"));
}
