#[path = "../src/test_support.rs"]
mod test_support;

use partload::config::PipelineConfig;
use partload::error::{LoadError, StoreError};
use partload::pipeline::{
    LoadPipeline, PipelineState, SchemaOutcome, CATEGORY_PHASE, ENTITY_PHASE,
};
use partload::store::{FailurePoint, MemoryStore};
use partload::Record;
use test_support::{business, scenario_a};

fn follow_up() -> Vec<Record> {
    vec![
        business("r4").with_categories(["bars"]),
        business("r5").with_categories(["nightlife"]),
    ]
}

fn loaded_store() -> anyhow::Result<MemoryStore> {
    let store = MemoryStore::new();
    LoadPipeline::new(PipelineConfig::default(), store.clone()).run(&scenario_a())?;
    Ok(store)
}

#[test]
fn schema_failure_continues_into_the_data_phase() -> anyhow::Result<()> {
    let store = loaded_store()?;
    // Third schema statement: the drop of the first category table.
    store.fail_on(FailurePoint::Statement(3));

    let mut pipeline = LoadPipeline::new(PipelineConfig::default(), store.clone());
    let report = pipeline.run(&follow_up())?;

    assert!(matches!(
        report.schema,
        SchemaOutcome::Failed { ref table, .. } if table == "business_category_6"
    ));
    assert_eq!(
        report.transitions,
        vec![
            PipelineState::Idle,
            PipelineState::SchemaPhase,
            PipelineState::SchemaFailed,
            PipelineState::DataPhase,
            PipelineState::DataCommitted,
            PipelineState::Done,
        ]
    );
    assert_eq!(report.tables_created, 0);
    assert!(pipeline.is_finished());

    // Tables from the earlier run survived and received the new rows.
    assert_eq!(store.rows_for("business_category_8", "r1").len(), 1);
    assert_eq!(store.rows_for("business_category_8", "r4").len(), 1);
    assert_eq!(store.rows_for("business_category_6", "r5").len(), 1);
    assert_eq!(store.row_count("business"), 5);
    Ok(())
}

#[test]
fn schema_failure_is_returned_when_continuing_is_disabled() -> anyhow::Result<()> {
    let store = loaded_store()?;
    let before = store.snapshot();
    store.fail_on(FailurePoint::Statement(3));

    let config = PipelineConfig::default().continue_on_schema_error(false);
    let mut pipeline = LoadPipeline::new(config, store.clone());
    let err = pipeline.run(&follow_up()).unwrap_err();

    assert!(matches!(
        err,
        LoadError::SchemaExecution { ref table, .. } if table == "business_category_6"
    ));
    assert!(!err.is_fatal());
    assert_eq!(pipeline.state(), PipelineState::SchemaFailed);
    assert!(!pipeline.state().is_terminal());
    assert!(pipeline.is_finished());
    assert!(!pipeline.transitions().contains(&PipelineState::DataPhase));
    assert_eq!(store.snapshot(), before);
    Ok(())
}

#[test]
fn schema_failure_on_empty_store_surfaces_the_data_error() {
    let store = MemoryStore::new();
    store.fail_on(FailurePoint::Table("business_category_8".to_string()));

    let mut pipeline = LoadPipeline::new(PipelineConfig::default(), store.clone());
    let err = pipeline.run(&scenario_a()).unwrap_err();

    // The data phase was attempted and failed on the missing tables.
    match err {
        LoadError::DataExecution {
            phase,
            record,
            source,
        } => {
            assert_eq!(phase, CATEGORY_PHASE);
            assert_eq!(record, "r1");
            assert!(matches!(source, StoreError::MissingTable(_)));
        }
        other => panic!("expected a data failure, got {other:?}"),
    }
    let transitions = pipeline.transitions();
    assert!(transitions.contains(&PipelineState::SchemaFailed));
    assert!(transitions.contains(&PipelineState::DataPhase));
    assert_eq!(pipeline.state(), PipelineState::DataFailed);
    assert!(store.table_names().is_empty());
}

#[test]
fn data_failure_rolls_back_the_whole_batch() -> anyhow::Result<()> {
    let store = loaded_store()?;
    // Keep the schema phase from touching anything so the snapshot stays
    // comparable, and fail the second category insert.
    store.fail_on(FailurePoint::Table("business_hour".to_string()));
    store.fail_on(FailurePoint::Record("r5".to_string()));
    let before = store.snapshot();
    let commits = store.commit_count();

    let records = vec![
        business("r4").with_categories(["bars"]),
        business("r5").with_categories(["bars"]),
        business("r6").with_categories(["italian"]),
    ];
    let mut pipeline = LoadPipeline::new(PipelineConfig::default(), store.clone());
    let err = pipeline.run(&records).unwrap_err();

    assert!(err.is_fatal());
    assert!(matches!(
        err,
        LoadError::DataExecution { phase, ref record, .. } if phase == CATEGORY_PHASE && record == "r5"
    ));
    // r4's insert executed before the failure but was never committed.
    assert!(store.rows_for("business_category_8", "r4").is_empty());
    assert_eq!(store.snapshot(), before);
    assert_eq!(store.commit_count(), commits);
    assert_eq!(pipeline.state(), PipelineState::DataFailed);
    Ok(())
}

#[test]
fn duplicate_entity_fails_the_entity_phase() -> anyhow::Result<()> {
    let store = loaded_store()?;

    let mut pipeline = LoadPipeline::new(PipelineConfig::default(), store.clone());
    let err = pipeline.run(&scenario_a()).unwrap_err();

    match err {
        LoadError::DataExecution { phase, record, source } => {
            assert_eq!(phase, ENTITY_PHASE);
            assert_eq!(record, "r1");
            assert!(matches!(source, StoreError::DuplicateKey { .. }));
        }
        other => panic!("expected an entity failure, got {other:?}"),
    }
    // The category transaction committed on its own; the entity rows did not
    // change.
    assert_eq!(store.rows_for("business_category_8", "r1").len(), 1);
    assert_eq!(store.row_count("business"), 3);
    Ok(())
}
