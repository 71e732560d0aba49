#[path = "../src/test_support.rs"]
mod test_support;

use std::fs;

use partload::config::PipelineConfig;
use partload::model::AttributeValue;
use partload::persistence::SqliteStore;
use partload::pipeline::{LoadPipeline, SchemaOutcome};
use partload::schema::SqlValue;
use partload::source::read_records;
use partload::store::Row;
use test_support::{generate_corpus, to_json_line};

fn row_for<'a>(rows: &'a [Row], id: &str) -> Option<&'a Row> {
    rows.iter()
        .find(|row| row.get("business_id").and_then(SqlValue::as_str) == Some(id))
}

#[test]
fn json_lines_load_into_sqlite() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let input = dir.path().join("business.json");
    let corpus = generate_corpus(150, 42);
    let lines: Vec<String> = corpus.iter().map(to_json_line).collect();
    fs::write(&input, lines.join("\n"))?;

    let records = read_records(&input)?;
    assert_eq!(records.len(), corpus.len());

    let store = SqliteStore::open(dir.path().join("load.db"))?;
    let mut pipeline = LoadPipeline::new(PipelineConfig::default(), store.clone());
    let plan = pipeline.plan(&records);
    let report = pipeline.run(&records)?;

    assert_eq!(report.schema, SchemaOutcome::Committed);
    assert_eq!(report.entity_rows, records.len());
    assert_eq!(store.row_count("business")?, records.len());
    let hours: usize = records.iter().map(|record| record.hours.len()).sum();
    assert_eq!(store.row_count("business_hour")?, hours);
    assert_eq!(report.hour_rows, hours);

    // Nested attributes were dropped before any table was generated.
    assert_eq!(report.dropped_attribute_keys, vec!["parking".to_string()]);
    let tables = store.table_names()?;
    assert_eq!(tables.len(), plan.table_count());
    for table in &plan.category_tables {
        assert!(tables.contains(&table.name));
    }

    // Every category flag is stored in the table its key hashes to.
    let partitioner = plan.partitioner;
    for record in &records {
        for category in &record.categories {
            let table = plan
                .category_table(partitioner.assign(category))
                .expect("category table");
            let column = table.column_for_key(category).expect("category column");
            let rows = store.rows(&table.name)?;
            let row = row_for(&rows, &record.id).expect("flag row");
            assert_eq!(row[column], SqlValue::Integer(1), "{} / {}", record.id, category);
        }
    }

    // Typed attribute values round-trip.
    for record in records.iter().take(25) {
        for entry in &record.attributes {
            let Some(index) = plan.attribute_partitions.partition_of(&entry.key) else {
                continue;
            };
            let table = plan.attribute_table(index).expect("attribute table");
            let column = table.column_for_key(&entry.key).expect("attribute column");
            let rows = store.rows(&table.name)?;
            let row = row_for(&rows, &record.id).expect("attribute row");
            let expected = match &entry.value {
                AttributeValue::Bool(flag) => SqlValue::Integer(i64::from(*flag)),
                AttributeValue::Integer(value) => SqlValue::Integer(*value),
                AttributeValue::Text(text) => SqlValue::Text(text.clone()),
                AttributeValue::Unsupported(_) => continue,
            };
            assert_eq!(row[column], expected);
        }
    }
    Ok(())
}

#[test]
fn repeated_loads_generate_identical_schemas() -> anyhow::Result<()> {
    let records = generate_corpus(80, 9);
    let dir = tempfile::tempdir()?;

    let mut table_sets = Vec::new();
    for name in ["first.db", "second.db"] {
        let store = SqliteStore::open(dir.path().join(name))?;
        LoadPipeline::new(PipelineConfig::default(), store.clone()).run(&records)?;
        table_sets.push(store.table_names()?);
    }
    assert_eq!(table_sets[0], table_sets[1]);
    Ok(())
}

#[test]
fn reloading_partition_tables_replaces_their_contents() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let store = SqliteStore::open(dir.path().join("load.db"))?;

    let first = generate_corpus(40, 1);
    LoadPipeline::new(PipelineConfig::default(), store.clone()).run(&first)?;

    // New ids, so the entity rows do not collide with the first load.
    let second: Vec<_> = generate_corpus(40, 1)
        .into_iter()
        .map(|mut record| {
            record.id = format!("second_{}", record.id);
            record
        })
        .collect();
    let report = LoadPipeline::new(PipelineConfig::default(), store.clone()).run(&second)?;

    let flagged: usize = report.category_rows;
    let stored: usize = store
        .table_names()?
        .iter()
        .filter(|name| name.starts_with("business_category_"))
        .map(|name| store.row_count(name))
        .sum::<Result<usize, _>>()?;
    assert_eq!(stored, flagged);
    assert_eq!(store.row_count("business")?, 80);
    Ok(())
}
