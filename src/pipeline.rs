//! # Load Pipeline
//!
//! Drives one load run through its transactional phases:
//!
//! 1. **Plan** - scan the whole corpus for category and attribute keys,
//!    partition them, and derive every table definition. The plan is
//!    immutable and shared by the schema and data phases, so a key is routed
//!    to the same table it was given a column in.
//! 2. **Schema** - one transaction that recreates the partition tables and
//!    creates the entity tables if missing. A failure here is recoverable
//!    when `continue_on_schema_error` is set.
//! 3. **Data** - three transactions (category flags, attribute values,
//!    entity and hours rows). Any failure rolls back the current
//!    transaction and aborts the run.
//!
//! Statement generation is pure and may run on the rayon pool. Execution is
//! always sequential on a single connection owned by the current phase.

use crate::config::{PipelineConfig, TableNaming};
use crate::error::{LoadError, StoreError};
use crate::keyset::{collect_attribute_keys, collect_category_keys, AttributeKeys, CategoryKeys};
use crate::model::{AttributeValue, Record, ScalarValue};
use crate::partition::{PartitionMap, Partitioner};
use crate::schema::{SchemaGenerator, SqlValue, TableDefinition};
use crate::statement::{LoadBatch, Statement};
use crate::store::{StoreConnection, StoreConnector};
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, instrument, warn};

pub const SCHEMA_PHASE: &str = "schema";
pub const CATEGORY_PHASE: &str = "category";
pub const ATTRIBUTE_PHASE: &str = "attribute";
pub const ENTITY_PHASE: &str = "entity";

/// Failure origins that are not a table or record.
const CONNECT_ORIGIN: &str = "<connect>";
const BEGIN_ORIGIN: &str = "<begin>";
const COMMIT_ORIGIN: &str = "<commit>";

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    SchemaPhase,
    SchemaCommitted,
    SchemaFailed,
    DataPhase,
    DataCommitted,
    DataFailed,
    Done,
}

impl PipelineState {
    /// States no run moves on from. `SchemaFailed` is absent: a run leaves it
    /// for `DataPhase` unless `continue_on_schema_error` is off, which only
    /// the pipeline knows. Use [`LoadPipeline::is_finished`] for that case.
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::DataFailed)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PipelineState::Idle => "idle",
            PipelineState::SchemaPhase => "schema_phase",
            PipelineState::SchemaCommitted => "schema_committed",
            PipelineState::SchemaFailed => "schema_failed",
            PipelineState::DataPhase => "data_phase",
            PipelineState::DataCommitted => "data_committed",
            PipelineState::DataFailed => "data_failed",
            PipelineState::Done => "done",
        };
        f.write_str(label)
    }
}

/// Result of the schema transaction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SchemaOutcome {
    #[default]
    NotRun,
    Committed,
    /// Rolled back; the run continued to the data phase.
    Failed { table: String, message: String },
}

/// Summary of a completed run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub records: usize,
    /// Partition tables recreated by the schema transaction. Entity tables
    /// are created only if missing and are not counted.
    pub tables_created: usize,
    pub schema: SchemaOutcome,
    pub category_rows: usize,
    pub attribute_rows: usize,
    pub hour_rows: usize,
    pub entity_rows: usize,
    /// Attribute keys excluded because none of their values had a column type.
    pub dropped_attribute_keys: Vec<String>,
    pub transitions: Vec<PipelineState>,
    pub elapsed: Duration,
}

impl LoadReport {
    pub fn rows_inserted(&self) -> usize {
        self.category_rows + self.attribute_rows + self.hour_rows + self.entity_rows
    }

    pub fn final_state(&self) -> PipelineState {
        self.transitions
            .last()
            .copied()
            .unwrap_or(PipelineState::Idle)
    }
}

/// Key sets, partitions and table definitions for one corpus.
#[derive(Debug, Clone)]
pub struct LoadPlan {
    pub partitioner: Partitioner,
    pub naming: TableNaming,
    pub category_keys: CategoryKeys,
    pub attribute_keys: AttributeKeys,
    pub category_partitions: PartitionMap,
    pub attribute_partitions: PartitionMap,
    pub entity_tables: Vec<TableDefinition>,
    pub category_tables: Vec<TableDefinition>,
    pub attribute_tables: Vec<TableDefinition>,
}

impl LoadPlan {
    /// Every planned table in creation order: entity, category, attribute.
    pub fn tables(&self) -> impl Iterator<Item = &TableDefinition> {
        self.entity_tables
            .iter()
            .chain(&self.category_tables)
            .chain(&self.attribute_tables)
    }

    pub fn table_count(&self) -> usize {
        self.entity_tables.len() + self.category_tables.len() + self.attribute_tables.len()
    }

    /// Category and attribute tables, which every run drops and recreates.
    pub fn partition_table_count(&self) -> usize {
        self.category_tables.len() + self.attribute_tables.len()
    }

    pub fn category_table(&self, partition: usize) -> Option<&TableDefinition> {
        self.category_tables
            .iter()
            .find(|table| table.partition == Some(partition))
    }

    pub fn attribute_table(&self, partition: usize) -> Option<&TableDefinition> {
        self.attribute_tables
            .iter()
            .find(|table| table.partition == Some(partition))
    }

    /// DDL for every planned table, tagged with the table name.
    pub fn schema_batch(&self) -> LoadBatch {
        let mut batch = LoadBatch::new(SCHEMA_PHASE);
        for table in self.tables() {
            batch.extend_from(&table.name, Statement::create(table));
        }
        batch
    }

    /// Presence-flag inserts for one record, one per category table it
    /// touches. Keys sharing a column are written once.
    pub fn category_statements(&self, record: &Record) -> Vec<Statement> {
        let buckets = self.partitioner.partition_all(&record.categories);
        buckets
            .non_empty()
            .filter_map(|bucket| {
                let table = self.category_table(bucket.index)?;
                let mut columns = vec![table.id_column.name.clone()];
                for key in &bucket.keys {
                    match table.column_for_key(key) {
                        Some(column) if !columns.iter().any(|existing| existing == column) => {
                            columns.push(column.to_string());
                        }
                        Some(_) => {}
                        None => debug!(record = %record.id, key = %key, "category has no column"),
                    }
                }
                if columns.len() == 1 {
                    return None;
                }
                let mut values = Vec::with_capacity(columns.len());
                values.push(SqlValue::Text(record.id.clone()));
                values.extend(std::iter::repeat(SqlValue::Integer(1)).take(columns.len() - 1));
                Some(Statement::insert(table.name.clone(), columns, values))
            })
            .collect()
    }

    /// Typed attribute inserts for one record. Entries whose kind differs
    /// from the key's registered kind are skipped.
    pub fn attribute_statements(&self, record: &Record) -> Vec<Statement> {
        if self.attribute_tables.is_empty() {
            return Vec::new();
        }

        let mut values: IndexMap<&str, &AttributeValue> = IndexMap::new();
        for entry in &record.attributes {
            match self.attribute_keys.get(&entry.key) {
                Some(kind) if *kind == entry.kind() => {
                    values.entry(entry.key.as_str()).or_insert(&entry.value);
                }
                Some(kind) => debug!(
                    record = %record.id,
                    key = %entry.key,
                    expected = %kind,
                    found = %entry.kind(),
                    "attribute kind mismatch; value skipped"
                ),
                None => {}
            }
        }

        let buckets = self.partitioner.partition_all(values.keys().copied());
        buckets
            .non_empty()
            .filter_map(|bucket| {
                let table = self.attribute_table(bucket.index)?;
                let mut columns = vec![table.id_column.name.clone()];
                let mut row = vec![SqlValue::Text(record.id.clone())];
                for key in &bucket.keys {
                    let Some(column) = table.column_for_key(key) else {
                        continue;
                    };
                    if columns.iter().any(|existing| existing == column) {
                        continue;
                    }
                    let Some(value) = values.get(key.as_str()) else {
                        continue;
                    };
                    columns.push(column.to_string());
                    row.push(attribute_sql_value(value));
                }
                (columns.len() > 1).then(|| Statement::insert(table.name.clone(), columns, row))
            })
            .collect()
    }

    /// Hours rows followed by the entity row for one record.
    pub fn entity_statements(&self, record: &Record) -> Vec<Statement> {
        let id_column = &self.naming.id_column;
        let id = SqlValue::Text(record.id.clone());
        let mut statements = Vec::with_capacity(record.hours.len() + 1);

        for window in &record.hours {
            statements.push(Statement::insert(
                self.naming.hours_table.clone(),
                vec![
                    id_column.clone(),
                    "day".to_string(),
                    "close".to_string(),
                    "open".to_string(),
                ],
                vec![
                    id.clone(),
                    SqlValue::Text(window.day.clone()),
                    SqlValue::Text(window.close.clone()),
                    SqlValue::Text(window.open.clone()),
                ],
            ));
        }

        let mut columns = Vec::with_capacity(self.naming.entity_columns.len() + 1);
        let mut values = Vec::with_capacity(columns.capacity());
        columns.push(id_column.clone());
        values.push(id);
        for column in &self.naming.entity_columns {
            columns.push(column.name.clone());
            values.push(scalar_sql_value(record.field(&column.name)));
        }
        statements.push(Statement::insert(
            self.naming.entity_table.clone(),
            columns,
            values,
        ));
        statements
    }
}

fn scalar_sql_value(value: &ScalarValue) -> SqlValue {
    match value {
        ScalarValue::Null => SqlValue::Null,
        ScalarValue::Bool(flag) => SqlValue::Integer(i64::from(*flag)),
        ScalarValue::Integer(value) => SqlValue::Integer(*value),
        ScalarValue::Float(value) => SqlValue::Real(*value),
        ScalarValue::Text(value) => SqlValue::Text(value.clone()),
    }
}

fn attribute_sql_value(value: &AttributeValue) -> SqlValue {
    match value {
        AttributeValue::Bool(flag) => SqlValue::Integer(i64::from(*flag)),
        AttributeValue::Integer(value) => SqlValue::Integer(*value),
        AttributeValue::Text(value) | AttributeValue::Unsupported(value) => {
            SqlValue::Text(value.clone())
        }
    }
}

/// An open transaction that rolls back unless committed.
///
/// Every early return from a phase drops the guard, so the store never sees
/// a half-applied batch.
pub struct TransactionGuard<T: StoreConnection> {
    conn: T,
    phase: &'static str,
    active: bool,
}

impl<T: StoreConnection> TransactionGuard<T> {
    pub fn begin(mut conn: T, phase: &'static str) -> Result<Self, StoreError> {
        conn.begin()?;
        Ok(Self {
            conn,
            phase,
            active: true,
        })
    }

    pub fn execute(&mut self, statement: &Statement) -> Result<(), StoreError> {
        self.conn.execute(statement)
    }

    pub fn commit(mut self) -> Result<(), StoreError> {
        self.conn.commit()?;
        self.active = false;
        Ok(())
    }

    pub fn rollback(mut self) -> Result<(), StoreError> {
        self.active = false;
        self.conn.rollback()
    }
}

impl<T: StoreConnection> Drop for TransactionGuard<T> {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        match self.conn.rollback() {
            Ok(()) => debug!(phase = self.phase, "transaction rolled back"),
            Err(err) => warn!(phase = self.phase, error = %err, "rollback failed"),
        }
    }
}

struct BatchFailure {
    origin: String,
    source: StoreError,
}

impl BatchFailure {
    fn new(origin: &str, source: StoreError) -> Self {
        Self {
            origin: origin.to_string(),
            source,
        }
    }
}

/// Runs load plans against a store.
pub struct LoadPipeline<C> {
    config: PipelineConfig,
    generator: SchemaGenerator,
    connector: C,
    state: PipelineState,
    transitions: Vec<PipelineState>,
}

impl<C: StoreConnector> LoadPipeline<C> {
    pub fn new(config: PipelineConfig, connector: C) -> Self {
        let generator = SchemaGenerator::new(config.tables.clone());
        Self {
            config,
            generator,
            connector,
            state: PipelineState::Idle,
            transitions: vec![PipelineState::Idle],
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Whether the latest run has ended, either in `Done`, a data failure or
    /// a schema failure that was not allowed to continue.
    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
            || (self.state == PipelineState::SchemaFailed && !self.config.continue_on_schema_error)
    }

    /// States visited by the latest run, starting at `Idle`.
    pub fn transitions(&self) -> &[PipelineState] {
        &self.transitions
    }

    /// Collect keys, partition them and derive every table. Needs the full
    /// corpus: partition membership depends on the global key set.
    pub fn plan(&self, records: &[Record]) -> LoadPlan {
        let partitioner = self.config.partitioner;
        let category_keys = collect_category_keys(records);
        let attribute_keys = collect_attribute_keys(records);
        let category_partitions = partitioner.partition_all(category_keys.keys());
        let attribute_partitions = partitioner.partition_all(attribute_keys.keys());

        let entity_tables = self.generator.build_entity_tables();
        let category_tables = self.generator.build_category_tables(&category_partitions);
        let attribute_tables = if self.config.load_attributes {
            self.generator
                .build_attribute_tables(&attribute_partitions, &attribute_keys)
        } else {
            Vec::new()
        };

        info!(
            records = records.len(),
            categories = category_keys.len(),
            attributes = attribute_keys.len(),
            dropped_attributes = attribute_keys.dropped().len(),
            partitions = partitioner.count(),
            category_tables = category_tables.len(),
            attribute_tables = attribute_tables.len(),
            "load plan ready"
        );

        LoadPlan {
            partitioner,
            naming: self.config.tables.clone(),
            category_keys,
            attribute_keys,
            category_partitions,
            attribute_partitions,
            entity_tables,
            category_tables,
            attribute_tables,
        }
    }

    /// Plan and load `records`.
    ///
    /// Returns the report once every data transaction committed. A schema
    /// failure is returned only when `continue_on_schema_error` is off; any
    /// data failure is always returned.
    pub fn run(&mut self, records: &[Record]) -> Result<LoadReport, LoadError> {
        let started = Instant::now();
        self.state = PipelineState::Idle;
        self.transitions = vec![PipelineState::Idle];

        let plan = self.plan(records);
        let mut report = LoadReport {
            records: records.len(),
            dropped_attribute_keys: plan.attribute_keys.dropped().to_vec(),
            ..LoadReport::default()
        };

        self.enter(PipelineState::SchemaPhase);
        match self.schema_phase(&plan) {
            Ok(created) => {
                report.tables_created = created;
                report.schema = SchemaOutcome::Committed;
                self.enter(PipelineState::SchemaCommitted);
            }
            Err(err) => {
                self.enter(PipelineState::SchemaFailed);
                error!(phase = SCHEMA_PHASE, error = %err, "schema phase failed");
                if !self.config.continue_on_schema_error {
                    return Err(err);
                }
                if let LoadError::SchemaExecution { table, source } = &err {
                    report.schema = SchemaOutcome::Failed {
                        table: table.clone(),
                        message: source.to_string(),
                    };
                }
                warn!("continuing to data phase after schema failure");
            }
        }

        self.enter(PipelineState::DataPhase);

        let categories = self.build_batch(CATEGORY_PHASE, records, |record| {
            plan.category_statements(record)
        });
        report.category_rows = self.data_phase(&categories)?;

        if self.config.load_attributes {
            let attributes = self.build_batch(ATTRIBUTE_PHASE, records, |record| {
                plan.attribute_statements(record)
            });
            report.attribute_rows = self.data_phase(&attributes)?;
        }

        let entities = self.build_batch(ENTITY_PHASE, records, |record| {
            plan.entity_statements(record)
        });
        let hour_rows = entities
            .statements()
            .filter(|statement| statement.table() == plan.naming.hours_table)
            .count();
        let inserted = self.data_phase(&entities)?;
        report.hour_rows = hour_rows;
        report.entity_rows = inserted - hour_rows;

        self.enter(PipelineState::DataCommitted);
        self.enter(PipelineState::Done);
        report.transitions = self.transitions.clone();
        report.elapsed = started.elapsed();

        info!(
            records = report.records,
            rows = report.rows_inserted(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "load complete"
        );
        Ok(report)
    }

    fn enter(&mut self, state: PipelineState) {
        debug!(from = %self.state, to = %state, "pipeline transition");
        self.state = state;
        self.transitions.push(state);
    }

    /// Build one phase's statements, keeping record order.
    fn build_batch<F>(&self, name: &'static str, records: &[Record], build: F) -> LoadBatch
    where
        F: Fn(&Record) -> Vec<Statement> + Sync + Send,
    {
        let per_record: Vec<(&str, Vec<Statement>)> = if self.config.parallel_build {
            records
                .par_iter()
                .map(|record| (record.id.as_str(), build(record)))
                .collect()
        } else {
            records
                .iter()
                .map(|record| (record.id.as_str(), build(record)))
                .collect()
        };

        let mut batch = LoadBatch::new(name);
        for (origin, statements) in per_record {
            batch.extend_from(origin, statements);
        }
        batch
    }

    #[instrument(skip(self, plan), fields(tables = plan.table_count()))]
    fn schema_phase(&self, plan: &LoadPlan) -> Result<usize, LoadError> {
        info!("beginning schema creation");
        let batch = plan.schema_batch();
        match self.execute_batch(&batch) {
            Ok(_) => {
                let recreated = plan.partition_table_count();
                info!(tables = plan.table_count(), recreated, "finished schema creation");
                Ok(recreated)
            }
            Err(failure) => Err(LoadError::SchemaExecution {
                table: failure.origin,
                source: failure.source,
            }),
        }
    }

    #[instrument(skip(self, batch), fields(phase = batch.name, statements = batch.len()))]
    fn data_phase(&mut self, batch: &LoadBatch) -> Result<usize, LoadError> {
        info!(phase = batch.name, "beginning insert");
        match self.execute_batch(batch) {
            Ok(rows) => {
                info!(phase = batch.name, rows, "finished insert");
                Ok(rows)
            }
            Err(failure) => {
                self.enter(PipelineState::DataFailed);
                let err = LoadError::DataExecution {
                    phase: batch.name,
                    record: failure.origin,
                    source: failure.source,
                };
                error!(phase = batch.name, error = %err, "data phase failed");
                Err(err)
            }
        }
    }

    /// Execute a batch in one transaction on a fresh connection. The guard
    /// rolls back and the connection closes on every error path.
    fn execute_batch(&self, batch: &LoadBatch) -> Result<usize, BatchFailure> {
        let conn = self
            .connector
            .connect()
            .map_err(|source| BatchFailure::new(CONNECT_ORIGIN, source))?;
        let mut guard = TransactionGuard::begin(conn, batch.name)
            .map_err(|source| BatchFailure::new(BEGIN_ORIGIN, source))?;

        for entry in &batch.entries {
            guard
                .execute(&entry.statement)
                .map_err(|source| BatchFailure::new(&entry.origin, source))?;
        }

        guard
            .commit()
            .map_err(|source| BatchFailure::new(COMMIT_ORIGIN, source))?;
        Ok(batch.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TimeWindow;
    use crate::store::{FailurePoint, MemoryStore};

    fn scenario_a() -> Vec<Record> {
        vec![
            Record::new("r1").with_categories(["bars", "nightlife"]),
            Record::new("r2").with_categories(["bars"]),
            Record::new("r3").with_categories(["italian"]),
        ]
    }

    fn pipeline(store: &MemoryStore) -> LoadPipeline<MemoryStore> {
        LoadPipeline::new(PipelineConfig::default(), store.clone())
    }

    #[test]
    fn plan_partitions_the_global_key_set() {
        let store = MemoryStore::new();
        let plan = pipeline(&store).plan(&scenario_a());

        assert_eq!(plan.category_keys.len(), 3);
        assert_eq!(plan.category_partitions.partition_of("bars"), Some(7));
        assert_eq!(plan.category_partitions.partition_of("nightlife"), Some(5));
        assert_eq!(plan.category_partitions.partition_of("italian"), Some(9));
        assert_eq!(plan.category_tables.len(), 3);
        assert_eq!(plan.entity_tables.len(), 2);
        assert!(plan.attribute_tables.is_empty());
        assert_eq!(plan.table_count(), 5);
        assert_eq!(plan.partition_table_count(), 3);
    }

    #[test]
    fn category_statements_route_to_owning_tables() {
        let store = MemoryStore::new();
        let records = scenario_a();
        let plan = pipeline(&store).plan(&records);

        let statements = plan.category_statements(&records[0]);
        let tables: Vec<_> = statements.iter().map(Statement::table).collect();
        assert_eq!(tables, vec!["business_category_6", "business_category_8"]);
        match &statements[1] {
            Statement::Insert { columns, values, .. } => {
                assert_eq!(columns, &["business_id", "bars"]);
                assert_eq!(
                    values,
                    &[SqlValue::Text("r1".to_string()), SqlValue::Integer(1)]
                );
            }
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn mismatched_attribute_kinds_are_skipped() {
        let store = MemoryStore::new();
        let records = vec![
            Record::new("r1").with_attribute("noise", AttributeValue::Integer(2)),
            Record::new("r2").with_attribute("noise", AttributeValue::Text("loud".to_string())),
        ];
        let plan = pipeline(&store).plan(&records);

        assert_eq!(plan.attribute_statements(&records[0]).len(), 1);
        assert!(plan.attribute_statements(&records[1]).is_empty());
    }

    #[test]
    fn entity_statements_put_hours_before_the_entity_row() {
        let store = MemoryStore::new();
        let record = Record::new("r1")
            .with_field("name", "Cafe")
            .with_field("open", true)
            .with_hours(TimeWindow::new("MONDAY", "08:00", "17:00"))
            .with_hours(TimeWindow::new("TUESDAY", "08:00", "17:00"));
        let plan = pipeline(&store).plan(std::slice::from_ref(&record));

        let statements = plan.entity_statements(&record);
        let tables: Vec<_> = statements.iter().map(Statement::table).collect();
        assert_eq!(tables, vec!["business_hour", "business_hour", "business"]);
        match statements.last() {
            Some(Statement::Insert { columns, values, .. }) => {
                let value_of = |name: &str| {
                    let idx = columns.iter().position(|column| column == name).unwrap();
                    values[idx].clone()
                };
                assert_eq!(value_of("name"), SqlValue::Text("Cafe".to_string()));
                assert_eq!(value_of("open"), SqlValue::Integer(1));
                assert_eq!(value_of("city"), SqlValue::Null);
            }
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn parallel_and_sequential_builds_agree() {
        let store = MemoryStore::new();
        let records: Vec<Record> = (0..64)
            .map(|idx| {
                Record::new(format!("r{idx}"))
                    .with_categories([format!("cat-{}", idx % 7), format!("cat-{}", idx % 11)])
            })
            .collect();
        let parallel = pipeline(&store);
        let sequential = LoadPipeline::new(PipelineConfig::default().parallel_build(false), &store);
        let plan = parallel.plan(&records);

        let a = parallel.build_batch(CATEGORY_PHASE, &records, |r| plan.category_statements(r));
        let b = sequential.build_batch(CATEGORY_PHASE, &records, |r| plan.category_statements(r));
        assert_eq!(a, b);
        assert_eq!(a.entries[0].origin, "r0");
    }

    #[test]
    fn guard_rolls_back_when_dropped() {
        let store = MemoryStore::new();
        let plan = pipeline(&store).plan(&scenario_a());
        {
            let mut guard =
                TransactionGuard::begin(store.connect().unwrap(), SCHEMA_PHASE).unwrap();
            for statement in plan.schema_batch().statements() {
                guard.execute(statement).unwrap();
            }
        }
        assert!(store.table_names().is_empty());
        assert_eq!(store.rollback_count(), 1);
    }

    #[test]
    fn run_walks_every_state() {
        let store = MemoryStore::new();
        let mut pipeline = pipeline(&store);
        let report = pipeline.run(&scenario_a()).unwrap();

        assert_eq!(
            report.transitions,
            vec![
                PipelineState::Idle,
                PipelineState::SchemaPhase,
                PipelineState::SchemaCommitted,
                PipelineState::DataPhase,
                PipelineState::DataCommitted,
                PipelineState::Done,
            ]
        );
        assert_eq!(pipeline.state(), PipelineState::Done);
        assert_eq!(report.schema, SchemaOutcome::Committed);
        assert_eq!(report.tables_created, 3);
        assert!(pipeline.is_finished());
        assert_eq!(report.category_rows, 4);
        assert_eq!(report.entity_rows, 3);
        assert_eq!(report.hour_rows, 0);
        // schema, category, attribute, entity
        assert_eq!(store.commit_count(), 4);
    }

    #[test]
    fn commit_failure_is_a_data_failure() {
        let store = MemoryStore::new();
        let mut pipeline = pipeline(&store);
        pipeline.run(&scenario_a()).unwrap();

        store.fail_on(FailurePoint::Commit);
        let err = pipeline.run(&[Record::new("r9")]).unwrap_err();
        assert!(matches!(
            err,
            LoadError::DataExecution { ref record, .. } if record == COMMIT_ORIGIN
        ));
        assert_eq!(pipeline.state(), PipelineState::DataFailed);
        assert!(pipeline.state().is_terminal());
        assert!(pipeline.is_finished());
    }

    #[test]
    fn later_supported_attribute_value_is_loaded() {
        let store = MemoryStore::new();
        let records = vec![
            Record::new("r1").with_attribute(
                "parking",
                AttributeValue::Unsupported(r#"{"garage":false}"#.to_string()),
            ),
            Record::new("r2").with_attribute("parking", AttributeValue::Bool(true)),
        ];
        let report = pipeline(&store).run(&records).unwrap();

        assert!(report.dropped_attribute_keys.is_empty());
        assert_eq!(report.attribute_rows, 1);
        // parking hashes to partition 7 of 10.
        let rows = store.rows_for("business_attribute_8", "r2");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["parking"], SqlValue::Integer(1));
        assert!(store.rows_for("business_attribute_8", "r1").is_empty());
    }
}
