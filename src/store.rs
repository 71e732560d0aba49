//! # Store Module
//!
//! Connection and transaction primitives the pipeline runs against, plus an
//! in-memory relational store used for tests and dry runs.
//!
//! The in-memory store gives each transaction a private working copy of the
//! database. Commit publishes it, rollback (or dropping the connection)
//! discards it, so a failed batch leaves no partial effects.

use crate::error::StoreError;
use crate::schema::{ColumnDef, SqlValue, TableDefinition};
use crate::statement::Statement;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A single open connection to a relational store.
pub trait StoreConnection {
    /// Start a transaction. Nested transactions are not supported.
    fn begin(&mut self) -> Result<(), StoreError>;

    /// Execute one statement inside the current transaction.
    fn execute(&mut self, statement: &Statement) -> Result<(), StoreError>;

    fn commit(&mut self) -> Result<(), StoreError>;

    fn rollback(&mut self) -> Result<(), StoreError>;
}

/// Opens connections. Each pipeline phase opens its own and drops it when
/// the phase ends.
pub trait StoreConnector {
    type Connection: StoreConnection;

    fn connect(&self) -> Result<Self::Connection, StoreError>;
}

impl<T: StoreConnector + ?Sized> StoreConnector for &T {
    type Connection = T::Connection;

    fn connect(&self) -> Result<Self::Connection, StoreError> {
        (**self).connect()
    }
}

/// One stored row, keyed by column name.
pub type Row = FxHashMap<String, SqlValue>;

/// An in-memory table.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryTable {
    pub id_column: ColumnDef,
    pub primary_key: bool,
    pub columns: Vec<ColumnDef>,
    pub rows: Vec<Row>,
}

impl MemoryTable {
    fn from_definition(definition: &TableDefinition) -> Self {
        Self {
            id_column: definition.id_column.clone(),
            primary_key: definition.primary_key,
            columns: definition.columns.clone(),
            rows: Vec::new(),
        }
    }

    fn has_column(&self, name: &str) -> bool {
        self.id_column.name == name || self.columns.iter().any(|column| column.name == name)
    }

    fn empty_row(&self) -> Row {
        let mut row = Row::default();
        row.insert(self.id_column.name.clone(), SqlValue::Null);
        for column in &self.columns {
            row.insert(
                column.name.clone(),
                column.default.clone().unwrap_or(SqlValue::Null),
            );
        }
        row
    }

    /// Rows whose identifier column equals `id`.
    pub fn rows_for<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Row> + 'a {
        self.rows.iter().filter(move |row| {
            row.get(&self.id_column.name)
                .and_then(SqlValue::as_str)
                .is_some_and(|value| value == id)
        })
    }
}

/// All tables of an in-memory database.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryDatabase {
    tables: BTreeMap<String, MemoryTable>,
}

impl MemoryDatabase {
    pub fn table(&self, name: &str) -> Option<&MemoryTable> {
        self.tables.get(name)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    fn apply(&mut self, statement: &Statement) -> Result<(), StoreError> {
        match statement {
            Statement::DropTable { table } => {
                self.tables.remove(table);
                Ok(())
            }
            Statement::CreateTable {
                definition,
                if_not_exists,
            } => {
                if self.tables.contains_key(&definition.name) {
                    if *if_not_exists {
                        return Ok(());
                    }
                    return Err(StoreError::TableExists(definition.name.clone()));
                }
                self.tables.insert(
                    definition.name.clone(),
                    MemoryTable::from_definition(definition),
                );
                Ok(())
            }
            Statement::Insert {
                table,
                columns,
                values,
            } => {
                let target = self
                    .tables
                    .get_mut(table)
                    .ok_or_else(|| StoreError::MissingTable(table.clone()))?;
                let mut row = target.empty_row();
                for (column, value) in columns.iter().zip(values) {
                    if !target.has_column(column) {
                        return Err(StoreError::UnknownColumn {
                            table: table.clone(),
                            column: column.clone(),
                        });
                    }
                    row.insert(column.clone(), value.clone());
                }
                if target.primary_key {
                    let key = row
                        .get(&target.id_column.name)
                        .cloned()
                        .unwrap_or(SqlValue::Null);
                    let duplicate = target
                        .rows
                        .iter()
                        .any(|existing| existing.get(&target.id_column.name) == Some(&key));
                    if duplicate {
                        return Err(StoreError::DuplicateKey {
                            table: table.clone(),
                            key: key.to_string(),
                        });
                    }
                }
                target.rows.push(row);
                Ok(())
            }
        }
    }
}

/// Where an injected failure fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailurePoint {
    /// Any statement touching this table.
    Table(String),
    /// Any insert whose first value (the record id) equals this id.
    Record(String),
    /// The n-th statement executed on a connection, 1-based.
    Statement(usize),
    /// Every commit.
    Commit,
}

impl FailurePoint {
    fn matches(&self, statement: &Statement, executed: usize) -> bool {
        match self {
            FailurePoint::Table(table) => statement.table() == table,
            FailurePoint::Record(record) => match statement {
                Statement::Insert { values, .. } => {
                    values.first().and_then(SqlValue::as_str) == Some(record.as_str())
                }
                _ => false,
            },
            FailurePoint::Statement(position) => executed == *position,
            FailurePoint::Commit => false,
        }
    }
}

#[derive(Debug, Default)]
struct MemoryShared {
    database: MemoryDatabase,
    failures: Vec<FailurePoint>,
    commits: usize,
    rollbacks: usize,
}

/// Shared in-memory store. Clones refer to the same database.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Mutex<MemoryShared>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make matching statements (or commits) fail until cleared.
    pub fn fail_on(&self, point: FailurePoint) {
        self.shared.lock().failures.push(point);
    }

    pub fn clear_failures(&self) {
        self.shared.lock().failures.clear();
    }

    /// Copy of the committed database.
    pub fn snapshot(&self) -> MemoryDatabase {
        self.shared.lock().database.clone()
    }

    pub fn table_names(&self) -> Vec<String> {
        self.shared
            .lock()
            .database
            .table_names()
            .map(str::to_string)
            .collect()
    }

    /// Committed rows of a table, `None` when the table does not exist.
    pub fn rows(&self, table: &str) -> Option<Vec<Row>> {
        self.shared
            .lock()
            .database
            .table(table)
            .map(|table| table.rows.clone())
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.shared
            .lock()
            .database
            .table(table)
            .map_or(0, |table| table.rows.len())
    }

    /// Committed rows of `table` for one record id.
    pub fn rows_for(&self, table: &str, id: &str) -> Vec<Row> {
        let shared = self.shared.lock();
        shared
            .database
            .table(table)
            .map(|table| table.rows_for(id).cloned().collect())
            .unwrap_or_default()
    }

    pub fn commit_count(&self) -> usize {
        self.shared.lock().commits
    }

    pub fn rollback_count(&self) -> usize {
        self.shared.lock().rollbacks
    }
}

impl StoreConnector for MemoryStore {
    type Connection = MemoryConnection;

    fn connect(&self) -> Result<Self::Connection, StoreError> {
        Ok(MemoryConnection {
            store: self.clone(),
            working: None,
            executed: 0,
        })
    }
}

/// Connection to a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryConnection {
    store: MemoryStore,
    working: Option<MemoryDatabase>,
    executed: usize,
}

impl StoreConnection for MemoryConnection {
    fn begin(&mut self) -> Result<(), StoreError> {
        if self.working.is_some() {
            return Err(StoreError::TransactionActive);
        }
        self.working = Some(self.store.snapshot());
        Ok(())
    }

    fn execute(&mut self, statement: &Statement) -> Result<(), StoreError> {
        self.executed += 1;
        let injected = {
            let shared = self.store.shared.lock();
            shared
                .failures
                .iter()
                .find(|point| point.matches(statement, self.executed))
                .cloned()
        };
        if let Some(point) = injected {
            return Err(StoreError::Injected(format!(
                "{point:?} on table '{}'",
                statement.table()
            )));
        }
        let working = self.working.as_mut().ok_or(StoreError::NoTransaction)?;
        working.apply(statement)
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        let mut shared = self.store.shared.lock();
        if shared.failures.contains(&FailurePoint::Commit) {
            return Err(StoreError::Injected("commit".to_string()));
        }
        let working = self.working.take().ok_or(StoreError::NoTransaction)?;
        shared.database = working;
        shared.commits += 1;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        self.working.take().ok_or(StoreError::NoTransaction)?;
        self.store.shared.lock().rollbacks += 1;
        Ok(())
    }
}
