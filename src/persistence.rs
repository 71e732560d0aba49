//! # SQLite Backend
//!
//! Durable store backed by a SQLite file. Every [`StoreConnector::connect`]
//! opens a fresh `rusqlite` connection, so each pipeline phase owns its own
//! connection and releases it when the phase ends. Statements are rendered
//! by [`SqliteDialect`] and bound positionally.

use crate::error::StoreError;
use crate::schema::SqlValue;
use crate::statement::{SqlDialect, SqliteDialect, Statement};
use crate::store::{Row, StoreConnection, StoreConnector};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params_from_iter, Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// SQLite journal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalMode {
    #[default]
    Wal,
    Delete,
}

impl JournalMode {
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SqliteOpenOptions {
    pub busy_timeout_ms: u64,
    pub journal_mode: JournalMode,
}

impl Default for SqliteOpenOptions {
    fn default() -> Self {
        Self {
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: JournalMode::default(),
        }
    }
}

/// Connector for a SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    path: PathBuf,
    options: SqliteOpenOptions,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with_options(path, SqliteOpenOptions::default())
    }

    pub fn open_with_options(
        path: impl AsRef<Path>,
        options: SqliteOpenOptions,
    ) -> Result<Self, StoreError> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            options,
        };
        // Open once so a bad path fails here.
        store.open_connection()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_connection(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
        )?;
        conn.busy_timeout(Duration::from_millis(self.options.busy_timeout_ms))?;
        conn.execute_batch(&format!(
            "PRAGMA journal_mode = {};",
            self.options.journal_mode.pragma_value()
        ))?;
        Ok(conn)
    }

    /// Names of all user tables, sorted.
    pub fn table_names(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.open_connection()?;
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Every row of `table`, keyed by column name.
    pub fn rows(&self, table: &str) -> Result<Vec<Row>, StoreError> {
        let conn = self.open_connection()?;
        let sql = format!("SELECT * FROM {}", SqliteDialect.quote_ident(table));
        let mut stmt = conn.prepare(&sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
        let rows = stmt
            .query_map([], |row| {
                let mut out = Row::default();
                for (idx, name) in names.iter().enumerate() {
                    out.insert(name.clone(), from_value_ref(row.get_ref(idx)?));
                }
                Ok(out)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn row_count(&self, table: &str) -> Result<usize, StoreError> {
        let conn = self.open_connection()?;
        let sql = format!("SELECT COUNT(*) FROM {}", SqliteDialect.quote_ident(table));
        let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

impl StoreConnector for SqliteStore {
    type Connection = SqliteConnection;

    fn connect(&self) -> Result<Self::Connection, StoreError> {
        Ok(SqliteConnection {
            conn: self.open_connection()?,
            in_transaction: false,
        })
    }
}

/// One open SQLite connection. An open transaction is rolled back on drop.
#[derive(Debug)]
pub struct SqliteConnection {
    conn: Connection,
    in_transaction: bool,
}

impl StoreConnection for SqliteConnection {
    fn begin(&mut self) -> Result<(), StoreError> {
        if self.in_transaction {
            return Err(StoreError::TransactionActive);
        }
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        self.in_transaction = true;
        Ok(())
    }

    fn execute(&mut self, statement: &Statement) -> Result<(), StoreError> {
        if !self.in_transaction {
            return Err(StoreError::NoTransaction);
        }
        let rendered = SqliteDialect.render(statement);
        self.conn.execute(
            &rendered.sql,
            params_from_iter(rendered.params.iter().map(to_value)),
        )?;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        if !self.in_transaction {
            return Err(StoreError::NoTransaction);
        }
        self.conn.execute_batch("COMMIT")?;
        self.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        if !self.in_transaction {
            return Err(StoreError::NoTransaction);
        }
        self.in_transaction = false;
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

impl Drop for SqliteConnection {
    fn drop(&mut self) {
        if self.in_transaction {
            if let Err(err) = self.conn.execute_batch("ROLLBACK") {
                warn!(error = %err, "rollback on connection drop failed");
            }
        }
    }
}

fn to_value(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(value) => Value::Integer(*value),
        SqlValue::Real(value) => Value::Real(*value),
        SqlValue::Text(value) => Value::Text(value.clone()),
    }
}

fn from_value_ref(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(value) => SqlValue::Integer(value),
        ValueRef::Real(value) => SqlValue::Real(value),
        ValueRef::Text(bytes) => SqlValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => SqlValue::Text(String::from_utf8_lossy(bytes).into_owned()),
    }
}
