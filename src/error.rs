//! # Errors
//!
//! Typed failures for the load pipeline and the store adapters.
//!
//! Schema failures and data failures are separate variants because the
//! pipeline treats them differently: a schema failure may be recovered,
//! a data failure always aborts the run.

use std::io;

use thiserror::Error;

/// Errors raised by a store backend while executing statements.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("injected failure: {0}")]
    Injected(String),
    #[error("table '{0}' does not exist")]
    MissingTable(String),
    #[error("table '{0}' already exists")]
    TableExists(String),
    #[error("table '{table}' has no column '{column}'")]
    UnknownColumn { table: String, column: String },
    #[error("duplicate primary key '{key}' in table '{table}'")]
    DuplicateKey { table: String, key: String },
    #[error("no transaction is active")]
    NoTransaction,
    #[error("a transaction is already active")]
    TransactionActive,
}

/// Errors surfaced by planning and loading.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Reserved for hash inputs that cannot be encoded. Not reachable from
    /// `&str` inputs.
    #[error("invalid hash input: {0}")]
    HashInput(String),
    #[error("partition count must be positive, got {0}")]
    InvalidPartitionCount(i64),
    #[error("schema phase failed on '{table}': {source}")]
    SchemaExecution {
        table: String,
        #[source]
        source: StoreError,
    },
    #[error("{phase} phase failed for record '{record}': {source}")]
    DataExecution {
        phase: &'static str,
        record: String,
        #[source]
        source: StoreError,
    },
    #[error("failed to parse record on line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("configuration error: {0}")]
    Config(String),
}

impl LoadError {
    /// True for failures that abort a run regardless of configuration.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, LoadError::SchemaExecution { .. })
    }
}
