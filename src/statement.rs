//! # Statements and Dialects
//!
//! Structured DDL/DML produced by the pipeline, and the adapter that turns
//! them into SQL text for a particular store. Planning code only ever builds
//! [`Statement`] values; a [`SqlDialect`] is chosen by the store backend.

use crate::schema::{ColumnDef, ColumnType, CreateMode, SqlValue, TableDefinition};

/// One store operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    DropTable {
        table: String,
    },
    CreateTable {
        definition: TableDefinition,
        if_not_exists: bool,
    },
    Insert {
        table: String,
        columns: Vec<String>,
        values: Vec<SqlValue>,
    },
}

impl Statement {
    /// Statements that (re)create a table according to its [`CreateMode`].
    pub fn create(definition: &TableDefinition) -> Vec<Statement> {
        match definition.mode {
            CreateMode::Replace => vec![
                Statement::DropTable {
                    table: definition.name.clone(),
                },
                Statement::CreateTable {
                    definition: definition.clone(),
                    if_not_exists: false,
                },
            ],
            CreateMode::IfMissing => vec![Statement::CreateTable {
                definition: definition.clone(),
                if_not_exists: true,
            }],
        }
    }

    pub fn insert(table: impl Into<String>, columns: Vec<String>, values: Vec<SqlValue>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Statement::Insert {
            table: table.into(),
            columns,
            values,
        }
    }

    /// Table the statement touches.
    pub fn table(&self) -> &str {
        match self {
            Statement::DropTable { table } => table,
            Statement::CreateTable { definition, .. } => &definition.name,
            Statement::Insert { table, .. } => table,
        }
    }

    pub fn is_ddl(&self) -> bool {
        !matches!(self, Statement::Insert { .. })
    }
}

/// A statement tagged with what produced it (table or record id), used in
/// failure reports.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEntry {
    pub origin: String,
    pub statement: Statement,
}

/// Statements executed together inside one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadBatch {
    pub name: &'static str,
    pub entries: Vec<BatchEntry>,
}

impl LoadBatch {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, origin: impl Into<String>, statement: Statement) {
        self.entries.push(BatchEntry {
            origin: origin.into(),
            statement,
        });
    }

    pub fn extend_from(&mut self, origin: &str, statements: impl IntoIterator<Item = Statement>) {
        for statement in statements {
            self.push(origin, statement);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn statements(&self) -> impl Iterator<Item = &Statement> {
        self.entries.iter().map(|entry| &entry.statement)
    }
}

/// SQL text with positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSql {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// Renders statements for a target store.
pub trait SqlDialect: Send + Sync {
    fn column_type(&self, ty: ColumnType) -> String;

    fn quote_ident(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    fn placeholder(&self, _position: usize) -> String {
        "?".to_string()
    }

    fn column_sql(&self, column: &ColumnDef) -> String {
        let mut sql = format!(
            "{} {}",
            self.quote_ident(&column.name),
            self.column_type(column.ty)
        );
        sql.push_str(if column.nullable { " NULL" } else { " NOT NULL" });
        if let Some(default) = &column.default {
            sql.push_str(&format!(" DEFAULT {default}"));
        }
        sql
    }

    fn render(&self, statement: &Statement) -> RenderedSql {
        match statement {
            Statement::DropTable { table } => RenderedSql {
                sql: format!("DROP TABLE IF EXISTS {}", self.quote_ident(table)),
                params: Vec::new(),
            },
            Statement::CreateTable {
                definition,
                if_not_exists,
            } => {
                let mut parts = Vec::with_capacity(definition.columns.len() + 2);
                parts.push(self.column_sql(&definition.id_column));
                parts.extend(definition.columns.iter().map(|column| self.column_sql(column)));
                if definition.primary_key {
                    parts.push(format!(
                        "PRIMARY KEY ({})",
                        self.quote_ident(&definition.id_column.name)
                    ));
                }
                RenderedSql {
                    sql: format!(
                        "CREATE TABLE {}{} ({})",
                        if *if_not_exists { "IF NOT EXISTS " } else { "" },
                        self.quote_ident(&definition.name),
                        parts.join(", ")
                    ),
                    params: Vec::new(),
                }
            }
            Statement::Insert {
                table,
                columns,
                values,
            } => {
                let column_list = columns
                    .iter()
                    .map(|column| self.quote_ident(column))
                    .collect::<Vec<_>>()
                    .join(", ");
                let placeholders = (1..=values.len())
                    .map(|position| self.placeholder(position))
                    .collect::<Vec<_>>()
                    .join(", ");
                RenderedSql {
                    sql: format!(
                        "INSERT INTO {} ({}) VALUES ({})",
                        self.quote_ident(table),
                        column_list,
                        placeholders
                    ),
                    params: values.clone(),
                }
            }
        }
    }
}

/// SQLite type names.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqlDialect for SqliteDialect {
    fn column_type(&self, ty: ColumnType) -> String {
        match ty {
            ColumnType::Text { .. } => "TEXT".to_string(),
            ColumnType::SmallInt => "SMALLINT".to_string(),
            ColumnType::BigInt => "BIGINT".to_string(),
            ColumnType::Real => "REAL".to_string(),
        }
    }
}

/// Portable SQL close to what server databases accept, used for dry runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnsiDialect;

impl SqlDialect for AnsiDialect {
    fn column_type(&self, ty: ColumnType) -> String {
        match ty {
            ColumnType::Text { max_len: Some(len) } => format!("VARCHAR({len})"),
            ColumnType::Text { max_len: None } => "TEXT".to_string(),
            ColumnType::SmallInt => "SMALLINT".to_string(),
            ColumnType::BigInt => "BIGINT".to_string(),
            ColumnType::Real => "DOUBLE PRECISION".to_string(),
        }
    }
}
