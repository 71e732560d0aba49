//! # Schema Generation
//!
//! Builds structured [`TableDefinition`]s from partitioned key sets. Nothing
//! here knows any SQL dialect; rendering lives in [`crate::statement`].
//!
//! Each non-empty partition becomes one table named `<prefix><index + 1>`.
//! Column names come from [`crate::normalize`], and every definition keeps
//! the key to column mapping so inserts resolve columns the same way.

use crate::config::TableNaming;
use crate::keyset::AttributeKeys;
use crate::model::ValueKind;
use crate::normalize::column_name;
use crate::partition::{Partition, PartitionMap};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// Width of the record identifier column.
pub const ID_COLUMN_WIDTH: u32 = 45;

/// Logical column types. Dialects map these to concrete SQL types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Text { max_len: Option<u32> },
    SmallInt,
    BigInt,
    Real,
}

/// Literal value used for column defaults and bound parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl SqlValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("NULL"),
            SqlValue::Integer(value) => write!(f, "{value}"),
            SqlValue::Real(value) => write!(f, "{value}"),
            SqlValue::Text(value) => write!(f, "'{}'", value.replace('\'', "''")),
        }
    }
}

/// One column of a generated table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ColumnType,
    pub nullable: bool,
    pub default: Option<SqlValue>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: true,
            default: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_default(mut self, value: SqlValue) -> Self {
        self.default = Some(value);
        self
    }

    /// Presence flag column: small integer, nullable, default 0.
    pub fn presence_flag(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::SmallInt).with_default(SqlValue::Integer(0))
    }
}

/// How a table is created during the schema phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateMode {
    /// Drop any existing table, then create. Used for partition tables.
    Replace,
    /// Create only when missing. Used for the core entity tables.
    IfMissing,
}

/// A realized table schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableDefinition {
    pub name: String,
    /// Partition index the table was built from, if any.
    pub partition: Option<usize>,
    pub id_column: ColumnDef,
    /// Whether the identifier column is the primary key.
    pub primary_key: bool,
    pub columns: Vec<ColumnDef>,
    pub mode: CreateMode,
    /// Raw key to column name, for partition tables.
    #[serde(skip)]
    pub key_columns: IndexMap<String, String>,
}

impl TableDefinition {
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        if self.id_column.name == name {
            return Some(&self.id_column);
        }
        self.columns.iter().find(|column| column.name == name)
    }

    /// Column that stores `key`, if the key belongs to this table.
    pub fn column_for_key(&self, key: &str) -> Option<&str> {
        self.key_columns.get(key).map(String::as_str)
    }
}

/// Produces table definitions for one naming scheme.
#[derive(Debug, Clone)]
pub struct SchemaGenerator {
    naming: TableNaming,
}

impl SchemaGenerator {
    pub fn new(naming: TableNaming) -> Self {
        Self { naming }
    }

    pub fn naming(&self) -> &TableNaming {
        &self.naming
    }

    pub fn category_table_name(&self, partition: usize) -> String {
        format!("{}{}", self.naming.category_prefix, partition + 1)
    }

    pub fn attribute_table_name(&self, partition: usize) -> String {
        format!("{}{}", self.naming.attribute_prefix, partition + 1)
    }

    fn id_column(&self) -> ColumnDef {
        ColumnDef::new(
            self.naming.id_column.clone(),
            ColumnType::Text {
                max_len: Some(ID_COLUMN_WIDTH),
            },
        )
        .not_null()
    }

    /// One presence-flag table per non-empty category partition.
    pub fn build_category_tables(&self, partitions: &PartitionMap) -> Vec<TableDefinition> {
        partitions
            .non_empty()
            .filter_map(|partition| {
                self.build_partition_table(
                    self.category_table_name(partition.index),
                    partition,
                    |_| |name: String| ColumnDef::presence_flag(name),
                )
            })
            .collect()
    }

    /// One value table per non-empty attribute partition, with columns typed
    /// by each key's first-seen kind.
    pub fn build_attribute_tables(
        &self,
        partitions: &PartitionMap,
        keys: &AttributeKeys,
    ) -> Vec<TableDefinition> {
        partitions
            .non_empty()
            .filter_map(|partition| {
                self.build_partition_table(
                    self.attribute_table_name(partition.index),
                    partition,
                    |key| {
                        let ty = match keys.get(key) {
                            Some(ValueKind::Boolean) => ColumnType::SmallInt,
                            Some(ValueKind::Integer) => ColumnType::BigInt,
                            _ => ColumnType::Text { max_len: None },
                        };
                        move |name: String| ColumnDef::new(name, ty)
                    },
                )
            })
            .collect()
    }

    /// Core entity table and its subordinate hours table.
    pub fn build_entity_tables(&self) -> Vec<TableDefinition> {
        let entity_columns = self
            .naming
            .entity_columns
            .iter()
            .map(|column| ColumnDef::new(column.name.clone(), column.ty))
            .collect();
        let hours_columns = ["day", "close", "open"]
            .into_iter()
            .map(|name| ColumnDef::new(name, ColumnType::Text { max_len: Some(16) }).not_null())
            .collect();

        vec![
            TableDefinition {
                name: self.naming.hours_table.clone(),
                partition: None,
                id_column: self.id_column(),
                primary_key: false,
                columns: hours_columns,
                mode: CreateMode::IfMissing,
                key_columns: IndexMap::new(),
            },
            TableDefinition {
                name: self.naming.entity_table.clone(),
                partition: None,
                id_column: self.id_column(),
                primary_key: true,
                columns: entity_columns,
                mode: CreateMode::IfMissing,
                key_columns: IndexMap::new(),
            },
        ]
    }

    fn build_partition_table<F, C>(
        &self,
        name: String,
        partition: &Partition,
        column_for: F,
    ) -> Option<TableDefinition>
    where
        F: Fn(&str) -> C,
        C: FnOnce(String) -> ColumnDef,
    {
        let mut columns: Vec<ColumnDef> = Vec::with_capacity(partition.len());
        let mut key_columns = IndexMap::with_capacity(partition.len());
        for key in &partition.keys {
            let Some(column) = column_name(key) else {
                warn!(table = %name, key = %key, "key normalizes to an empty column name; skipped");
                continue;
            };
            if column == self.naming.id_column {
                warn!(table = %name, key = %key, "key collides with the identifier column; skipped");
                continue;
            }
            if columns.iter().any(|existing| existing.name == column) {
                warn!(
                    table = %name,
                    key = %key,
                    column = %column,
                    "keys normalize to the same column; sharing it"
                );
            } else {
                columns.push(column_for(key)(column.clone()));
            }
            key_columns.insert(key.clone(), column);
        }

        if columns.is_empty() {
            return None;
        }
        Some(TableDefinition {
            name,
            partition: Some(partition.index),
            id_column: self.id_column(),
            primary_key: true,
            columns,
            mode: CreateMode::Replace,
            key_columns,
        })
    }
}

impl Default for SchemaGenerator {
    fn default() -> Self {
        Self::new(TableNaming::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyset::collect_attribute_keys;
    use crate::model::{AttributeValue, Record};
    use crate::partition::Partitioner;

    #[test]
    fn category_tables_cover_non_empty_partitions() {
        let partitioner = Partitioner::default();
        let map = partitioner.partition_all(["bars", "nightlife", "italian"]);
        let tables = SchemaGenerator::default().build_category_tables(&map);

        assert_eq!(tables.len(), 3);
        let names: Vec<_> = tables.iter().map(|table| table.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["business_category_6", "business_category_8", "business_category_10"]
        );
        for table in &tables {
            assert_eq!(table.id_column.name, "business_id");
            assert!(!table.id_column.nullable);
            assert_eq!(table.mode, CreateMode::Replace);
            for column in &table.columns {
                assert_eq!(column.ty, ColumnType::SmallInt);
                assert!(column.nullable);
                assert_eq!(column.default, Some(SqlValue::Integer(0)));
            }
        }
    }

    #[test]
    fn every_key_has_a_column_in_its_partition_table() {
        let keys: Vec<String> = (0..60).map(|idx| format!("Category {idx} & Co")).collect();
        let partitioner = Partitioner::new(7).unwrap();
        let map = partitioner.partition_all(&keys);
        let generator = SchemaGenerator::default();
        let tables = generator.build_category_tables(&map);

        for key in &keys {
            let index = partitioner.assign(key);
            let table = tables
                .iter()
                .find(|table| table.partition == Some(index))
                .expect("table for partition");
            assert_eq!(table.name, generator.category_table_name(index));
            let column = table.column_for_key(key).expect("column for key");
            assert!(table.column(column).is_some());
        }
    }

    #[test]
    fn attribute_columns_follow_first_seen_kind() {
        let records = vec![
            Record::new("1").with_attribute("good_for_kids", AttributeValue::Bool(true)),
            Record::new("2")
                .with_attribute("price_range", AttributeValue::Text("expensive".into())),
            Record::new("3").with_attribute("seats", AttributeValue::Integer(40)),
        ];
        let keys = collect_attribute_keys(&records);
        let map = Partitioner::default().partition_all(keys.keys());
        let tables = SchemaGenerator::default().build_attribute_tables(&map, &keys);

        let column = |name: &str| {
            tables
                .iter()
                .find_map(|table| table.column(name))
                .cloned()
                .expect("column")
        };
        assert_eq!(column("good_for_kids").ty, ColumnType::SmallInt);
        assert_eq!(column("price_range").ty, ColumnType::Text { max_len: None });
        assert_eq!(column("seats").ty, ColumnType::BigInt);
        assert!(tables
            .iter()
            .all(|table| table.name.starts_with("business_attribute_")));
    }

    #[test]
    fn colliding_keys_share_one_column() {
        let partitioner = Partitioner::new(1).unwrap();
        let map = partitioner.partition_all(["Bars & Pubs", "bars and pubs", "()"]);
        let tables = SchemaGenerator::default().build_category_tables(&map);

        assert_eq!(tables.len(), 1);
        let table = &tables[0];
        assert_eq!(table.columns.len(), 1);
        assert_eq!(table.column_for_key("Bars & Pubs"), Some("bars_and_pubs"));
        assert_eq!(table.column_for_key("bars and pubs"), Some("bars_and_pubs"));
        assert_eq!(table.column_for_key("()"), None);
    }

    #[test]
    fn entity_tables_are_created_if_missing() {
        let tables = SchemaGenerator::default().build_entity_tables();
        let names: Vec<_> = tables.iter().map(|table| table.name.as_str()).collect();
        assert_eq!(names, vec!["business_hour", "business"]);
        assert!(tables.iter().all(|table| table.mode == CreateMode::IfMissing));
        let entity = &tables[1];
        assert!(entity.column("review_count").is_some());
        assert!(entity.column("open").is_some());
        assert!(entity.primary_key);
        assert!(!tables[0].primary_key);
    }
}
