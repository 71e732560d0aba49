//! Layered configuration for the loader.
//!
//! Configuration is loaded with precedence: CLI args > Env vars > Config file > Defaults
//!
//! # Example config file (partload.toml)
//! ```toml
//! partitions = 10
//! continue_on_schema_error = true
//! input = "yelp_academic_dataset_business.json"
//! database = "yelp.db"
//!
//! [tables]
//! category_prefix = "business_category_"
//! attribute_prefix = "business_attribute_"
//! ```
//!
//! Environment variables use the `PARTLOAD_` prefix with `__` between
//! nesting levels, e.g. `PARTLOAD_TABLES__ENTITY_TABLE=venue`.

mod defaults;

pub use defaults::*;

use crate::error::LoadError;
use crate::partition::Partitioner;
use crate::schema::ColumnType;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for a load run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Number of partition tables per key space. Must be positive.
    pub partitions: i64,
    /// Keep going after a failed schema phase.
    pub continue_on_schema_error: bool,
    /// Generate and load attribute value tables.
    pub load_attributes: bool,
    /// Build statements on the rayon pool.
    pub parallel_build: bool,
    /// JSON-lines input file
    pub input: Option<PathBuf>,
    /// SQLite database file
    pub database: Option<PathBuf>,
    /// Table and column naming
    pub tables: TableNaming,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            partitions: DEFAULT_PARTITION_COUNT as i64,
            continue_on_schema_error: DEFAULT_CONTINUE_ON_SCHEMA_ERROR,
            load_attributes: DEFAULT_LOAD_ATTRIBUTES,
            parallel_build: DEFAULT_PARALLEL_BUILD,
            input: None,
            database: None,
            tables: TableNaming::default(),
        }
    }
}

impl LoaderConfig {
    /// Load configuration with precedence: CLI args > Env > File > Defaults
    pub fn load(config_path: Option<&str>, overrides: ConfigOverrides) -> Result<Self, LoadError> {
        let mut figment = Figment::new().merge(Serialized::defaults(LoaderConfig::default()));

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        figment = figment.merge(Serialized::defaults(overrides));

        figment
            .extract()
            .map_err(|err| LoadError::Config(err.to_string()))
    }

    /// Load from environment and optional config file only (no CLI overrides)
    pub fn from_env(config_path: Option<&str>) -> Result<Self, LoadError> {
        Self::load(config_path, ConfigOverrides::default())
    }

    /// Validate into the settings the pipeline runs with.
    pub fn pipeline_config(&self) -> Result<PipelineConfig, LoadError> {
        Ok(PipelineConfig {
            partitioner: Partitioner::from_signed(self.partitions)?,
            continue_on_schema_error: self.continue_on_schema_error,
            load_attributes: self.load_attributes,
            parallel_build: self.parallel_build,
            tables: self.tables.clone(),
        })
    }
}

/// Validated pipeline settings.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub partitioner: Partitioner,
    pub continue_on_schema_error: bool,
    pub load_attributes: bool,
    pub parallel_build: bool,
    pub tables: TableNaming,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            partitioner: Partitioner::default(),
            continue_on_schema_error: DEFAULT_CONTINUE_ON_SCHEMA_ERROR,
            load_attributes: DEFAULT_LOAD_ATTRIBUTES,
            parallel_build: DEFAULT_PARALLEL_BUILD,
            tables: TableNaming::default(),
        }
    }
}

impl PipelineConfig {
    pub fn with_partitioner(mut self, partitioner: Partitioner) -> Self {
        self.partitioner = partitioner;
        self
    }

    pub fn continue_on_schema_error(mut self, enabled: bool) -> Self {
        self.continue_on_schema_error = enabled;
        self
    }

    pub fn load_attributes(mut self, enabled: bool) -> Self {
        self.load_attributes = enabled;
        self
    }

    pub fn parallel_build(mut self, enabled: bool) -> Self {
        self.parallel_build = enabled;
        self
    }
}

/// Core entity column after the identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityColumn {
    pub name: String,
    pub ty: ColumnType,
}

/// Table and column names used by generated schema and inserts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableNaming {
    pub category_prefix: String,
    pub attribute_prefix: String,
    pub id_column: String,
    pub entity_table: String,
    pub hours_table: String,
    pub entity_columns: Vec<EntityColumn>,
}

impl Default for TableNaming {
    fn default() -> Self {
        Self {
            category_prefix: DEFAULT_CATEGORY_PREFIX.to_string(),
            attribute_prefix: DEFAULT_ATTRIBUTE_PREFIX.to_string(),
            id_column: DEFAULT_ID_COLUMN.to_string(),
            entity_table: DEFAULT_ENTITY_TABLE.to_string(),
            hours_table: DEFAULT_HOURS_TABLE.to_string(),
            entity_columns: default_entity_columns()
                .into_iter()
                .map(|(name, ty)| EntityColumn {
                    name: name.to_string(),
                    ty,
                })
                .collect(),
        }
    }
}

/// CLI overrides that take precedence over file and env config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partitions: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continue_on_schema_error: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<PathBuf>,
}

impl ConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.partitions.is_none()
            && self.continue_on_schema_error.is_none()
            && self.input.is_none()
            && self.database.is_none()
    }
}
