//! # Partload
//!
//! Loads semi-structured business records into a relational store whose
//! sparse keys (categories and attributes) are spread over a fixed number of
//! hash-partitioned wide tables.
//!
//! A run scans the whole corpus for keys, assigns each key to a partition
//! with FNV-1a, generates one table per non-empty partition, and then loads
//! presence flags, attribute values and the core entity rows in separate
//! transactions.

pub mod config;
pub mod error;
pub mod hash;
pub mod keyset;
pub mod model;
pub mod normalize;
pub mod partition;
pub mod persistence;
pub mod pipeline;
pub mod schema;
pub mod source;
pub mod statement;
pub mod store;

// Re-export main types for convenience
pub use config::{ConfigOverrides, LoaderConfig, PipelineConfig, TableNaming};
pub use error::{LoadError, StoreError};
pub use model::{AttributeValue, Record, ScalarValue, TimeWindow, ValueKind};
pub use partition::{PartitionMap, Partitioner};
pub use persistence::SqliteStore;
pub use pipeline::{LoadPipeline, LoadPlan, LoadReport, PipelineState, SchemaOutcome};
pub use schema::{SchemaGenerator, TableDefinition};
pub use statement::{AnsiDialect, SqlDialect, SqliteDialect, Statement};
pub use store::{FailurePoint, MemoryStore, StoreConnection, StoreConnector};
