//! Default constants for partload configuration.
//!
//! All magic numbers and names are centralized here.

use crate::schema::ColumnType;

// =============================================================================
// Partitioning Defaults
// =============================================================================

/// Number of wide tables each key space is split into.
pub const DEFAULT_PARTITION_COUNT: usize = 10;

// =============================================================================
// Pipeline Defaults
// =============================================================================

/// Schema-phase failures are logged and the data phase still runs.
pub const DEFAULT_CONTINUE_ON_SCHEMA_ERROR: bool = true;

/// Attribute value tables are generated and loaded.
pub const DEFAULT_LOAD_ATTRIBUTES: bool = true;

/// Statement building fans out over the rayon pool.
pub const DEFAULT_PARALLEL_BUILD: bool = true;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "PARTLOAD_";

// =============================================================================
// Table Naming Defaults
// =============================================================================

/// Prefix for category presence-flag tables (`business_category_1` ...).
pub const DEFAULT_CATEGORY_PREFIX: &str = "business_category_";

/// Prefix for attribute value tables (`business_attribute_1` ...).
pub const DEFAULT_ATTRIBUTE_PREFIX: &str = "business_attribute_";

/// Record identifier column shared by every table.
pub const DEFAULT_ID_COLUMN: &str = "business_id";

/// Core entity table.
pub const DEFAULT_ENTITY_TABLE: &str = "business";

/// Subordinate opening-hours table.
pub const DEFAULT_HOURS_TABLE: &str = "business_hour";

/// Core entity columns after the identifier, in insert order.
pub fn default_entity_columns() -> Vec<(&'static str, ColumnType)> {
    vec![
        ("name", ColumnType::Text { max_len: Some(255) }),
        ("full_address", ColumnType::Text { max_len: Some(512) }),
        ("city", ColumnType::Text { max_len: Some(128) }),
        ("state", ColumnType::Text { max_len: Some(16) }),
        ("latitude", ColumnType::Real),
        ("longitude", ColumnType::Real),
        ("stars", ColumnType::Real),
        ("review_count", ColumnType::BigInt),
        ("open", ColumnType::SmallInt),
    ]
}
