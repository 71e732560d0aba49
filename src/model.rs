//! # Data Model
//!
//! Records as they arrive from the source: a stable identifier, scalar
//! fields for the core entity row, repeated opening-hours windows, and the
//! sparse category/attribute keys that drive table partitioning.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Scalar value stored in a core entity column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Null => write!(f, "NULL"),
            ScalarValue::Bool(value) => write!(f, "{value}"),
            ScalarValue::Integer(value) => write!(f, "{value}"),
            ScalarValue::Float(value) => write!(f, "{value}"),
            ScalarValue::Text(value) => write!(f, "{value}"),
        }
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Bool(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Integer(value)
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::Float(value)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Text(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::Text(value)
    }
}

/// Inferred kind of an attribute value.
///
/// `Unsupported` covers nested objects, arrays and anything else that
/// cannot be flattened into one column. It never produces a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Boolean,
    String,
    Integer,
    Unsupported,
}

impl ValueKind {
    pub fn is_supported(self) -> bool {
        !matches!(self, ValueKind::Unsupported)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ValueKind::Boolean => "boolean",
            ValueKind::String => "string",
            ValueKind::Integer => "integer",
            ValueKind::Unsupported => "unsupported",
        };
        f.write_str(label)
    }
}

/// Value carried by one attribute entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeValue {
    Bool(bool),
    Integer(i64),
    Text(String),
    /// Raw JSON text of a value with no column mapping.
    Unsupported(String),
}

impl AttributeValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            AttributeValue::Bool(_) => ValueKind::Boolean,
            AttributeValue::Integer(_) => ValueKind::Integer,
            AttributeValue::Text(_) => ValueKind::String,
            AttributeValue::Unsupported(_) => ValueKind::Unsupported,
        }
    }

    /// Classify a JSON value. Floats and nulls fall into `Unsupported`
    /// along with objects and arrays.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Bool(flag) => AttributeValue::Bool(*flag),
            serde_json::Value::String(text) => AttributeValue::Text(text.clone()),
            serde_json::Value::Number(number) => match number.as_i64() {
                Some(integer) => AttributeValue::Integer(integer),
                None => AttributeValue::Unsupported(number.to_string()),
            },
            other => AttributeValue::Unsupported(other.to_string()),
        }
    }
}

/// One key/value attribute on a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeEntry {
    pub key: String,
    pub value: AttributeValue,
}

impl AttributeEntry {
    pub fn new(key: impl Into<String>, value: AttributeValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    pub fn kind(&self) -> ValueKind {
        self.value.kind()
    }
}

/// One opening-hours window, inserted as a subordinate row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Uppercased day label, e.g. `MONDAY`.
    pub day: String,
    pub open: String,
    pub close: String,
}

impl TimeWindow {
    pub fn new(day: impl Into<String>, open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            day: day.into(),
            open: open.into(),
            close: close.into(),
        }
    }
}

/// A single input record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    pub fields: BTreeMap<String, ScalarValue>,
    pub hours: Vec<TimeWindow>,
    pub categories: IndexSet<String>,
    pub attributes: Vec<AttributeEntry>,
}

impl Record {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.categories.insert(category.into());
        self
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories.extend(categories.into_iter().map(Into::into));
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: AttributeValue) -> Self {
        self.attributes.push(AttributeEntry::new(key, value));
        self
    }

    pub fn with_hours(mut self, window: TimeWindow) -> Self {
        self.hours.push(window);
        self
    }

    /// Scalar field by name, `Null` when absent.
    pub fn field(&self, name: &str) -> &ScalarValue {
        static NULL: ScalarValue = ScalarValue::Null;
        self.fields.get(name).unwrap_or(&NULL)
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} categories, {} attributes, {} hours)",
            self.id,
            self.categories.len(),
            self.attributes.len(),
            self.hours.len()
        )
    }
}
