//! # Record Source
//!
//! Reads business records from JSON lines, one object per line.
//!
//! ```json
//! {"business_id": "b1", "name": "Cafe", "open": true,
//!  "categories": ["Cafes"], "attributes": {"Wi-Fi": "free"},
//!  "hours": {"Monday": {"open": "08:00", "close": "17:00"}}}
//! ```
//!
//! Scalar top-level fields become entity fields. Attribute keys are
//! lowercased and day labels uppercased. Nested values other than
//! `categories`, `attributes` and `hours` are ignored.

use crate::error::LoadError;
use crate::model::{AttributeEntry, AttributeValue, Record, ScalarValue, TimeWindow};
use indexmap::IndexMap;
use serde::de::Error as _;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct RawRecord {
    business_id: String,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    attributes: Map<String, Value>,
    #[serde(default)]
    hours: IndexMap<String, RawWindow>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawWindow {
    open: String,
    close: String,
}

impl RawRecord {
    fn into_record(self) -> Record {
        let mut record = Record::new(self.business_id).with_categories(self.categories);

        for (name, value) in self.fields {
            match scalar(&value) {
                Some(scalar) => {
                    record.fields.insert(name, scalar);
                }
                None => debug!(record = %record.id, field = %name, "skipping nested field"),
            }
        }

        record.attributes = self
            .attributes
            .iter()
            .map(|(key, value)| {
                AttributeEntry::new(key.to_lowercase(), AttributeValue::from_json(value))
            })
            .collect();

        record.hours = self
            .hours
            .into_iter()
            .map(|(day, window)| TimeWindow::new(day.to_uppercase(), window.open, window.close))
            .collect();

        record
    }
}

fn scalar(value: &Value) -> Option<ScalarValue> {
    match value {
        Value::Null => Some(ScalarValue::Null),
        Value::Bool(flag) => Some(ScalarValue::Bool(*flag)),
        Value::Number(number) => match number.as_i64() {
            Some(integer) => Some(ScalarValue::Integer(integer)),
            None => number.as_f64().map(ScalarValue::Float),
        },
        Value::String(text) => Some(ScalarValue::Text(text.clone())),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Parse one JSON object into a record. A blank `business_id` is rejected.
pub fn parse_record(line: &str) -> Result<Record, serde_json::Error> {
    let raw: RawRecord = serde_json::from_str(line)?;
    if raw.business_id.trim().is_empty() {
        return Err(serde_json::Error::custom("business_id is empty"));
    }
    Ok(raw.into_record())
}

/// Parse every non-blank line of `reader`. Line numbers in errors are 1-based.
pub fn parse_records<R: Read>(reader: R) -> Result<Vec<Record>, LoadError> {
    let mut records = Vec::new();
    for (idx, line) in BufReader::new(reader).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = parse_record(&line).map_err(|err| LoadError::Parse {
            line: idx + 1,
            message: err.to_string(),
        })?;
        records.push(record);
    }
    Ok(records)
}

pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<Record>, LoadError> {
    let file = File::open(path.as_ref())?;
    let records = parse_records(file)?;
    debug!(path = %path.as_ref().display(), records = records.len(), "records read");
    Ok(records)
}
