//! # Key Discovery
//!
//! Scans the full corpus once and produces the distinct category and
//! attribute keys. Both sets must be complete before any table is created,
//! since partition membership depends on the global key universe.

use crate::model::{Record, ValueKind};
use indexmap::map::Entry;
use indexmap::{IndexMap, IndexSet};
use tracing::debug;

/// Distinct keys in first-seen order, each with the metadata recorded when
/// the key was first observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySet<M> {
    keys: IndexMap<String, M>,
    dropped: Vec<String>,
}

/// Distinct category names.
pub type CategoryKeys = KeySet<()>;

/// Distinct attribute names with their first-seen value kind.
pub type AttributeKeys = KeySet<ValueKind>;

impl<M> KeySet<M> {
    fn new() -> Self {
        Self {
            keys: IndexMap::new(),
            dropped: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&M> {
        self.keys.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &M)> {
        self.keys.iter().map(|(key, meta)| (key.as_str(), meta))
    }

    /// Keys excluded from partitioning, in first-seen order.
    pub fn dropped(&self) -> &[String] {
        &self.dropped
    }
}

/// Union of all category tags across the corpus.
pub fn collect_category_keys<'a, I>(records: I) -> CategoryKeys
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut set = CategoryKeys::new();
    for record in records {
        for category in &record.categories {
            if !set.keys.contains_key(category) {
                set.keys.insert(category.clone(), ());
            }
        }
    }
    set
}

/// Distinct attribute keys with the kind of their first supported occurrence.
///
/// Nested or otherwise unsupported values are ignored when kinds are
/// recorded. A key with no supported occurrence anywhere in the corpus is
/// dropped and never reaches partitioning.
pub fn collect_attribute_keys<'a, I>(records: I) -> AttributeKeys
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut first_seen: IndexMap<&'a str, ValueKind> = IndexMap::new();
    let mut unsupported: IndexSet<&'a str> = IndexSet::new();
    for record in records {
        for attribute in &record.attributes {
            let kind = attribute.kind();
            if !kind.is_supported() {
                unsupported.insert(attribute.key.as_str());
                continue;
            }
            match first_seen.entry(attribute.key.as_str()) {
                Entry::Occupied(existing) => {
                    if *existing.get() != kind {
                        debug!(
                            key = %attribute.key,
                            first = %existing.get(),
                            ignored = %kind,
                            record = %record.id,
                            "attribute kind differs from first occurrence"
                        );
                    }
                }
                Entry::Vacant(slot) => {
                    slot.insert(kind);
                }
            }
        }
    }

    let mut set = AttributeKeys::new();
    for (key, kind) in first_seen {
        set.keys.insert(key.to_string(), kind);
    }
    for key in unsupported {
        if !set.keys.contains_key(key) {
            debug!(key, "dropping attribute with unsupported value type");
            set.dropped.push(key.to_string());
        }
    }
    set
}
