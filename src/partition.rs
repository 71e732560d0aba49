//! # Key Partitioning
//!
//! Deterministic assignment of an open-ended set of string keys to a fixed
//! number of buckets. Each bucket becomes one wide table, which bounds the
//! column count of every generated table.
//!
//! The same [`Partitioner`] value is used to build the schema and to route
//! every insert, so a key always lands in the table that owns its column.

use crate::config::DEFAULT_PARTITION_COUNT;
use crate::error::LoadError;
use crate::hash::fnv1a_str;

/// Maps keys to bucket indexes in `0..count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partitioner {
    count: usize,
}

impl Partitioner {
    /// Create a partitioner with `count` buckets.
    pub fn new(count: usize) -> Result<Self, LoadError> {
        if count == 0 {
            return Err(LoadError::InvalidPartitionCount(0));
        }
        Ok(Self { count })
    }

    /// Validate a signed count, as read from configuration.
    pub fn from_signed(count: i64) -> Result<Self, LoadError> {
        if count <= 0 {
            return Err(LoadError::InvalidPartitionCount(count));
        }
        let count = usize::try_from(count).map_err(|_| LoadError::InvalidPartitionCount(count))?;
        Self::new(count)
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Bucket for a key. Hashes the raw key bytes, not the column name.
    #[inline]
    pub fn assign(&self, key: &str) -> usize {
        (fnv1a_str(key) % self.count as u64) as usize
    }

    /// Group keys by bucket in a single pass.
    ///
    /// Keys keep their input order within a bucket. The result always has
    /// exactly `count` partitions, empty ones included. Duplicate input keys
    /// are kept; callers pass deduplicated key sets.
    pub fn partition_all<I, K>(&self, keys: I) -> PartitionMap
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let mut partitions: Vec<Partition> = (0..self.count).map(Partition::empty).collect();
        for key in keys {
            let key = key.as_ref();
            partitions[self.assign(key)].keys.push(key.to_string());
        }
        PartitionMap { partitions }
    }
}

impl Default for Partitioner {
    fn default() -> Self {
        Self {
            count: DEFAULT_PARTITION_COUNT,
        }
    }
}

/// One bucket and the keys hashed into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub index: usize,
    pub keys: Vec<String>,
}

impl Partition {
    fn empty(index: usize) -> Self {
        Self {
            index,
            keys: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }
}

/// All buckets produced by one [`Partitioner::partition_all`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionMap {
    partitions: Vec<Partition>,
}

impl PartitionMap {
    /// Number of buckets, including empty ones.
    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key_count() == 0
    }

    pub fn get(&self, index: usize) -> Option<&Partition> {
        self.partitions.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Partition> {
        self.partitions.iter()
    }

    /// Buckets that hold at least one key.
    pub fn non_empty(&self) -> impl Iterator<Item = &Partition> {
        self.partitions.iter().filter(|partition| !partition.is_empty())
    }

    pub fn key_count(&self) -> usize {
        self.partitions.iter().map(Partition::len).sum()
    }

    /// Bucket holding `key`, if the key was partitioned.
    pub fn partition_of(&self, key: &str) -> Option<usize> {
        self.partitions
            .iter()
            .find(|partition| partition.keys.iter().any(|candidate| candidate == key))
            .map(|partition| partition.index)
    }
}
