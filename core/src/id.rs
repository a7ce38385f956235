//! Identity and versioning types for Terra entities.
//!
//! All identifiers are 64-bit values that are:
//! - Unique across the whole world, never reused once allocated
//! - Immutable once assigned
//! - Opaque to handlers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for an entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub u64);

impl EntityId {
    /// Create a new EntityId from a raw value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        EntityId(id)
    }
}

/// Per-entity commit counter, the optimistic-concurrency token.
///
/// Every committed change to an entity increments its version by exactly one.
/// An id that has never been written reads as [`Version::ABSENT`]; a deleted
/// entity keeps its last version so that a later create is still ordered.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Version(pub u64);

impl Version {
    /// Version of an id that has never been committed.
    pub const ABSENT: Version = Version(0);

    pub fn new(version: u64) -> Self {
        Self(version)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }

    /// The version after one more committed change.
    pub fn next(self) -> Self {
        Version(self.0 + 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// A secondary-index lookup key: the index name and the key within it.
///
/// Resolution goes through an external index resolver that may legitimately
/// answer "unresolved"; a key never stands in for an id in a fetch batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexKey {
    /// Name of the secondary index (e.g. `"label"`).
    pub index: String,
    /// Key within the index.
    pub key: String,
}

impl IndexKey {
    pub fn new(index: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[by-key {} {}]", self.index, self.key)
    }
}
