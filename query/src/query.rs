//! Query specifications.

use std::fmt;
use terra_core::{EntityId, IndexKey};

/// What a query selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryTarget {
    Id(EntityId),
    Ids(Vec<EntityId>),
    ByKey(IndexKey),
    ByKeys(Vec<IndexKey>),
}

impl QueryTarget {
    /// True for list targets, which resolve to zero or more entities.
    pub fn is_plural(&self) -> bool {
        matches!(self, QueryTarget::Ids(_) | QueryTarget::ByKeys(_))
    }
}

/// An entity selector with its modifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub target: QueryTarget,
    /// Also match frozen ("iced") entities.
    pub include_frozen: bool,
    /// A single-target query that misses resolves to "missing" instead of
    /// failing the event.
    pub optional: bool,
    /// Components a match must carry.
    pub components: Vec<String>,
}

impl Query {
    pub fn new(target: QueryTarget) -> Self {
        Self {
            target,
            include_frozen: false,
            optional: false,
            components: Vec::new(),
        }
    }

    /// Require these components on every match.
    pub fn with<I, S>(mut self, components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.components.extend(components.into_iter().map(Into::into));
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn include_frozen(mut self) -> Self {
        self.include_frozen = true;
        self
    }
}

impl From<EntityId> for Query {
    fn from(id: EntityId) -> Self {
        Query::new(QueryTarget::Id(id))
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            QueryTarget::Id(id) => write!(f, "{id}")?,
            QueryTarget::Ids(ids) => write!(f, "{} ids", ids.len())?,
            QueryTarget::ByKey(key) => write!(f, "{key}")?,
            QueryTarget::ByKeys(keys) => write!(f, "{} keys", keys.len())?,
        }
        if !self.components.is_empty() {
            write!(f, " with {}", self.components.join(","))?;
        }
        Ok(())
    }
}

/// Query builder shortcuts.
pub mod q {
    use super::{Query, QueryTarget};
    use terra_core::{EntityId, IndexKey};

    pub fn id(id: impl Into<EntityId>) -> Query {
        Query::new(QueryTarget::Id(id.into()))
    }

    pub fn ids<I, T>(ids: I) -> Query
    where
        I: IntoIterator<Item = T>,
        T: Into<EntityId>,
    {
        Query::new(QueryTarget::Ids(ids.into_iter().map(Into::into).collect()))
    }

    pub fn by_key(index: impl Into<String>, key: impl Into<String>) -> Query {
        Query::new(QueryTarget::ByKey(IndexKey::new(index, key)))
    }

    pub fn by_keys<I, S>(index: &str, keys: I) -> Query
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Query::new(QueryTarget::ByKeys(
            keys.into_iter().map(|k| IndexKey::new(index, k)).collect(),
        ))
    }

    pub fn optional(id: impl Into<EntityId>) -> Query {
        self::id(id).optional()
    }

    pub fn include_frozen(id: impl Into<EntityId>) -> Query {
        self::id(id).include_frozen()
    }
}
