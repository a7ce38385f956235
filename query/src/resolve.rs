//! Expanding specifications into concrete ids.

use std::collections::{BTreeSet, HashMap};
use terra_core::{CoreError, EntityId, IndexKey};

use crate::error::{QueryError, QueryResult};
use crate::involved::{Involved, InvolvedSpec};
use crate::query::{Query, QueryTarget};

/// One thing to look up for a query: an id, or an index key to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Lookup {
    Id(EntityId),
    Key(IndexKey),
}

/// Answers secondary-index lookups. Unknown keys are `None`, never an error.
pub trait IndexResolver {
    fn resolve(&self, key: &IndexKey) -> Option<EntityId>;
}

/// Index answers fetched up front for one attempt.
#[derive(Debug, Clone, Default)]
pub struct IndexSnapshot {
    resolved: HashMap<IndexKey, EntityId>,
}

impl IndexSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair keys with the answers of a batch lookup.
    pub fn from_lookup(keys: &[IndexKey], answers: &[Option<EntityId>]) -> Self {
        let resolved = keys
            .iter()
            .zip(answers)
            .filter_map(|(key, id)| id.map(|id| (key.clone(), id)))
            .collect();
        Self { resolved }
    }

    pub fn insert(&mut self, key: IndexKey, id: EntityId) {
        self.resolved.insert(key, id);
    }
}

impl IndexResolver for IndexSnapshot {
    fn resolve(&self, key: &IndexKey) -> Option<EntityId> {
        self.resolved.get(key).copied()
    }
}

/// The lookups one query needs.
pub fn determine_ids(query: &Query) -> Vec<Lookup> {
    match &query.target {
        QueryTarget::Id(id) => vec![Lookup::Id(*id)],
        QueryTarget::Ids(ids) => ids.iter().copied().map(Lookup::Id).collect(),
        QueryTarget::ByKey(key) => vec![Lookup::Key(key.clone())],
        QueryTarget::ByKeys(keys) => keys.iter().cloned().map(Lookup::Key).collect(),
    }
}

/// Every distinct index key the queries mention, sorted.
pub fn index_keys<'a>(queries: impl IntoIterator<Item = &'a Query>) -> Vec<IndexKey> {
    let keys: BTreeSet<IndexKey> = queries
        .into_iter()
        .flat_map(determine_ids)
        .filter_map(|lookup| match lookup {
            Lookup::Key(key) => Some(key),
            Lookup::Id(_) => None,
        })
        .collect();
    keys.into_iter().collect()
}

/// Concrete ids to fetch for the queries, sorted and distinct.
///
/// Index keys that do not resolve are left out.
pub fn determine_ids_used<'a>(
    queries: impl IntoIterator<Item = &'a Query>,
    resolver: &dyn IndexResolver,
) -> Vec<EntityId> {
    let ids: BTreeSet<EntityId> = queries
        .into_iter()
        .flat_map(determine_ids)
        .filter_map(|lookup| match lookup {
            Lookup::Id(id) => Some(id),
            Lookup::Key(key) => resolver.resolve(&key),
        })
        .collect();
    ids.into_iter().collect()
}

/// Total fresh ids a specification asks for.
///
/// A single `NewIds` entry over `cap` is an invariant violation.
pub fn count_new_ids(spec: &InvolvedSpec, cap: usize) -> QueryResult<usize> {
    let mut total = 0;
    for (name, involved) in spec.iter() {
        match involved {
            Involved::NewId => total += 1,
            Involved::NewIds(count) if *count > cap => {
                return Err(QueryError::in_entry(name, CoreError::new_ids_over_cap(*count, cap)));
            }
            Involved::NewIds(count) => total += count,
            _ => {}
        }
    }
    Ok(total)
}
