//! Matching fetched entities against queries.

use std::collections::HashMap;
use terra_core::{Entity, EntityId};

use crate::query::{Query, QueryTarget};
use crate::resolve::IndexResolver;

/// Fetched entities for one attempt.
pub trait EntitySource {
    fn entity(&self, id: EntityId) -> Option<&Entity>;
}

impl EntitySource for HashMap<EntityId, Entity> {
    fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.get(&id)
    }
}

/// How a query was satisfied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryMatch {
    /// A single-target query matched this entity.
    Single(EntityId),
    /// A list query; the entities that matched, in query order.
    Many(Vec<EntityId>),
    /// An optional single-target query matched nothing. Carries the id it
    /// would have been, when known.
    Missing(Option<EntityId>),
    /// A required single-target query matched nothing.
    Unsatisfied,
}

fn satisfy_single(source: &dyn EntitySource, query: &Query, id: EntityId) -> Option<EntityId> {
    let entity = source.entity(id)?;
    if entity.is_frozen() && !query.include_frozen {
        return None;
    }
    if !entity.has_all(&query.components) {
        return None;
    }
    Some(entity.id)
}

/// Match one query against fetched entities.
pub fn satisfy_query(
    source: &dyn EntitySource,
    resolver: &dyn IndexResolver,
    query: &Query,
) -> QueryMatch {
    let single = |id: Option<EntityId>| match id.and_then(|id| satisfy_single(source, query, id)) {
        Some(found) => QueryMatch::Single(found),
        None if query.optional => QueryMatch::Missing(id),
        None => QueryMatch::Unsatisfied,
    };
    match &query.target {
        QueryTarget::Id(id) => single(Some(*id)),
        QueryTarget::ByKey(key) => single(resolver.resolve(key)),
        QueryTarget::Ids(ids) => QueryMatch::Many(
            ids.iter()
                .filter_map(|id| satisfy_single(source, query, *id))
                .collect(),
        ),
        QueryTarget::ByKeys(keys) => QueryMatch::Many(
            keys.iter()
                .filter_map(|key| resolver.resolve(key))
                .filter_map(|id| satisfy_single(source, query, id))
                .collect(),
        ),
    }
}
