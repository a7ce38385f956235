//! Resolved specifications: what a handler actually receives.

use std::collections::{BTreeMap, HashMap, VecDeque};
use terra_acl::AccessChecker;
use terra_core::{CoreError, CoreResult, EntityId, EntityPatch};
use terra_query::{
    satisfy_query, EntitySource, IndexResolver, Involved, InvolvedSpec, PrepareSpec, Query,
    QueryMatch,
};

use crate::error::{EventError, EventResult};
use crate::queried::QueriedEntity;

/// Fresh ids allocated up front for one transaction.
#[derive(Debug, Clone, Default)]
pub struct IdPool {
    ids: VecDeque<EntityId>,
}

impl IdPool {
    pub fn new(ids: Vec<EntityId>) -> Self {
        Self { ids: ids.into() }
    }

    pub fn take(&mut self, count: usize) -> CoreResult<Vec<EntityId>> {
        if count > self.ids.len() {
            return Err(CoreError::id_underflow(count, self.ids.len()));
        }
        Ok(self.ids.drain(..count).collect())
    }

    pub fn remaining(&self) -> usize {
        self.ids.len()
    }
}

/// One resolved entry.
#[derive(Debug, Clone)]
pub enum Resolved {
    Entity(QueriedEntity),
    Entities(Vec<QueriedEntity>),
    /// An optional query that matched nothing.
    Missing(Option<EntityId>),
    NewId(EntityId),
    NewIds(Vec<EntityId>),
    Checker(AccessChecker),
}

/// Named results of a resolved specification.
#[derive(Debug, Clone, Default)]
pub struct ResolvedEntities {
    entries: BTreeMap<String, Resolved>,
}

/// First-pass results handed to `prepare`. Read-only by construction.
pub type PreparedEntities = ResolvedEntities;

/// Final results handed to `apply`.
pub type InvolvedEntities = ResolvedEntities;

fn resolve_query(
    name: &str,
    query: &Query,
    source: &dyn EntitySource,
    resolver: &dyn IndexResolver,
) -> EventResult<Resolved> {
    let fetch = |id: EntityId| {
        source
            .entity(id)
            .cloned()
            .map(QueriedEntity::new)
            .ok_or_else(|| EventError::invariant(format!("{id} matched but was not fetched")))
    };
    match satisfy_query(source, resolver, query) {
        QueryMatch::Single(id) => Ok(Resolved::Entity(fetch(id)?)),
        QueryMatch::Many(ids) => Ok(Resolved::Entities(
            ids.into_iter().map(fetch).collect::<EventResult<_>>()?,
        )),
        QueryMatch::Missing(id) => Ok(Resolved::Missing(id)),
        QueryMatch::Unsatisfied => Err(EventError::unsatisfied(name, query)),
    }
}

impl ResolvedEntities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the first-pass specification.
    pub fn resolve_prepare(
        spec: &PrepareSpec,
        source: &dyn EntitySource,
        resolver: &dyn IndexResolver,
    ) -> EventResult<Self> {
        let mut entries = BTreeMap::new();
        for (name, query) in spec.iter() {
            entries.insert(name.to_string(), resolve_query(name, query, source, resolver)?);
        }
        Ok(Self { entries })
    }

    /// Resolve the final specification, drawing fresh ids from `ids` and
    /// checkers from `checkers` (keyed by entry name).
    pub fn resolve_involved(
        spec: &InvolvedSpec,
        source: &dyn EntitySource,
        resolver: &dyn IndexResolver,
        ids: &mut IdPool,
        checkers: &HashMap<String, AccessChecker>,
    ) -> EventResult<Self> {
        let mut entries = BTreeMap::new();
        for (name, involved) in spec.iter() {
            let resolved = match involved {
                Involved::Id(id) => resolve_query(name, &Query::from(*id), source, resolver)?,
                Involved::Query(query) => resolve_query(name, query, source, resolver)?,
                Involved::NewId => {
                    let mut taken = ids.take(1)?;
                    Resolved::NewId(taken.remove(0))
                }
                Involved::NewIds(count) => Resolved::NewIds(ids.take(*count)?),
                Involved::AclCheck(_) => Resolved::Checker(
                    checkers.get(name).cloned().ok_or_else(|| {
                        EventError::invariant(format!("no access checker built for '{name}'"))
                    })?,
                ),
            };
            entries.insert(name.to_string(), resolved);
        }
        Ok(Self { entries })
    }

    pub fn insert(&mut self, name: impl Into<String>, resolved: Resolved) {
        self.entries.insert(name.into(), resolved);
    }

    pub fn get(&self, name: &str) -> Option<&Resolved> {
        self.entries.get(name)
    }

    fn entry(&self, name: &str) -> EventResult<&Resolved> {
        self.entries.get(name).ok_or_else(|| EventError::unknown_entry(name))
    }

    fn entry_mut(&mut self, name: &str) -> EventResult<&mut Resolved> {
        self.entries.get_mut(name).ok_or_else(|| EventError::unknown_entry(name))
    }

    pub fn entity(&self, name: &str) -> EventResult<&QueriedEntity> {
        match self.entry(name)? {
            Resolved::Entity(e) => Ok(e),
            _ => Err(EventError::wrong_entry(name, "a single entity")),
        }
    }

    pub fn entity_mut(&mut self, name: &str) -> EventResult<&mut QueriedEntity> {
        match self.entry_mut(name)? {
            Resolved::Entity(e) => Ok(e),
            _ => Err(EventError::wrong_entry(name, "a single entity")),
        }
    }

    pub fn optional(&self, name: &str) -> EventResult<Option<&QueriedEntity>> {
        match self.entry(name)? {
            Resolved::Entity(e) => Ok(Some(e)),
            Resolved::Missing(_) => Ok(None),
            _ => Err(EventError::wrong_entry(name, "an optional entity")),
        }
    }

    pub fn optional_mut(&mut self, name: &str) -> EventResult<Option<&mut QueriedEntity>> {
        match self.entry_mut(name)? {
            Resolved::Entity(e) => Ok(Some(e)),
            Resolved::Missing(_) => Ok(None),
            _ => Err(EventError::wrong_entry(name, "an optional entity")),
        }
    }

    pub fn entities(&self, name: &str) -> EventResult<&[QueriedEntity]> {
        match self.entry(name)? {
            Resolved::Entities(list) => Ok(list),
            _ => Err(EventError::wrong_entry(name, "an entity list")),
        }
    }

    pub fn entities_mut(&mut self, name: &str) -> EventResult<&mut [QueriedEntity]> {
        match self.entry_mut(name)? {
            Resolved::Entities(list) => Ok(list),
            _ => Err(EventError::wrong_entry(name, "an entity list")),
        }
    }

    pub fn new_id(&self, name: &str) -> EventResult<EntityId> {
        match self.entry(name)? {
            Resolved::NewId(id) => Ok(*id),
            _ => Err(EventError::wrong_entry(name, "a new id")),
        }
    }

    pub fn new_ids(&self, name: &str) -> EventResult<&[EntityId]> {
        match self.entry(name)? {
            Resolved::NewIds(ids) => Ok(ids),
            _ => Err(EventError::wrong_entry(name, "a new id list")),
        }
    }

    pub fn checker(&self, name: &str) -> EventResult<&AccessChecker> {
        match self.entry(name)? {
            Resolved::Checker(c) => Ok(c),
            _ => Err(EventError::wrong_entry(name, "an access checker")),
        }
    }

    /// Every fresh id reserved by this specification.
    pub fn reserved_ids(&self) -> Vec<EntityId> {
        self.entries
            .values()
            .flat_map(|r| match r {
                Resolved::NewId(id) => vec![*id],
                Resolved::NewIds(ids) => ids.clone(),
                _ => Vec::new(),
            })
            .collect()
    }

    /// Non-empty patches staged on queried entities, in entry order.
    pub fn into_patches(self) -> Vec<EntityPatch> {
        self.entries
            .into_values()
            .flat_map(|r| match r {
                Resolved::Entity(e) => vec![e],
                Resolved::Entities(list) => list,
                _ => Vec::new(),
            })
            .filter(|e| e.is_dirty())
            .map(QueriedEntity::into_patch)
            .collect()
    }
}
