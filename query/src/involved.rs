//! Involved and prepare specifications.
//!
//! An [`InvolvedSpec`] names everything one event will read or write. It is
//! the boundary of the transaction: `apply` only ever sees what is listed
//! here.

use std::collections::BTreeMap;
use terra_acl::{AccessCheckRequest, AclDomain};
use terra_core::EntityId;

use crate::query::Query;

/// One entry of an involved specification.
#[derive(Debug, Clone, PartialEq)]
pub enum Involved {
    /// A concrete id; must exist.
    Id(EntityId),
    Query(Query),
    /// One fresh id.
    NewId,
    /// `n` fresh ids.
    NewIds(usize),
    /// A derived access checker; never a mutation target.
    AclCheck(AccessCheckRequest),
}

impl Involved {
    pub fn new_id() -> Self {
        Involved::NewId
    }

    pub fn new_ids(count: usize) -> Self {
        Involved::NewIds(count)
    }

    pub fn acl_check(domain: AclDomain, user_id: EntityId) -> Self {
        Involved::AclCheck(AccessCheckRequest::new(domain, user_id))
    }

    /// The query this entry reads through, if it reads entities.
    pub fn as_query(&self) -> Option<Query> {
        match self {
            Involved::Id(id) => Some(Query::from(*id)),
            Involved::Query(q) => Some(q.clone()),
            _ => None,
        }
    }
}

impl From<Query> for Involved {
    fn from(query: Query) -> Self {
        Involved::Query(query)
    }
}

impl From<EntityId> for Involved {
    fn from(id: EntityId) -> Self {
        Involved::Id(id)
    }
}

impl From<AccessCheckRequest> for Involved {
    fn from(request: AccessCheckRequest) -> Self {
        Involved::AclCheck(request)
    }
}

/// The final, authoritative read/write set of one event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvolvedSpec {
    entries: BTreeMap<String, Involved>,
}

impl InvolvedSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, involved: impl Into<Involved>) -> Self {
        self.insert(name, involved);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, involved: impl Into<Involved>) {
        self.entries.insert(name.into(), involved.into());
    }

    pub fn get(&self, name: &str) -> Option<&Involved> {
        self.entries.get(name)
    }

    /// Entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Involved)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Entries that read entities, in name order.
    pub fn queries(&self) -> impl Iterator<Item = (&str, Query)> + '_ {
        self.iter().filter_map(|(k, v)| v.as_query().map(|q| (k, q)))
    }

    pub fn acl_checks(&self) -> impl Iterator<Item = (&str, &AccessCheckRequest)> {
        self.iter().filter_map(|(k, v)| match v {
            Involved::AclCheck(request) => Some((k, request)),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The read-only first-pass query set of one event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrepareSpec {
    entries: BTreeMap<String, Query>,
}

impl PrepareSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, query: impl Into<Query>) -> Self {
        self.entries.insert(name.into(), query.into());
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Query)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
