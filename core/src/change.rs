//! The Change-To-Apply wire contract.
//!
//! A [`ChangeToApply`] is the atomic unit submitted to a world store:
//! a list of [`Iff`] preconditions and a list of proposed changes. Its JSON
//! shape is `{ "iffs": [[id, version, ...components]], "changes": [{kind, entity}] }`
//! and is shared with out-of-band tooling that submits pre-built transactions
//! directly to the store, so field names and layouts here are stable.

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::component::ComponentValue;
use crate::entity::{Entity, EntityPatch};
use crate::id::{EntityId, Version};

/// Logical time of a committed batch in a store.
pub type Tick = u64;

/// A per-entity precondition checked atomically at commit.
///
/// The batch holding this iff is rejected unless the entity is currently at
/// exactly `version` and currently has every listed component. An iff
/// without a version (`[id]` on the wire) only requires that the entity
/// currently exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Iff {
    pub id: EntityId,
    pub version: Option<Version>,
    pub components: Vec<String>,
}

impl Iff {
    pub fn new(id: EntityId, version: Version, components: Vec<String>) -> Self {
        Self {
            id,
            version: Some(version),
            components,
        }
    }

    /// Require only that `id` currently exists.
    pub fn exists(id: EntityId) -> Self {
        Self {
            id,
            version: None,
            components: Vec::new(),
        }
    }

    /// Check the precondition against the current state of the entity.
    pub fn holds(&self, current_version: Version, current: Option<&Entity>) -> bool {
        match self.version {
            Some(version) if version != current_version => return false,
            None if current.is_none() => return false,
            _ => {}
        }
        match current {
            Some(entity) => entity.has_all(&self.components),
            None => self.components.is_empty(),
        }
    }
}

impl Serialize for Iff {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.version.is_none() && self.components.is_empty() {
            let mut seq = serializer.serialize_seq(Some(1))?;
            seq.serialize_element(&self.id)?;
            return seq.end();
        }
        let mut seq = serializer.serialize_seq(Some(2 + self.components.len()))?;
        seq.serialize_element(&self.id)?;
        seq.serialize_element(&self.version)?;
        for name in &self.components {
            seq.serialize_element(name)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Iff {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IffVisitor;

        impl<'de> Visitor<'de> for IffVisitor {
            type Value = Iff;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an array [id, version?, ...componentNames]")
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Iff, A::Error> {
                let id: EntityId = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                // `[id]` and `[id, null, ...]` carry no version
                let version: Option<Version> = seq.next_element::<Option<Version>>()?.flatten();
                let mut components = Vec::new();
                while let Some(name) = seq.next_element::<String>()? {
                    components.push(name);
                }
                Ok(Iff {
                    id,
                    version,
                    components,
                })
            }
        }

        deserializer.deserialize_seq(IffVisitor)
    }
}

/// Id-only entity reference used by delete changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: EntityId,
}

/// A change proposed by a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProposedChange {
    /// Create (or replace) an entity with exactly these components.
    Create { entity: Entity },
    /// Patch an existing entity.
    Update { entity: EntityPatch },
    /// Remove an entity.
    Delete { entity: EntityRef },
}

impl ProposedChange {
    pub fn create(entity: Entity) -> Self {
        ProposedChange::Create { entity }
    }

    pub fn update(patch: EntityPatch) -> Self {
        ProposedChange::Update { entity: patch }
    }

    pub fn delete(id: EntityId) -> Self {
        ProposedChange::Delete {
            entity: EntityRef { id },
        }
    }

    /// Id of the entity this change touches.
    pub fn id(&self) -> EntityId {
        match self {
            ProposedChange::Create { entity } => entity.id,
            ProposedChange::Update { entity } => entity.id,
            ProposedChange::Delete { entity } => entity.id,
        }
    }
}

/// An at-most-once side-channel (analytics/firehose) event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FirehoseEvent {
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<EntityId>,
    #[serde(default)]
    pub payload: ComponentValue,
}

impl FirehoseEvent {
    pub fn new(
        kind: impl Into<String>,
        entity_id: Option<EntityId>,
        payload: ComponentValue,
    ) -> Self {
        Self {
            kind: kind.into(),
            entity_id,
            payload,
        }
    }
}

/// The atomic transactional unit submitted to the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeToApply {
    #[serde(default)]
    pub iffs: Vec<Iff>,
    #[serde(default)]
    pub changes: Vec<ProposedChange>,
    /// Side-channel events delivered after a successful commit.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<FirehoseEvent>,
}

impl ChangeToApply {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if nothing would be written.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Ids touched by the changes, in change order.
    pub fn touched_ids(&self) -> Vec<EntityId> {
        self.changes.iter().map(|c| c.id()).collect()
    }
}

/// Per-unit outcome of an apply call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyStatus {
    /// Every iff held and every change landed.
    Success,
    /// At least one iff failed; nothing landed.
    Conflict,
}

/// A committed change as observed by readers and subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Change {
    Create {
        tick: Tick,
        version: Version,
        entity: Entity,
    },
    Update {
        tick: Tick,
        version: Version,
        entity: EntityPatch,
    },
    Delete {
        tick: Tick,
        version: Version,
        id: EntityId,
    },
}

impl Change {
    pub fn id(&self) -> EntityId {
        match self {
            Change::Create { entity, .. } => entity.id,
            Change::Update { entity, .. } => entity.id,
            Change::Delete { id, .. } => *id,
        }
    }

    pub fn tick(&self) -> Tick {
        match self {
            Change::Create { tick, .. }
            | Change::Update { tick, .. }
            | Change::Delete { tick, .. } => *tick,
        }
    }

    pub fn version(&self) -> Version {
        match self {
            Change::Create { version, .. }
            | Change::Update { version, .. }
            | Change::Delete { version, .. } => *version,
        }
    }
}
