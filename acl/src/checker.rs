//! Derived access checkers.
//!
//! An [`AccessChecker`] is built once per attempt from entities read in that
//! attempt. It is never persisted and never version-checked; a retry builds a
//! new one from fresh reads.

use serde::{Deserialize, Serialize};
use terra_core::{Component, CoreResult, Entity, EntityId};
use tracing::warn;

use crate::action::{AclAction, ItemAction, ALLOWED_TEMPORARY_ACTIONS};
use crate::components::{
    AclComponent, PlayerCurrentTeam, Position, Protection, Restoration, RestoreToState, RestoresTo,
    Size, UserRoles,
};
use crate::geometry::{Aabb, AclDomain, Vec3};
use crate::model::{Acl, Actor};

/// Request for an access checker: who is acting, and where.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessCheckRequest {
    pub domain: AclDomain,
    pub user_id: EntityId,
}

impl AccessCheckRequest {
    pub fn new(domain: AclDomain, user_id: EntityId) -> Self {
        Self { domain, user_id }
    }
}

/// An item being used, as far as ACLs care.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Item {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifetime: Option<f64>,
}

/// Optional narrowing for a single check.
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckOptions<'a> {
    /// Only consider protections covering one of these points.
    pub at_points: Option<&'a [Vec3]>,
    /// The entity acted upon; its own ACL takes precedence.
    pub entity: Option<&'a Entity>,
}

impl<'a> CheckOptions<'a> {
    pub fn at(points: &'a [Vec3]) -> Self {
        Self {
            at_points: Some(points),
            entity: None,
        }
    }

    pub fn on(entity: &'a Entity) -> Self {
        Self {
            at_points: None,
            entity: Some(entity),
        }
    }
}

#[derive(Debug, Clone)]
struct ProtectedRegion {
    id: EntityId,
    aabb: Aabb,
    acl: Acl,
    timestamp: f64,
}

#[derive(Debug, Clone)]
struct RestorationField {
    id: EntityId,
    acl: Acl,
    delay_s: f64,
    timestamp: f64,
}

/// Read-only answers to "may this actor do this here".
#[derive(Debug, Clone)]
pub struct AccessChecker {
    domain: AclDomain,
    actor: Actor,
    /// Protections overlapping the domain, earliest first.
    protections: Vec<ProtectedRegion>,
    /// Restoration fields overlapping the domain, earliest first.
    restorations: Vec<RestorationField>,
}

impl AccessChecker {
    /// Build a checker from the actor entity and candidate region entities.
    ///
    /// Candidates that lack the region components or lie outside the domain
    /// are ignored.
    pub fn build(
        request: &AccessCheckRequest,
        actor: Option<&Entity>,
        candidates: &[Entity],
    ) -> CoreResult<Self> {
        let mut resolved = Actor::new(request.user_id);
        if let Some(entity) = actor {
            resolved.team_id = entity.get::<PlayerCurrentTeam>()?.map(|t| t.team_id);
            resolved.roles = entity.get::<UserRoles>()?.map(|r| r.roles).unwrap_or_default();
        }

        let mut protections = Vec::new();
        let mut restorations = Vec::new();
        for entity in candidates {
            let Some(view) = entity.narrow(&[AclComponent::NAME, Position::NAME, Size::NAME]) else {
                continue;
            };
            let aabb = Aabb::from_position_size(view.get::<Position>()?.v, view.get::<Size>()?.v);
            if !request.domain.overlaps(&aabb) {
                continue;
            }
            let acl = view.get::<AclComponent>()?.acl;
            if let Some(protection) = entity.get::<Protection>()? {
                protections.push(ProtectedRegion {
                    id: entity.id,
                    aabb,
                    acl: acl.clone(),
                    timestamp: protection.timestamp.unwrap_or(0.0),
                });
            }
            if let Some(restoration) = entity.get::<Restoration>()? {
                restorations.push(RestorationField {
                    id: entity.id,
                    acl,
                    delay_s: restoration.restore_delay_s,
                    timestamp: restoration.timestamp.unwrap_or(0.0),
                });
            }
        }
        protections.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        restorations.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp).then(a.id.cmp(&b.id)));

        Ok(Self {
            domain: request.domain.clone(),
            actor: resolved,
            protections,
            restorations,
        })
    }

    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    /// May the actor perform `action`?
    pub fn can(&self, action: AclAction, options: CheckOptions<'_>) -> bool {
        if let Some(entity) = options.entity {
            if let Some(verdict) = self.entity_verdict(entity, action) {
                return verdict;
            }
        }

        // Only the earliest protection in the domain governs; the points
        // then decide whether it covers this check at all.
        let mut governing = self.protections.first();
        if let Some(points) = options.at_points {
            if !self.domain.contains_points(points) {
                warn!(
                    user = %self.actor.user_id,
                    %action,
                    "check points outside the checked domain"
                );
                return false;
            }
            governing = governing.filter(|p| points.iter().any(|pt| p.aabb.contains(*pt)));
        }

        match governing {
            Some(region) => region.acl.allows(action, &self.actor),
            None => Acl::open_land().allows(action, &self.actor),
        }
    }

    /// May the actor use `item`?
    pub fn can_perform_item_action(&self, item: &Item, options: CheckOptions<'_>) -> bool {
        match ItemAction::classify(item.action.as_deref(), item.lifetime.is_some()) {
            ItemAction::Free => true,
            ItemAction::Checked(action) => self.can(action, options),
        }
    }

    /// Seconds until an edit made with `action` reverts, if it would.
    ///
    /// Only the earliest restoration field in the domain is consulted.
    pub fn restore_time_secs(&self, action: AclAction) -> Option<f64> {
        self.restorations
            .first()
            .filter(|field| !field.acl.allows(action, &self.actor))
            .map(|field| field.delay_s)
    }

    // Entity-level rules decide on their own when they apply.
    fn entity_verdict(&self, entity: &Entity, action: AclAction) -> Option<bool> {
        let restores_to = entity.get::<RestoresTo>().unwrap_or_else(|e| {
            warn!(entity = %entity.id, error = %e, "malformed restores_to");
            None
        });
        if restores_to.is_some_and(|r| r.restore_to_state == RestoreToState::Deleted)
            && ALLOWED_TEMPORARY_ACTIONS.contains(&action)
        {
            return Some(true);
        }
        match entity.get::<AclComponent>() {
            Ok(Some(component)) => Some(component.acl.allows(action, &self.actor)),
            Ok(None) => None,
            Err(e) => {
                warn!(entity = %entity.id, error = %e, "malformed acl_component, denying");
                Some(false)
            }
        }
    }
}
