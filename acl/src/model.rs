//! ACL data model and evaluation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use terra_core::EntityId;

use crate::action::AclAction;

/// A set of granted actions.
pub type ActionSet = BTreeSet<AclAction>;

/// Grants attached to a protected region or a single entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Acl {
    /// Granted to anyone.
    pub everyone: ActionSet,
    /// Granted to the creating user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<(EntityId, ActionSet)>,
    /// Granted to members of the creating team.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator_team: Option<(EntityId, ActionSet)>,
    /// Granted to specific users.
    pub entities: BTreeMap<EntityId, ActionSet>,
    /// Granted to specific teams.
    pub teams: BTreeMap<EntityId, ActionSet>,
    /// Granted to holders of a special role.
    pub roles: BTreeMap<String, ActionSet>,
}

impl Acl {
    /// The ACL of unprotected land: anyone may do anything short of
    /// administration.
    pub fn open_land() -> Self {
        Self {
            everyone: AclAction::ALL
                .iter()
                .copied()
                .filter(|a| *a != AclAction::Administrate)
                .collect(),
            ..Self::default()
        }
    }

    pub fn everyone(actions: impl IntoIterator<Item = AclAction>) -> Self {
        Self {
            everyone: actions.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_creator(
        mut self,
        user: EntityId,
        actions: impl IntoIterator<Item = AclAction>,
    ) -> Self {
        self.creator = Some((user, actions.into_iter().collect()));
        self
    }

    pub fn with_team(
        mut self,
        team: EntityId,
        actions: impl IntoIterator<Item = AclAction>,
    ) -> Self {
        self.teams.insert(team, actions.into_iter().collect());
        self
    }

    pub fn with_role(
        mut self,
        role: impl Into<String>,
        actions: impl IntoIterator<Item = AclAction>,
    ) -> Self {
        self.roles.insert(role.into(), actions.into_iter().collect());
        self
    }

    /// Returns true if this single ACL grants `action` to `actor`.
    pub fn allows(&self, action: AclAction, actor: &Actor) -> bool {
        if self.everyone.contains(&action) {
            return true;
        }
        if let Some((creator, actions)) = &self.creator {
            if *creator == actor.user_id && actions.contains(&action) {
                return true;
            }
        }
        if self.entities.get(&actor.user_id).is_some_and(|a| a.contains(&action)) {
            return true;
        }
        if let Some(team) = actor.team_id {
            if let Some((creator_team, actions)) = &self.creator_team {
                if *creator_team == team && actions.contains(&action) {
                    return true;
                }
            }
            if self.teams.get(&team).is_some_and(|a| a.contains(&action)) {
                return true;
            }
        }
        self.roles
            .iter()
            .any(|(role, actions)| actions.contains(&action) && actor.has_role(role))
    }
}

/// Who is acting: a user, their current team and their special roles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Actor {
    pub user_id: EntityId,
    pub team_id: Option<EntityId>,
    pub roles: BTreeSet<String>,
}

impl Actor {
    pub fn new(user_id: EntityId) -> Self {
        Self {
            user_id,
            ..Self::default()
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }
}

/// Every ACL must allow the action.
pub fn action_allowed<'a>(
    acls: impl IntoIterator<Item = &'a Acl>,
    action: AclAction,
    actor: &Actor,
) -> bool {
    acls.into_iter().all(|acl| acl.allows(action, actor))
}
