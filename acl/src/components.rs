//! Components the access checker reads.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use terra_core::{Component, EntityId};

use crate::geometry::Vec3;
use crate::model::Acl;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AclComponent {
    pub acl: Acl,
}

impl Component for AclComponent {
    const NAME: &'static str = "acl_component";
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub v: Vec3,
}

impl Component for Position {
    const NAME: &'static str = "position";
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub v: Vec3,
}

impl Component for Size {
    const NAME: &'static str = "size";
}

/// Marks a protected region; earlier timestamps take precedence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Protection {
    #[serde(default)]
    pub timestamp: Option<f64>,
}

impl Component for Protection {
    const NAME: &'static str = "protection";
}

/// Marks a region whose unauthorized edits revert after a delay.
///
/// Like protections, the earliest restoration overlapping a domain governs it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Restoration {
    pub restore_delay_s: f64,
    #[serde(default)]
    pub timestamp: Option<f64>,
}

impl Component for Restoration {
    const NAME: &'static str = "restoration";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestoreToState {
    Created,
    Deleted,
}

/// Schedules an entity to revert to a prior state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestoresTo {
    pub trigger_at: f64,
    pub restore_to_state: RestoreToState,
}

impl Component for RestoresTo {
    const NAME: &'static str = "restores_to";
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerCurrentTeam {
    pub team_id: EntityId,
}

impl Component for PlayerCurrentTeam {
    const NAME: &'static str = "player_current_team";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRoles {
    pub roles: BTreeSet<String>,
}

impl Component for UserRoles {
    const NAME: &'static str = "user_roles";
}
