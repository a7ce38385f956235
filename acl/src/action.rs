//! ACL actions and item actions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An action governed by ACLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AclAction {
    #[serde(rename = "shape")]
    Shape,
    #[serde(rename = "place")]
    Place,
    #[serde(rename = "destroy")]
    Destroy,
    #[serde(rename = "interact")]
    Interact,
    #[serde(rename = "administrate")]
    Administrate,
    #[serde(rename = "createGroup")]
    CreateGroup,
    #[serde(rename = "dump")]
    Dump,
    #[serde(rename = "placeCampsite")]
    PlaceCampsite,
    #[serde(rename = "tillSoil")]
    TillSoil,
    #[serde(rename = "plantSeed")]
    PlantSeed,
    #[serde(rename = "pvp")]
    Pvp,
    #[serde(rename = "warp_from")]
    WarpFrom,
    #[serde(rename = "apply_buffs")]
    ApplyBuffs,
    #[serde(rename = "placeRobot")]
    PlaceRobot,
    #[serde(rename = "placeEphemeral")]
    PlaceEphemeral,
    #[serde(rename = "demuckerWand")]
    DemuckerWand,
}

impl AclAction {
    pub const ALL: [AclAction; 16] = [
        AclAction::Shape,
        AclAction::Place,
        AclAction::Destroy,
        AclAction::Interact,
        AclAction::Administrate,
        AclAction::CreateGroup,
        AclAction::Dump,
        AclAction::PlaceCampsite,
        AclAction::TillSoil,
        AclAction::PlantSeed,
        AclAction::Pvp,
        AclAction::WarpFrom,
        AclAction::ApplyBuffs,
        AclAction::PlaceRobot,
        AclAction::PlaceEphemeral,
        AclAction::DemuckerWand,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AclAction::Shape => "shape",
            AclAction::Place => "place",
            AclAction::Destroy => "destroy",
            AclAction::Interact => "interact",
            AclAction::Administrate => "administrate",
            AclAction::CreateGroup => "createGroup",
            AclAction::Dump => "dump",
            AclAction::PlaceCampsite => "placeCampsite",
            AclAction::TillSoil => "tillSoil",
            AclAction::PlantSeed => "plantSeed",
            AclAction::Pvp => "pvp",
            AclAction::WarpFrom => "warp_from",
            AclAction::ApplyBuffs => "apply_buffs",
            AclAction::PlaceRobot => "placeRobot",
            AclAction::PlaceEphemeral => "placeEphemeral",
            AclAction::DemuckerWand => "demuckerWand",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| a.name() == name)
    }
}

impl fmt::Display for AclAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Actions allowed on anything that is going to be restored away anyway.
pub const ALLOWED_TEMPORARY_ACTIONS: [AclAction; 3] =
    [AclAction::Destroy, AclAction::Shape, AclAction::TillSoil];

/// Item actions that never need an ACL grant.
pub const ALWAYS_ALLOWED_ITEM_ACTIONS: [&str; 6] =
    ["fish", "eat", "drink", "photo", "warpHome", "placeEphemeral"];

/// What using an item amounts to, in ACL terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemAction {
    /// Never checked.
    Free,
    /// Checked against this ACL action.
    Checked(AclAction),
}

impl ItemAction {
    /// Classify a raw item action name.
    ///
    /// Missing actions count as `destroy`; `place` on an item with a lifetime
    /// counts as `placeEphemeral`. Names that are not ACL actions are free.
    pub fn classify(action: Option<&str>, has_lifetime: bool) -> Self {
        let mut name = action.unwrap_or("destroy");
        if name == "place" && has_lifetime {
            name = "placeEphemeral";
        }
        if ALWAYS_ALLOWED_ITEM_ACTIONS.contains(&name) {
            return ItemAction::Free;
        }
        match AclAction::from_name(name) {
            Some(action) => ItemAction::Checked(action),
            None => ItemAction::Free,
        }
    }
}
