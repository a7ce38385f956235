//! Terra ACL
//!
//! Access control over the world.
//!
//! Responsibilities:
//! - Model ACLs (everyone / creator / team / entity / role grants)
//! - Describe the spatial domain an event acts in
//! - Build read-only [`AccessChecker`]s from protection, restoration and
//!   actor data read during one attempt

mod action;
mod checker;
mod components;
mod geometry;
mod model;

pub use action::{AclAction, ItemAction, ALLOWED_TEMPORARY_ACTIONS, ALWAYS_ALLOWED_ITEM_ACTIONS};
pub use checker::{AccessCheckRequest, AccessChecker, CheckOptions, Item};
pub use components::{
    AclComponent, PlayerCurrentTeam, Position, Protection, Restoration, RestoreToState, RestoresTo,
    Size, UserRoles,
};
pub use geometry::{Aabb, AclDomain, Vec3};
pub use model::{action_allowed, Acl, ActionSet, Actor};
