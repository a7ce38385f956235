//! Terra Core Types
//!
//! This crate provides the foundational types used throughout Terra:
//! - Identity types (EntityId, IndexKey) and the per-entity Version
//! - Components (named, optional field groups) and the Component trait
//! - Entities, narrowed entity views and entity patches
//! - The Change-To-Apply wire contract (iffs + changes)
//! - The immutable engine configuration
//! - Common error types

mod change;
mod component;
mod config;
mod entity;
mod error;
mod id;

pub use change::*;
pub use component::*;
pub use config::*;
pub use entity::*;
pub use error::*;
pub use id::*;
