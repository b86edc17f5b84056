//! Domain model for the workspace → board → list → task hierarchy.
//!
//! # Responsibility
//! - Define canonical records shared by repositories and services.
//! - Keep identity, membership and ordering concepts explicit in types.
//!
//! # Invariants
//! - A child never outlives its parent; deletion is a hard cascade.
//! - Membership exists only on workspaces and boards.

pub mod entity;
pub mod hierarchy;
pub mod membership;
