//! Roles, membership records and request actors.
//!
//! # Invariants
//! - Roles are totally ordered: `member < admin < owner`.
//! - `owner` exists only at workspace level and only for the creator.

use crate::model::entity::{MemberScope, UserId};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Membership role, ascending privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Member,
    Admin,
    Owner,
}

impl Role {
    /// Stable storage value.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Admin => "admin",
            Self::Owner => "owner",
        }
    }

    /// Parses a stored role value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "member" => Some(Self::Member),
            "admin" => Some(Self::Admin),
            "owner" => Some(Self::Owner),
            _ => None,
        }
    }

    /// Returns whether this role may be held at the given scope.
    pub fn allowed_at(self, scope: MemberScope) -> bool {
        match scope {
            MemberScope::Workspace(_) => true,
            MemberScope::Board(_) => self != Self::Owner,
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `(user, role)` record attached to a workspace or board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Membership {
    pub scope: MemberScope,
    pub user: UserId,
    pub role: Role,
    /// Epoch ms when the record was created.
    pub joined_at: i64,
}

/// Authenticated caller as resolved by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Actor {
    pub user: UserId,
    pub is_super_admin: bool,
}

impl Actor {
    pub fn user(user: UserId) -> Self {
        Self {
            user,
            is_super_admin: false,
        }
    }

    pub fn super_admin(user: UserId) -> Self {
        Self {
            user,
            is_super_admin: true,
        }
    }
}

/// Side effects of one membership removal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberRemoval {
    /// Board records removed because the user left the owning workspace.
    pub board_memberships: usize,
    /// Task assignments dropped because the user lost board access.
    pub task_assignments: usize,
}
