//! Service-level error taxonomy.
//!
//! # Invariants
//! - Every error maps to exactly one stable [`ErrorKind`]; callers branch on
//!   the kind, never on the message.

use crate::model::entity::{
    AttachmentId, BoardId, CommentId, EntityRef, MemberScope, UserId, WorkspaceId,
};
use crate::model::membership::Role;
use crate::repo::StoreError;
use crate::scope::ScopeKey;
use crate::service::access::Action;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type used by service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Stable error category exposed to transport layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    AlreadyMember,
    NotAMember,
    ParentMembershipRequired,
    InvalidInput,
    Internal,
}

impl ErrorKind {
    /// Stable snake_case code.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Forbidden => "forbidden",
            Self::AlreadyMember => "already_member",
            Self::NotAMember => "not_a_member",
            Self::ParentMembershipRequired => "parent_membership_required",
            Self::InvalidInput => "invalid_input",
            Self::Internal => "internal",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from board service operations.
#[derive(Debug)]
pub enum ServiceError {
    /// Entity or one of its ancestors does not exist.
    NotFound(EntityRef),
    /// Comment does not exist on the addressed task.
    CommentNotFound(CommentId),
    /// Attachment does not exist on the addressed task.
    AttachmentNotFound(AttachmentId),
    /// Entity exists but the actor lacks the required role.
    Forbidden {
        user: UserId,
        entity: EntityRef,
        action: Action,
    },
    AlreadyMember { scope: MemberScope, user: UserId },
    NotAMember { scope: MemberScope, user: UserId },
    /// Board membership requires workspace membership first.
    ParentMembershipRequired {
        board: BoardId,
        workspace: WorkspaceId,
        user: UserId,
    },
    /// Name-like field is blank after trim.
    BlankField(&'static str),
    /// Name-like field exceeds the configured limit.
    FieldTooLong { field: &'static str, max_chars: usize },
    /// Board background is not a `#rrggbb` colour.
    InvalidBackground(String),
    /// Attachment size is negative.
    InvalidAttachmentSize(i64),
    /// Role cannot be held at this scope through the registry.
    InvalidRole { scope: MemberScope, role: Role },
    /// The workspace owner record cannot be changed or removed.
    OwnerMembershipLocked { workspace: WorkspaceId, user: UserId },
    /// Assignee must be a member of the task's board.
    AssigneeNotMember { board: BoardId, user: UserId },
    /// Only workspaces and boards carry membership.
    UnsupportedMembershipTarget(EntityRef),
    /// Action was evaluated against an entity above its gating level.
    ActionTargetMismatch { action: Action, entity: EntityRef },
    /// Caller did not hold the exclusive scope a component mutates.
    ScopeNotHeld(ScopeKey),
    /// Parent of the entity kept changing while its scope was taken.
    ScopeUnstable(EntityRef),
    /// Repository-level failure.
    Store(StoreError),
}

impl ServiceError {
    /// Stable category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) | Self::CommentNotFound(_) | Self::AttachmentNotFound(_) => {
                ErrorKind::NotFound
            }
            Self::Forbidden { .. } | Self::OwnerMembershipLocked { .. } => ErrorKind::Forbidden,
            Self::AlreadyMember { .. } => ErrorKind::AlreadyMember,
            Self::NotAMember { .. } => ErrorKind::NotAMember,
            Self::ParentMembershipRequired { .. } => ErrorKind::ParentMembershipRequired,
            Self::BlankField(_)
            | Self::FieldTooLong { .. }
            | Self::InvalidBackground(_)
            | Self::InvalidAttachmentSize(_)
            | Self::InvalidRole { .. }
            | Self::AssigneeNotMember { .. }
            | Self::UnsupportedMembershipTarget(_) => ErrorKind::InvalidInput,
            Self::ActionTargetMismatch { .. }
            | Self::ScopeNotHeld(_)
            | Self::ScopeUnstable(_)
            | Self::Store(_) => ErrorKind::Internal,
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(entity) => write!(f, "{entity} not found"),
            Self::CommentNotFound(id) => write!(f, "comment {id} not found"),
            Self::AttachmentNotFound(id) => write!(f, "attachment {id} not found"),
            Self::Forbidden {
                user,
                entity,
                action,
            } => write!(f, "user {user} may not {action} on {entity}"),
            Self::AlreadyMember { scope, user } => {
                write!(f, "user {user} is already a member of {scope}")
            }
            Self::NotAMember { scope, user } => write!(f, "user {user} is not a member of {scope}"),
            Self::ParentMembershipRequired {
                board,
                workspace,
                user,
            } => write!(
                f,
                "user {user} must join workspace {workspace} before board {board}"
            ),
            Self::BlankField(field) => write!(f, "{field} must not be blank"),
            Self::FieldTooLong { field, max_chars } => {
                write!(f, "{field} must be at most {max_chars} characters")
            }
            Self::InvalidBackground(value) => {
                write!(f, "background `{value}` is not a #rrggbb colour")
            }
            Self::InvalidAttachmentSize(size) => {
                write!(f, "attachment size must not be negative, got {size}")
            }
            Self::InvalidRole { scope, role } => write!(f, "role {role} is not assignable on {scope}"),
            Self::OwnerMembershipLocked { workspace, user } => write!(
                f,
                "owner {user} of workspace {workspace} cannot be changed or removed"
            ),
            Self::AssigneeNotMember { board, user } => {
                write!(f, "user {user} is not a member of board {board}")
            }
            Self::UnsupportedMembershipTarget(entity) => {
                write!(f, "{entity} does not carry membership")
            }
            Self::ActionTargetMismatch { action, entity } => {
                write!(f, "action {action} cannot be evaluated on {entity}")
            }
            Self::ScopeNotHeld(key) => write!(f, "scope {key} is not held by the caller"),
            Self::ScopeUnstable(entity) => {
                write!(f, "parent of {entity} kept changing while taking its scope")
            }
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound(entity) => Self::NotFound(entity),
            other => Self::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorKind, ServiceError};
    use crate::model::entity::EntityRef;
    use crate::repo::StoreError;
    use uuid::Uuid;

    #[test]
    fn store_not_found_maps_to_service_not_found() {
        let entity = EntityRef::List(Uuid::new_v4());
        let err = ServiceError::from(StoreError::NotFound(entity));
        assert!(matches!(err, ServiceError::NotFound(found) if found == entity));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn consistency_failures_are_internal() {
        let err = ServiceError::from(StoreError::ConsistencyCheck {
            check: "task_without_list",
            violations: 2,
        });
        assert_eq!(err.kind().as_str(), "internal");
        assert!(err.to_string().contains("task_without_list"));
    }
}
