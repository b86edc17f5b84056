//! Access control evaluation.
//!
//! # Responsibility
//! - Resolve a target's ancestor chain and the actor's direct role at the
//!   gating level of an action.
//! - Provide the single `authorize` entry point every service operation calls
//!   before mutating or reading.
//!
//! # Invariants
//! - Lists and tasks carry no membership; they are gated at their board.
//! - Board access requires a board record; workspace membership alone never
//!   grants board access.
//! - `NotFound` wins over `Forbidden`: a missing entity or ancestor is
//!   reported before any role check.
//! - Super admins pass every role gate on existing entities.

use crate::model::entity::{EntityPath, EntityRef, MemberScope};
use crate::model::membership::{Actor, Role};
use crate::repo::{HierarchyRepository, MembershipRepository};
use crate::service::error::{ServiceError, ServiceResult};
use log::{debug, warn};
use std::fmt::{Display, Formatter};

/// Level whose membership set gates an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateLevel {
    Workspace,
    Board,
}

/// Every operation the evaluator can gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ReadWorkspace,
    UpdateWorkspace,
    ManageWorkspaceMembers,
    DeleteWorkspace,
    CreateBoard,
    ReadBoard,
    UpdateBoard,
    ManageBoardMembers,
    DeleteBoard,
    CreateList,
    UpdateList,
    MoveList,
    DeleteList,
    CreateTask,
    UpdateTask,
    MoveTask,
    DeleteTask,
    AssignTask,
    CommentTask,
    DeleteComment,
    AttachToTask,
}

impl Action {
    /// Level whose membership decides this action.
    pub fn gate_level(self) -> GateLevel {
        match self {
            Self::ReadWorkspace
            | Self::UpdateWorkspace
            | Self::ManageWorkspaceMembers
            | Self::DeleteWorkspace
            | Self::CreateBoard => GateLevel::Workspace,
            _ => GateLevel::Board,
        }
    }

    /// Minimum direct role at the gate level.
    pub fn required_role(self) -> Role {
        match self {
            Self::ReadWorkspace
            | Self::CreateBoard
            | Self::ReadBoard
            | Self::CreateTask
            | Self::UpdateTask
            | Self::MoveTask
            | Self::AssignTask
            | Self::CommentTask
            | Self::DeleteComment
            | Self::AttachToTask => Role::Member,
            Self::UpdateWorkspace
            | Self::ManageWorkspaceMembers
            | Self::UpdateBoard
            | Self::ManageBoardMembers
            | Self::DeleteBoard
            | Self::CreateList
            | Self::UpdateList
            | Self::MoveList
            | Self::DeleteList
            | Self::DeleteTask => Role::Admin,
            Self::DeleteWorkspace => Role::Owner,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ReadWorkspace => "read_workspace",
            Self::UpdateWorkspace => "update_workspace",
            Self::ManageWorkspaceMembers => "manage_workspace_members",
            Self::DeleteWorkspace => "delete_workspace",
            Self::CreateBoard => "create_board",
            Self::ReadBoard => "read_board",
            Self::UpdateBoard => "update_board",
            Self::ManageBoardMembers => "manage_board_members",
            Self::DeleteBoard => "delete_board",
            Self::CreateList => "create_list",
            Self::UpdateList => "update_list",
            Self::MoveList => "move_list",
            Self::DeleteList => "delete_list",
            Self::CreateTask => "create_task",
            Self::UpdateTask => "update_task",
            Self::MoveTask => "move_task",
            Self::DeleteTask => "delete_task",
            Self::AssignTask => "assign_task",
            Self::CommentTask => "comment_task",
            Self::DeleteComment => "delete_comment",
            Self::AttachToTask => "attach_to_task",
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Proof that an actor passed a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grant {
    /// Ancestor chain of the authorized target.
    pub path: EntityPath,
    /// Membership scope the gate was evaluated at.
    pub scope: MemberScope,
    /// Actor's direct role there; `None` for a super admin without a record.
    pub role: Option<Role>,
}

impl Grant {
    /// Returns whether the grant carries at least `role` (super admins always
    /// do).
    pub fn at_least(&self, actor: &Actor, role: Role) -> bool {
        actor.is_super_admin || self.role.is_some_and(|held| held >= role)
    }
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allowed(Grant),
    Forbidden { role: Option<Role> },
    NotFound,
}

/// Evaluates actions against the membership registry.
pub struct AccessEvaluator<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> AccessEvaluator<'a, S>
where
    S: HierarchyRepository + MembershipRepository + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Computes the decision for `action` on `target` without failing on
    /// denial.
    pub fn evaluate(
        &self,
        actor: &Actor,
        target: EntityRef,
        action: Action,
    ) -> ServiceResult<AccessDecision> {
        let Some(path) = self.store.resolve_path(target)? else {
            return Ok(AccessDecision::NotFound);
        };
        let scope = match action.gate_level() {
            GateLevel::Workspace => MemberScope::Workspace(path.workspace),
            GateLevel::Board => match path.board {
                Some(board) => MemberScope::Board(board),
                None => {
                    return Err(ServiceError::ActionTargetMismatch {
                        action,
                        entity: target,
                    })
                }
            },
        };

        let role = self.store.member_role(scope, actor.user)?;
        let passes = role.is_some_and(|held| held >= action.required_role());
        if passes || actor.is_super_admin {
            return Ok(AccessDecision::Allowed(Grant { path, scope, role }));
        }
        Ok(AccessDecision::Forbidden { role })
    }

    /// Gates `action` on `target`, failing with `NotFound` or `Forbidden`.
    pub fn authorize(
        &self,
        actor: &Actor,
        target: EntityRef,
        action: Action,
    ) -> ServiceResult<Grant> {
        match self.evaluate(actor, target, action)? {
            AccessDecision::Allowed(grant) => {
                debug!(
                    "event=access_check module=access status=ok user={} entity={} action={}",
                    actor.user, target, action
                );
                Ok(grant)
            }
            AccessDecision::Forbidden { role } => {
                warn!(
                    "event=access_check module=access status=denied user={} entity={} action={} required={} held={}",
                    actor.user,
                    target,
                    action,
                    action.required_role(),
                    role.map_or("none", Role::as_str)
                );
                Err(ServiceError::Forbidden {
                    user: actor.user,
                    entity: target,
                    action,
                })
            }
            AccessDecision::NotFound => Err(ServiceError::NotFound(target)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Action, GateLevel};
    use crate::model::membership::Role;

    #[test]
    fn structural_list_changes_need_board_admin() {
        for action in [
            Action::CreateList,
            Action::UpdateList,
            Action::MoveList,
            Action::DeleteList,
        ] {
            assert_eq!(action.gate_level(), GateLevel::Board);
            assert_eq!(action.required_role(), Role::Admin);
        }
    }

    #[test]
    fn task_editing_is_open_to_board_members() {
        for action in [
            Action::CreateTask,
            Action::UpdateTask,
            Action::CommentTask,
            Action::AssignTask,
        ] {
            assert_eq!(action.required_role(), Role::Member);
        }
        assert_eq!(Action::DeleteTask.required_role(), Role::Admin);
    }

    #[test]
    fn only_owner_deletes_workspace() {
        assert_eq!(Action::DeleteWorkspace.gate_level(), GateLevel::Workspace);
        assert_eq!(Action::DeleteWorkspace.required_role(), Role::Owner);
        assert!(Role::Admin < Action::DeleteWorkspace.required_role());
    }
}
