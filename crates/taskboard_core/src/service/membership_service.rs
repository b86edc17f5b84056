//! Membership registry.
//!
//! # Responsibility
//! - Add, remove and re-role `(user, role)` records on workspaces and boards.
//! - Validate board additions against workspace membership.
//!
//! # Invariants
//! - Never evaluates authorization policy; callers authorize first.
//! - Mutations run only under the exclusive scope of the target entity.
//! - The workspace owner record is immutable here; `owner` is never granted.

use crate::model::entity::{MemberScope, UserId};
use crate::model::membership::{MemberRemoval, Membership, Role};
use crate::repo::{HierarchyRepository, MembershipRepository};
use crate::scope::{ScopeGuard, ScopeKey};
use crate::service::error::{ServiceError, ServiceResult};
use log::info;

/// Registry over membership records.
pub struct MembershipRegistry<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> MembershipRegistry<'a, S>
where
    S: HierarchyRepository + MembershipRepository + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Adds `user` with `role` at `scope`.
    ///
    /// # Errors
    /// - `NotFound` when the entity is absent.
    /// - `InvalidRole` for `owner`, anywhere.
    /// - `AlreadyMember` when a record exists.
    /// - `ParentMembershipRequired` for a board when `user` is not a member
    ///   of the owning workspace.
    pub fn add_member(
        &self,
        guard: &ScopeGuard<'_>,
        scope: MemberScope,
        user: UserId,
        role: Role,
    ) -> ServiceResult<Membership> {
        ensure_scope_held(guard, scope)?;
        if role == Role::Owner || !role.allowed_at(scope) {
            return Err(ServiceError::InvalidRole { scope, role });
        }
        let path = self
            .store
            .resolve_path(scope.entity())?
            .ok_or(ServiceError::NotFound(scope.entity()))?;
        if self.store.member_role(scope, user)?.is_some() {
            return Err(ServiceError::AlreadyMember { scope, user });
        }
        if let MemberScope::Board(board) = scope {
            let parent = MemberScope::Workspace(path.workspace);
            if self.store.member_role(parent, user)?.is_none() {
                return Err(ServiceError::ParentMembershipRequired {
                    board,
                    workspace: path.workspace,
                    user,
                });
            }
        }

        let membership = self.store.insert_member(scope, user, role)?;
        info!(
            "event=member_add module=membership status=ok scope={} user={} role={}",
            scope, user, role
        );
        Ok(membership)
    }

    /// Removes `user` from `scope`, cascading to dependent records.
    ///
    /// # Errors
    /// - `NotAMember` when no record exists.
    /// - `OwnerMembershipLocked` for the workspace owner.
    pub fn remove_member(
        &self,
        guard: &ScopeGuard<'_>,
        scope: MemberScope,
        user: UserId,
    ) -> ServiceResult<MemberRemoval> {
        ensure_scope_held(guard, scope)?;
        match self.store.member_role(scope, user)? {
            None => return Err(ServiceError::NotAMember { scope, user }),
            Some(Role::Owner) => return Err(owner_locked(scope, user)),
            Some(_) => {}
        }

        let removal = self
            .store
            .delete_member(scope, user)?
            .ok_or(ServiceError::NotAMember { scope, user })?;
        info!(
            "event=member_remove module=membership status=ok scope={} user={} board_memberships={} task_assignments={}",
            scope, user, removal.board_memberships, removal.task_assignments
        );
        Ok(removal)
    }

    /// Changes the role of an existing record.
    pub fn change_role(
        &self,
        guard: &ScopeGuard<'_>,
        scope: MemberScope,
        user: UserId,
        role: Role,
    ) -> ServiceResult<Membership> {
        ensure_scope_held(guard, scope)?;
        if role == Role::Owner || !role.allowed_at(scope) {
            return Err(ServiceError::InvalidRole { scope, role });
        }
        match self.store.member_role(scope, user)? {
            None => return Err(ServiceError::NotAMember { scope, user }),
            Some(Role::Owner) => return Err(owner_locked(scope, user)),
            Some(current) if current == role => {
                return self
                    .store
                    .list_members(scope)?
                    .into_iter()
                    .find(|membership| membership.user == user)
                    .ok_or(ServiceError::NotAMember { scope, user });
            }
            Some(_) => {}
        }

        let membership = self
            .store
            .update_member_role(scope, user, role)?
            .ok_or(ServiceError::NotAMember { scope, user })?;
        info!(
            "event=member_role_change module=membership status=ok scope={} user={} role={}",
            scope, user, role
        );
        Ok(membership)
    }

    /// Direct role at `scope`; `None` is not an error.
    pub fn role_of(&self, scope: MemberScope, user: UserId) -> ServiceResult<Option<Role>> {
        Ok(self.store.member_role(scope, user)?)
    }

    /// Records at `scope`, oldest first.
    pub fn members(&self, scope: MemberScope) -> ServiceResult<Vec<Membership>> {
        Ok(self.store.list_members(scope)?)
    }
}

fn ensure_scope_held(guard: &ScopeGuard<'_>, scope: MemberScope) -> ServiceResult<()> {
    let key = match scope {
        MemberScope::Workspace(id) => ScopeKey::Workspace(id),
        MemberScope::Board(id) => ScopeKey::Board(id),
    };
    if guard.holds(key) {
        Ok(())
    } else {
        Err(ServiceError::ScopeNotHeld(key))
    }
}

fn owner_locked(scope: MemberScope, user: UserId) -> ServiceError {
    ServiceError::OwnerMembershipLocked {
        workspace: scope.entity().id(),
        user,
    }
}
