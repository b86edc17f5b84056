//! Cascade coordinator.
//!
//! # Responsibility
//! - Compute the exclusive scopes a subtree delete touches, top-down.
//! - Run the delete as one unit and surface consistency failures.
//!
//! # Invariants
//! - The caller holds every scope returned by [`CascadeCoordinator::scopes_for`]
//!   before `delete` runs; `delete` re-checks and refuses otherwise.
//! - Deleting a list or task leaves sibling positions untouched.

use crate::model::entity::EntityRef;
use crate::model::hierarchy::CascadeReport;
use crate::repo::{CascadeRepository, HierarchyRepository, StoreError};
use crate::scope::{ScopeGuard, ScopeKey};
use crate::service::error::{ServiceError, ServiceResult};
use log::{error, info};

/// Subtree delete coordinator.
pub struct CascadeCoordinator<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> CascadeCoordinator<'a, S>
where
    S: HierarchyRepository + CascadeRepository + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Scopes below `root` that a delete of `root` rewrites, one level at a
    /// time: the boards of a workspace, or the lists of one or more boards.
    ///
    /// Callers take the root's own scopes first, then extend with this set,
    /// so the set is read while its parent is already held.
    pub fn child_scopes(&self, parent: ScopeKey) -> ServiceResult<Vec<ScopeKey>> {
        match parent {
            ScopeKey::Workspace(workspace) => Ok(self
                .store
                .list_boards(workspace)?
                .into_iter()
                .map(|board| ScopeKey::Board(board.id))
                .collect()),
            ScopeKey::Board(board) => Ok(self
                .store
                .list_lists(board)?
                .into_iter()
                .map(|list| ScopeKey::List(list.id))
                .collect()),
            ScopeKey::List(_) => Ok(Vec::new()),
        }
    }

    /// Every scope a delete of `root` must hold, top-down.
    pub fn scopes_for(&self, root: EntityRef) -> ServiceResult<Vec<ScopeKey>> {
        let path = self
            .store
            .resolve_path(root)?
            .ok_or(ServiceError::NotFound(root))?;

        let mut keys = Vec::new();
        match root {
            EntityRef::Workspace(workspace) => {
                keys.push(ScopeKey::Workspace(workspace));
                let boards = self.child_scopes(ScopeKey::Workspace(workspace))?;
                for board in &boards {
                    keys.extend(self.child_scopes(*board)?);
                }
                keys.extend(boards);
            }
            EntityRef::Board(board) => {
                keys.push(ScopeKey::Workspace(path.workspace));
                keys.push(ScopeKey::Board(board));
                keys.extend(self.child_scopes(ScopeKey::Board(board))?);
            }
            EntityRef::List(list) => {
                if let Some(board) = path.board {
                    keys.push(ScopeKey::Board(board));
                }
                keys.push(ScopeKey::List(list));
            }
            EntityRef::Task(_) => {
                if let Some(list) = path.list {
                    keys.push(ScopeKey::List(list));
                }
            }
        }
        keys.sort_unstable();
        Ok(keys)
    }

    /// Deletes `root` and its descendants as one unit.
    ///
    /// # Errors
    /// - `NotFound` when `root` is absent.
    /// - `ScopeNotHeld` when `guard` misses a scope the delete touches.
    /// - `Store(ConsistencyCheck)` when a dangling row would survive; nothing
    ///   is removed in that case.
    pub fn delete(&self, guard: &ScopeGuard<'_>, root: EntityRef) -> ServiceResult<CascadeReport> {
        for key in self.scopes_for(root)? {
            if !guard.holds(key) {
                return Err(ServiceError::ScopeNotHeld(key));
            }
        }

        match self.store.delete_subtree(root) {
            Ok(report) => {
                info!(
                    "event=cascade_delete module=cascade status=ok root={} workspaces={} boards={} lists={} tasks={} memberships={} comments={} attachments={}",
                    root,
                    report.workspaces,
                    report.boards,
                    report.lists,
                    report.tasks,
                    report.memberships,
                    report.comments,
                    report.attachment_refs.len()
                );
                Ok(report)
            }
            Err(StoreError::ConsistencyCheck { check, violations }) => {
                error!(
                    "event=cascade_delete module=cascade status=error root={} check={} violations={}",
                    root, check, violations
                );
                Err(ServiceError::Store(StoreError::ConsistencyCheck {
                    check,
                    violations,
                }))
            }
            Err(err) => Err(err.into()),
        }
    }
}
