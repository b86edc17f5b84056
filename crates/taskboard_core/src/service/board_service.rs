//! Board use-case service facade.
//!
//! # Responsibility
//! - Expose every actor-facing operation on workspaces, boards, lists and
//!   tasks.
//! - Take exclusive scopes top-down, authorize, then delegate to the
//!   membership registry, the ordered collection manager or the cascade
//!   coordinator.
//!
//! # Invariants
//! - Authorization is evaluated after the scopes are taken, so the decision
//!   and the mutation see the same membership and hierarchy state.
//! - Scopes are always taken workspace → board → list.
//! - Names are trimmed, non-blank and bounded by `CoreConfig::max_name_chars`.

use crate::config::{ConfigError, CoreConfig};
use crate::model::entity::{BoardId, EntityPath, EntityRef, MemberScope, UserId, WorkspaceId};
use crate::model::hierarchy::{
    Board, BoardPatch, CascadeReport, NewBoard, Workspace, WorkspacePatch,
    DEFAULT_BOARD_BACKGROUND,
};
use crate::model::membership::{Actor, MemberRemoval, Membership, Role};
use crate::repo::BoardStore;
use crate::scope::{ScopeGuard, ScopeKey, ScopeLocks};
use crate::service::access::{AccessEvaluator, Action};
use crate::service::cascade_service::CascadeCoordinator;
use crate::service::error::{ServiceError, ServiceResult};
use crate::service::membership_service::MembershipRegistry;
use crate::service::order_service::OrderedCollections;
use log::{debug, info};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

mod list_ops;
mod task_ops;

/// Attempts at re-resolving a moving parent before giving up.
const MAX_SCOPE_RESOLVE_ATTEMPTS: usize = 8;

static BACKGROUND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").expect("valid background regex"));

/// Board service facade.
pub struct BoardService<S: BoardStore> {
    store: S,
    scopes: Arc<ScopeLocks>,
    config: CoreConfig,
}

impl<S: BoardStore> BoardService<S> {
    /// Creates service with default config and private scopes.
    pub fn new(store: S) -> Self {
        Self {
            store,
            scopes: Arc::new(ScopeLocks::new()),
            config: CoreConfig::default(),
        }
    }

    /// Creates service with explicit config and private scopes.
    ///
    /// # Errors
    /// - Returns [`ConfigError`] when `config` fails [`CoreConfig::validate`].
    pub fn with_config(store: S, config: CoreConfig) -> Result<Self, ConfigError> {
        Self::with_scopes(store, config, Arc::new(ScopeLocks::new()))
    }

    /// Creates service that shares `scopes` with other instances working on
    /// the same database.
    ///
    /// # Errors
    /// - Returns [`ConfigError`] when `config` fails [`CoreConfig::validate`].
    pub fn with_scopes(
        store: S,
        config: CoreConfig,
        scopes: Arc<ScopeLocks>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            store,
            scopes,
            config,
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Creates one workspace owned by `actor`.
    pub fn create_workspace(
        &self,
        actor: &Actor,
        name: impl Into<String>,
        description: Option<String>,
    ) -> ServiceResult<Workspace> {
        let name = self.normalize_name("workspace name", name.into())?;
        let description = normalize_description(description);
        let workspace = self
            .store
            .insert_workspace(&name, description.as_deref(), actor.user)?;
        info!(
            "event=workspace_create module=service status=ok workspace={} owner={}",
            workspace.id, actor.user
        );
        Ok(workspace)
    }

    pub fn get_workspace(&self, actor: &Actor, id: WorkspaceId) -> ServiceResult<Workspace> {
        self.access()
            .authorize(actor, EntityRef::Workspace(id), Action::ReadWorkspace)?;
        self.store
            .get_workspace(id)?
            .ok_or(ServiceError::NotFound(EntityRef::Workspace(id)))
    }

    /// Workspaces where `actor` holds any role.
    pub fn list_workspaces(&self, actor: &Actor) -> ServiceResult<Vec<Workspace>> {
        Ok(self.store.list_workspaces_for_user(actor.user)?)
    }

    pub fn update_workspace(
        &self,
        actor: &Actor,
        id: WorkspaceId,
        patch: WorkspacePatch,
    ) -> ServiceResult<Workspace> {
        let _guard = self.scopes.acquire([ScopeKey::Workspace(id)]);
        self.access()
            .authorize(actor, EntityRef::Workspace(id), Action::UpdateWorkspace)?;
        let name = patch
            .name
            .map(|value| self.normalize_name("workspace name", value))
            .transpose()?;
        let description = patch.description.map(normalize_description);
        let workspace = self.store.update_workspace(
            id,
            name.as_deref(),
            description.as_ref().map(Option::as_deref),
        )?;
        info!(
            "event=workspace_update module=service status=ok workspace={} user={}",
            id, actor.user
        );
        Ok(workspace)
    }

    /// Creates one board; a creator who belongs to the workspace becomes its
    /// first board admin.
    pub fn create_board(
        &self,
        actor: &Actor,
        workspace: WorkspaceId,
        input: NewBoard,
    ) -> ServiceResult<Board> {
        let _guard = self.scopes.acquire([ScopeKey::Workspace(workspace)]);
        let grant =
            self.access()
                .authorize(actor, EntityRef::Workspace(workspace), Action::CreateBoard)?;
        let name = self.normalize_name("board name", input.name)?;
        let description = normalize_description(input.description);
        let background = match input.background {
            Some(value) => normalize_background(&value)?,
            None => DEFAULT_BOARD_BACKGROUND.to_string(),
        };
        let admin = grant.role.is_some().then_some(actor.user);

        let board = self.store.insert_board(
            workspace,
            &name,
            description.as_deref(),
            &background,
            admin,
        )?;
        info!(
            "event=board_create module=service status=ok board={} workspace={} creator_admin={}",
            board.id,
            workspace,
            admin.is_some()
        );
        Ok(board)
    }

    pub fn get_board(&self, actor: &Actor, id: BoardId) -> ServiceResult<Board> {
        self.access()
            .authorize(actor, EntityRef::Board(id), Action::ReadBoard)?;
        self.store
            .get_board(id)?
            .ok_or(ServiceError::NotFound(EntityRef::Board(id)))
    }

    /// Boards of `workspace` the actor can open.
    pub fn list_boards(&self, actor: &Actor, workspace: WorkspaceId) -> ServiceResult<Vec<Board>> {
        self.access()
            .authorize(actor, EntityRef::Workspace(workspace), Action::ReadWorkspace)?;
        let mut visible = Vec::new();
        for board in self.store.list_boards(workspace)? {
            if actor.is_super_admin
                || self
                    .store
                    .member_role(MemberScope::Board(board.id), actor.user)?
                    .is_some()
            {
                visible.push(board);
            }
        }
        debug!(
            "event=board_list module=service status=ok workspace={} count={}",
            workspace,
            visible.len()
        );
        Ok(visible)
    }

    pub fn update_board(
        &self,
        actor: &Actor,
        id: BoardId,
        patch: BoardPatch,
    ) -> ServiceResult<Board> {
        let _guard = self.scopes.acquire([ScopeKey::Board(id)]);
        self.access()
            .authorize(actor, EntityRef::Board(id), Action::UpdateBoard)?;
        let name = patch
            .name
            .map(|value| self.normalize_name("board name", value))
            .transpose()?;
        let description = patch.description.map(normalize_description);
        let background = patch
            .background
            .as_deref()
            .map(normalize_background)
            .transpose()?;
        let board = self.store.update_board(
            id,
            name.as_deref(),
            description.as_ref().map(Option::as_deref),
            background.as_deref(),
        )?;
        info!(
            "event=board_update module=service status=ok board={} user={}",
            id, actor.user
        );
        Ok(board)
    }

    /// Adds `user` to a workspace or board.
    pub fn add_member(
        &self,
        actor: &Actor,
        target: EntityRef,
        user: UserId,
        role: Role,
    ) -> ServiceResult<Membership> {
        let scope = member_scope(target)?;
        let guard = self.scopes.acquire([scope_key(scope)]);
        self.access().authorize(actor, target, manage_action(scope))?;
        self.registry().add_member(&guard, scope, user, role)
    }

    /// Removes `user` from a workspace or board; workspace removal also
    /// removes them from every board of that workspace.
    pub fn remove_member(
        &self,
        actor: &Actor,
        target: EntityRef,
        user: UserId,
    ) -> ServiceResult<MemberRemoval> {
        let scope = member_scope(target)?;
        let mut guard = self.scopes.acquire([scope_key(scope)]);
        self.access().authorize(actor, target, manage_action(scope))?;
        self.extend_descendants(&mut guard, scope_key(scope))?;
        self.registry().remove_member(&guard, scope, user)
    }

    pub fn change_member_role(
        &self,
        actor: &Actor,
        target: EntityRef,
        user: UserId,
        role: Role,
    ) -> ServiceResult<Membership> {
        let scope = member_scope(target)?;
        let guard = self.scopes.acquire([scope_key(scope)]);
        self.access().authorize(actor, target, manage_action(scope))?;
        self.registry().change_role(&guard, scope, user, role)
    }

    pub fn list_members(&self, actor: &Actor, target: EntityRef) -> ServiceResult<Vec<Membership>> {
        let scope = member_scope(target)?;
        let action = match scope {
            MemberScope::Workspace(_) => Action::ReadWorkspace,
            MemberScope::Board(_) => Action::ReadBoard,
        };
        self.access().authorize(actor, target, action)?;
        self.registry().members(scope)
    }

    /// Deletes `target` and everything below it as one unit.
    pub fn delete_entity(&self, actor: &Actor, target: EntityRef) -> ServiceResult<CascadeReport> {
        let (mut guard, action) = match target {
            EntityRef::Workspace(id) => (
                self.scopes.acquire([ScopeKey::Workspace(id)]),
                Action::DeleteWorkspace,
            ),
            EntityRef::Board(id) => {
                let (guard, _) = self.lock_path(target, |path| {
                    vec![ScopeKey::Workspace(path.workspace), ScopeKey::Board(id)]
                })?;
                (guard, Action::DeleteBoard)
            }
            EntityRef::List(_) => {
                let (guard, _) = self.lock_path(target, board_and_list_scopes)?;
                (guard, Action::DeleteList)
            }
            EntityRef::Task(_) => {
                let (guard, _) = self.lock_path(target, list_scope)?;
                (guard, Action::DeleteTask)
            }
        };
        self.access().authorize(actor, target, action)?;

        match target {
            EntityRef::Workspace(id) => {
                self.extend_descendants(&mut guard, ScopeKey::Workspace(id))?
            }
            EntityRef::Board(id) => self.extend_descendants(&mut guard, ScopeKey::Board(id))?,
            EntityRef::List(_) | EntityRef::Task(_) => {}
        }
        let report = self.cascade().delete(&guard, target)?;
        info!(
            "event=entity_delete module=service status=ok entity={} user={}",
            target, actor.user
        );
        Ok(report)
    }

    fn access(&self) -> AccessEvaluator<'_, S> {
        AccessEvaluator::new(&self.store)
    }

    fn registry(&self) -> MembershipRegistry<'_, S> {
        MembershipRegistry::new(&self.store)
    }

    fn collections(&self) -> OrderedCollections<'_, S> {
        OrderedCollections::new(&self.store, &self.config.ordering)
    }

    fn cascade(&self) -> CascadeCoordinator<'_, S> {
        CascadeCoordinator::new(&self.store)
    }

    fn resolve(&self, entity: EntityRef) -> ServiceResult<EntityPath> {
        self.store
            .resolve_path(entity)?
            .ok_or(ServiceError::NotFound(entity))
    }

    /// Resolves `entity`, takes the scopes `scopes_of` derives from its path,
    /// and re-resolves under them until the path is stable.
    fn lock_path<F>(
        &self,
        entity: EntityRef,
        scopes_of: F,
    ) -> ServiceResult<(ScopeGuard<'_>, EntityPath)>
    where
        F: Fn(&EntityPath) -> Vec<ScopeKey>,
    {
        for attempt in 1..=MAX_SCOPE_RESOLVE_ATTEMPTS {
            let seen = self.resolve(entity)?;
            let guard = self.scopes.acquire(scopes_of(&seen));
            let current = self.resolve(entity)?;
            if current == seen {
                return Ok((guard, current));
            }
            debug!(
                "event=scope_resolve module=service status=retry entity={} attempt={}",
                entity, attempt
            );
        }
        Err(ServiceError::ScopeUnstable(entity))
    }

    /// Extends `guard` with every scope below `parent`, one level at a time.
    fn extend_descendants(
        &self,
        guard: &mut ScopeGuard<'_>,
        parent: ScopeKey,
    ) -> ServiceResult<()> {
        let cascade = self.cascade();
        let children = cascade.child_scopes(parent)?;
        guard.extend(children.iter().copied());
        let mut grandchildren = Vec::new();
        for child in &children {
            grandchildren.extend(cascade.child_scopes(*child)?);
        }
        guard.extend(grandchildren);
        Ok(())
    }

    fn normalize_name(&self, field: &'static str, value: String) -> ServiceResult<String> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ServiceError::BlankField(field));
        }
        let max_chars = self.config.max_name_chars;
        if trimmed.chars().count() > max_chars {
            return Err(ServiceError::FieldTooLong { field, max_chars });
        }
        Ok(trimmed.to_string())
    }
}

fn member_scope(target: EntityRef) -> ServiceResult<MemberScope> {
    MemberScope::from_entity(target).ok_or(ServiceError::UnsupportedMembershipTarget(target))
}

fn scope_key(scope: MemberScope) -> ScopeKey {
    match scope {
        MemberScope::Workspace(id) => ScopeKey::Workspace(id),
        MemberScope::Board(id) => ScopeKey::Board(id),
    }
}

fn manage_action(scope: MemberScope) -> Action {
    match scope {
        MemberScope::Workspace(_) => Action::ManageWorkspaceMembers,
        MemberScope::Board(_) => Action::ManageBoardMembers,
    }
}

fn board_scope(path: &EntityPath) -> Vec<ScopeKey> {
    path.board.map(ScopeKey::Board).into_iter().collect()
}

fn list_scope(path: &EntityPath) -> Vec<ScopeKey> {
    path.list.map(ScopeKey::List).into_iter().collect()
}

fn board_and_list_scopes(path: &EntityPath) -> Vec<ScopeKey> {
    let mut keys = board_scope(path);
    keys.extend(list_scope(path));
    keys
}

/// Trims descriptions; a blank one is stored as absent.
fn normalize_description(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn normalize_background(value: &str) -> ServiceResult<String> {
    let trimmed = value.trim();
    if !BACKGROUND_RE.is_match(trimmed) {
        return Err(ServiceError::InvalidBackground(value.to_string()));
    }
    Ok(trimmed.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::normalize_background;
    use crate::service::error::ServiceError;

    #[test]
    fn background_accepts_hex_colours_and_lowercases() {
        assert_eq!(normalize_background(" #00AAff ").unwrap(), "#00aaff");
    }

    #[test]
    fn background_rejects_named_and_short_colours() {
        for value in ["blue", "#fff", "#12345g", "0079bf"] {
            assert!(matches!(
                normalize_background(value),
                Err(ServiceError::InvalidBackground(_))
            ));
        }
    }
}
