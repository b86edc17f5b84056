//! List operations of [`BoardService`].

use super::{board_scope, BoardService, MAX_SCOPE_RESOLVE_ATTEMPTS};
use crate::model::entity::{BoardId, CollectionRef, EntityRef, ListId};
use crate::model::hierarchy::BoardList;
use crate::model::membership::Actor;
use crate::repo::BoardStore;
use crate::scope::ScopeKey;
use crate::service::access::Action;
use crate::service::error::{ServiceError, ServiceResult};
use log::{debug, info};

impl<S: BoardStore> BoardService<S> {
    /// Appends a new list at the end of `board`.
    pub fn create_list(
        &self,
        actor: &Actor,
        board: BoardId,
        name: impl Into<String>,
    ) -> ServiceResult<BoardList> {
        let guard = self.scopes.acquire([ScopeKey::Board(board)]);
        self.access()
            .authorize(actor, EntityRef::Board(board), Action::CreateList)?;
        let name = self.normalize_name("list name", name.into())?;
        let position = self
            .collections()
            .append_position(&guard, CollectionRef::BoardLists(board))?;
        let list = self.store.insert_list(board, &name, position)?;
        info!(
            "event=list_create module=service status=ok list={} board={} position={}",
            list.id, board, position
        );
        Ok(list)
    }

    /// Lists of `board` in order.
    pub fn list_lists(&self, actor: &Actor, board: BoardId) -> ServiceResult<Vec<BoardList>> {
        self.access()
            .authorize(actor, EntityRef::Board(board), Action::ReadBoard)?;
        Ok(self.store.list_lists(board)?)
    }

    pub fn rename_list(
        &self,
        actor: &Actor,
        list: ListId,
        name: impl Into<String>,
    ) -> ServiceResult<BoardList> {
        let (_guard, _) = self.lock_path(EntityRef::List(list), board_scope)?;
        self.access()
            .authorize(actor, EntityRef::List(list), Action::UpdateList)?;
        let name = self.normalize_name("list name", name.into())?;
        let renamed = self.store.rename_list(list, &name)?;
        info!(
            "event=list_rename module=service status=ok list={} user={}",
            list, actor.user
        );
        Ok(renamed)
    }

    /// Moves `list` to `target_index` on `target_board` (its own board when
    /// `None`).
    ///
    /// A cross-board move needs `admin` on both boards and drops task
    /// assignees that are not members of the destination board.
    pub fn move_list(
        &self,
        actor: &Actor,
        list: ListId,
        target_board: Option<BoardId>,
        target_index: usize,
    ) -> ServiceResult<BoardList> {
        let entity = EntityRef::List(list);
        for attempt in 1..=MAX_SCOPE_RESOLVE_ATTEMPTS {
            let seen = self
                .store
                .get_list(list)?
                .ok_or(ServiceError::NotFound(entity))?;
            let source = seen.board_id;
            let destination = target_board.unwrap_or(source);
            let mut guard = self
                .scopes
                .acquire([ScopeKey::Board(source), ScopeKey::Board(destination)]);

            let current = self
                .store
                .get_list(list)?
                .ok_or(ServiceError::NotFound(entity))?;
            if current.board_id != source {
                debug!(
                    "event=scope_resolve module=service status=retry entity={} attempt={}",
                    entity, attempt
                );
                continue;
            }

            self.access().authorize(actor, entity, Action::MoveList)?;
            if destination == source {
                self.collections().move_to(
                    &guard,
                    CollectionRef::BoardLists(source),
                    list,
                    target_index,
                )?;
            } else {
                self.access()
                    .authorize(actor, EntityRef::Board(destination), Action::CreateList)?;
                guard.extend([ScopeKey::List(list)]);
                self.collections().move_across(
                    &guard,
                    list,
                    CollectionRef::BoardLists(source),
                    CollectionRef::BoardLists(destination),
                    target_index,
                )?;
            }

            info!(
                "event=list_move module=service status=ok list={} from_board={} to_board={} index={}",
                list, source, destination, target_index
            );
            return self
                .store
                .get_list(list)?
                .ok_or(ServiceError::NotFound(entity));
        }
        Err(ServiceError::ScopeUnstable(entity))
    }
}
