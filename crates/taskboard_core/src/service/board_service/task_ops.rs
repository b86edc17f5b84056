//! Task operations of [`BoardService`].
//!
//! Every mutation runs under the scope of the task's list; assignment also
//! holds the board scope so the board's membership set cannot change under
//! it.

use super::{
    board_and_list_scopes, list_scope, normalize_description, BoardService, MAX_SCOPE_RESOLVE_ATTEMPTS,
};
use crate::model::entity::{
    AttachmentId, CollectionRef, CommentId, EntityRef, ListId, TaskId, UserId,
};
use crate::model::hierarchy::{Attachment, Comment, NewAttachment, Task, TaskDetail, TaskPatch};
use crate::model::membership::{Actor, Role};
use crate::repo::BoardStore;
use crate::scope::ScopeKey;
use crate::service::access::Action;
use crate::service::error::{ServiceError, ServiceResult};
use log::{debug, info};

impl<S: BoardStore> BoardService<S> {
    /// Appends a new task at the end of `list`.
    pub fn create_task(
        &self,
        actor: &Actor,
        list: ListId,
        title: impl Into<String>,
    ) -> ServiceResult<Task> {
        let (guard, _) = self.lock_path(EntityRef::List(list), list_scope)?;
        self.access()
            .authorize(actor, EntityRef::List(list), Action::CreateTask)?;
        let title = self.normalize_name("task title", title.into())?;
        let position = self
            .collections()
            .append_position(&guard, CollectionRef::ListTasks(list))?;
        let task = self.store.insert_task(list, &title, position)?;
        info!(
            "event=task_create module=service status=ok task={} list={} position={}",
            task.id, list, position
        );
        Ok(task)
    }

    /// Task with its assignees, comments and attachments.
    pub fn get_task(&self, actor: &Actor, task: TaskId) -> ServiceResult<TaskDetail> {
        let entity = EntityRef::Task(task);
        self.access().authorize(actor, entity, Action::ReadBoard)?;
        let record = self
            .store
            .get_task(task)?
            .ok_or(ServiceError::NotFound(entity))?;
        Ok(TaskDetail {
            task: record,
            assignees: self.store.task_assignees(task)?,
            comments: self.store.list_comments(task)?,
            attachments: self.store.list_attachments(task)?,
        })
    }

    /// Tasks of `list` in order.
    pub fn list_tasks(&self, actor: &Actor, list: ListId) -> ServiceResult<Vec<Task>> {
        self.access()
            .authorize(actor, EntityRef::List(list), Action::ReadBoard)?;
        Ok(self.store.list_tasks(list)?)
    }

    /// Updates title, description, status or due date.
    pub fn update_task(
        &self,
        actor: &Actor,
        task: TaskId,
        patch: TaskPatch,
    ) -> ServiceResult<Task> {
        let entity = EntityRef::Task(task);
        let (_guard, _) = self.lock_path(entity, list_scope)?;
        self.access().authorize(actor, entity, Action::UpdateTask)?;
        let normalized = TaskPatch {
            title: patch
                .title
                .map(|value| self.normalize_name("task title", value))
                .transpose()?,
            description: patch.description.map(normalize_description),
            status: patch.status,
            due_at: patch.due_at,
        };
        let updated = self.store.update_task(task, &normalized)?;
        info!(
            "event=task_update module=service status=ok task={} user={}",
            task, actor.user
        );
        Ok(updated)
    }

    /// Moves `task` to `target_index` in `target_list` (its own list when
    /// `None`).
    ///
    /// A move to a list on another board drops assignees that are not
    /// members of the destination board.
    pub fn move_task(
        &self,
        actor: &Actor,
        task: TaskId,
        target_list: Option<ListId>,
        target_index: usize,
    ) -> ServiceResult<Task> {
        let entity = EntityRef::Task(task);
        for attempt in 1..=MAX_SCOPE_RESOLVE_ATTEMPTS {
            let seen = self
                .store
                .get_task(task)?
                .ok_or(ServiceError::NotFound(entity))?;
            let source = seen.list_id;
            let destination = target_list.unwrap_or(source);
            let guard = self
                .scopes
                .acquire([ScopeKey::List(source), ScopeKey::List(destination)]);

            let current = self
                .store
                .get_task(task)?
                .ok_or(ServiceError::NotFound(entity))?;
            if current.list_id != source {
                debug!(
                    "event=scope_resolve module=service status=retry entity={} attempt={}",
                    entity, attempt
                );
                continue;
            }

            self.access().authorize(actor, entity, Action::MoveTask)?;
            if destination == source {
                self.collections().move_to(
                    &guard,
                    CollectionRef::ListTasks(source),
                    task,
                    target_index,
                )?;
            } else {
                self.access()
                    .authorize(actor, EntityRef::List(destination), Action::CreateTask)?;
                self.collections().move_across(
                    &guard,
                    task,
                    CollectionRef::ListTasks(source),
                    CollectionRef::ListTasks(destination),
                    target_index,
                )?;
            }

            info!(
                "event=task_move module=service status=ok task={} from_list={} to_list={} index={}",
                task, source, destination, target_index
            );
            return self
                .store
                .get_task(task)?
                .ok_or(ServiceError::NotFound(entity));
        }
        Err(ServiceError::ScopeUnstable(entity))
    }

    /// Assigns `user`, who must be a member of the task's board.
    ///
    /// Returns `false` when the user was already assigned.
    pub fn assign_task(&self, actor: &Actor, task: TaskId, user: UserId) -> ServiceResult<bool> {
        let entity = EntityRef::Task(task);
        let (_guard, _) = self.lock_path(entity, board_and_list_scopes)?;
        let grant = self.access().authorize(actor, entity, Action::AssignTask)?;
        if self.store.member_role(grant.scope, user)?.is_none() {
            return Err(ServiceError::AssigneeNotMember {
                board: grant.scope.entity().id(),
                user,
            });
        }
        let assigned = self.store.insert_assignee(task, user)?;
        info!(
            "event=task_assign module=service status=ok task={} assignee={} changed={}",
            task, user, assigned
        );
        Ok(assigned)
    }

    /// Returns `false` when `user` was not assigned.
    pub fn unassign_task(&self, actor: &Actor, task: TaskId, user: UserId) -> ServiceResult<bool> {
        let entity = EntityRef::Task(task);
        let (_guard, _) = self.lock_path(entity, list_scope)?;
        self.access().authorize(actor, entity, Action::AssignTask)?;
        let removed = self.store.delete_assignee(task, user)?;
        info!(
            "event=task_unassign module=service status=ok task={} assignee={} changed={}",
            task, user, removed
        );
        Ok(removed)
    }

    pub fn add_comment(
        &self,
        actor: &Actor,
        task: TaskId,
        text: impl Into<String>,
    ) -> ServiceResult<Comment> {
        let entity = EntityRef::Task(task);
        let (_guard, _) = self.lock_path(entity, list_scope)?;
        self.access().authorize(actor, entity, Action::CommentTask)?;
        let text = text.into();
        let text = text.trim();
        if text.is_empty() {
            return Err(ServiceError::BlankField("comment"));
        }
        let comment = self.store.insert_comment(task, actor.user, text)?;
        info!(
            "event=comment_add module=service status=ok task={} comment={}",
            task, comment.id
        );
        Ok(comment)
    }

    /// Deletes one comment; allowed to its author and to board admins.
    pub fn delete_comment(
        &self,
        actor: &Actor,
        task: TaskId,
        comment: CommentId,
    ) -> ServiceResult<()> {
        let entity = EntityRef::Task(task);
        let (_guard, _) = self.lock_path(entity, list_scope)?;
        let grant = self.access().authorize(actor, entity, Action::DeleteComment)?;
        let existing = self
            .store
            .get_comment(task, comment)?
            .ok_or(ServiceError::CommentNotFound(comment))?;
        if existing.author != actor.user && !grant.at_least(actor, Role::Admin) {
            return Err(ServiceError::Forbidden {
                user: actor.user,
                entity,
                action: Action::DeleteComment,
            });
        }
        if !self.store.delete_comment(task, comment)? {
            return Err(ServiceError::CommentNotFound(comment));
        }
        info!(
            "event=comment_delete module=service status=ok task={} comment={} user={}",
            task, comment, actor.user
        );
        Ok(())
    }

    /// Records attachment metadata; the bytes live in the blob store.
    pub fn add_attachment(
        &self,
        actor: &Actor,
        task: TaskId,
        input: NewAttachment,
    ) -> ServiceResult<Attachment> {
        let entity = EntityRef::Task(task);
        let (_guard, _) = self.lock_path(entity, list_scope)?;
        self.access().authorize(actor, entity, Action::AttachToTask)?;
        let file_name = self.normalize_name("file name", input.file_name)?;
        let blob_ref = input.blob_ref.trim().to_string();
        if blob_ref.is_empty() {
            return Err(ServiceError::BlankField("blob ref"));
        }
        if let Some(size) = input.size_bytes.filter(|size| *size < 0) {
            return Err(ServiceError::InvalidAttachmentSize(size));
        }
        let attachment = self.store.insert_attachment(
            task,
            &NewAttachment {
                file_name,
                blob_ref,
                content_type: input.content_type,
                size_bytes: input.size_bytes,
            },
        )?;
        info!(
            "event=attachment_add module=service status=ok task={} attachment={}",
            task, attachment.id
        );
        Ok(attachment)
    }

    /// Removes attachment metadata and returns it so the caller can purge the
    /// blob.
    pub fn remove_attachment(
        &self,
        actor: &Actor,
        task: TaskId,
        attachment: AttachmentId,
    ) -> ServiceResult<Attachment> {
        let entity = EntityRef::Task(task);
        let (_guard, _) = self.lock_path(entity, list_scope)?;
        self.access().authorize(actor, entity, Action::AttachToTask)?;
        let removed = self
            .store
            .delete_attachment(task, attachment)?
            .ok_or(ServiceError::AttachmentNotFound(attachment))?;
        info!(
            "event=attachment_remove module=service status=ok task={} attachment={}",
            task, attachment
        );
        Ok(removed)
    }
}
