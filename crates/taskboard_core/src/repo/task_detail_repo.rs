//! Task assignee, comment and attachment persistence.

use crate::model::entity::{AttachmentId, CommentId, TaskId, UserId};
use crate::model::hierarchy::{Attachment, Comment, NewAttachment};
use crate::repo::store::SqliteStore;
use crate::repo::{parse_uuid, StoreError, StoreResult};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

/// Repository interface for task details.
pub trait TaskDetailRepository {
    /// Assignees of one task, in assignment order.
    fn task_assignees(&self, task: TaskId) -> StoreResult<Vec<UserId>>;
    /// Returns `false` when the user was already assigned.
    fn insert_assignee(&self, task: TaskId, user: UserId) -> StoreResult<bool>;
    /// Returns `false` when the user was not assigned.
    fn delete_assignee(&self, task: TaskId, user: UserId) -> StoreResult<bool>;

    fn insert_comment(&self, task: TaskId, author: UserId, text: &str) -> StoreResult<Comment>;
    fn get_comment(&self, task: TaskId, comment: CommentId) -> StoreResult<Option<Comment>>;
    fn list_comments(&self, task: TaskId) -> StoreResult<Vec<Comment>>;
    /// Returns `false` when the comment does not belong to `task`.
    fn delete_comment(&self, task: TaskId, comment: CommentId) -> StoreResult<bool>;

    fn insert_attachment(&self, task: TaskId, input: &NewAttachment) -> StoreResult<Attachment>;
    fn list_attachments(&self, task: TaskId) -> StoreResult<Vec<Attachment>>;
    /// Returns the removed metadata, or `None` when it does not belong to
    /// `task`.
    fn delete_attachment(
        &self,
        task: TaskId,
        attachment: AttachmentId,
    ) -> StoreResult<Option<Attachment>>;
}

impl TaskDetailRepository for SqliteStore<'_> {
    fn task_assignees(&self, task: TaskId) -> StoreResult<Vec<UserId>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_uuid
             FROM task_assignees
             WHERE task_uuid = ?1
             ORDER BY assigned_at ASC, rowid ASC;",
        )?;
        let mut rows = stmt.query([task.to_string()])?;
        let mut users = Vec::new();
        while let Some(row) = rows.next()? {
            let value: String = row.get(0)?;
            users.push(parse_uuid(&value, "task_assignees.user_uuid")?);
        }
        Ok(users)
    }

    fn insert_assignee(&self, task: TaskId, user: UserId) -> StoreResult<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO task_assignees (task_uuid, user_uuid)
             VALUES (?1, ?2);",
            params![task.to_string(), user.to_string()],
        )?;
        Ok(inserted > 0)
    }

    fn delete_assignee(&self, task: TaskId, user: UserId) -> StoreResult<bool> {
        let removed = self.conn.execute(
            "DELETE FROM task_assignees WHERE task_uuid = ?1 AND user_uuid = ?2;",
            params![task.to_string(), user.to_string()],
        )?;
        Ok(removed > 0)
    }

    fn insert_comment(&self, task: TaskId, author: UserId, text: &str) -> StoreResult<Comment> {
        let id = Uuid::new_v4();
        let tx = self.write_tx()?;
        tx.execute(
            "INSERT INTO task_comments (comment_uuid, task_uuid, author_uuid, body)
             VALUES (?1, ?2, ?3, ?4);",
            params![id.to_string(), task.to_string(), author.to_string(), text],
        )?;
        let comment = load_comment(&tx, task, id)?
            .ok_or_else(|| StoreError::InvalidData(format!("comment {id} vanished")))?;
        tx.commit()?;
        Ok(comment)
    }

    fn get_comment(&self, task: TaskId, comment: CommentId) -> StoreResult<Option<Comment>> {
        load_comment(self.conn, task, comment)
    }

    fn list_comments(&self, task: TaskId) -> StoreResult<Vec<Comment>> {
        let mut stmt = self.conn.prepare(
            "SELECT comment_uuid, task_uuid, author_uuid, body, created_at
             FROM task_comments
             WHERE task_uuid = ?1
             ORDER BY created_at ASC, rowid ASC;",
        )?;
        let mut rows = stmt.query([task.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_comment_row(row)?);
        }
        Ok(items)
    }

    fn delete_comment(&self, task: TaskId, comment: CommentId) -> StoreResult<bool> {
        let removed = self.conn.execute(
            "DELETE FROM task_comments WHERE comment_uuid = ?1 AND task_uuid = ?2;",
            params![comment.to_string(), task.to_string()],
        )?;
        Ok(removed > 0)
    }

    fn insert_attachment(&self, task: TaskId, input: &NewAttachment) -> StoreResult<Attachment> {
        let id = Uuid::new_v4();
        let tx = self.write_tx()?;
        tx.execute(
            "INSERT INTO task_attachments (
                attachment_uuid,
                task_uuid,
                file_name,
                blob_ref,
                content_type,
                size_bytes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                id.to_string(),
                task.to_string(),
                input.file_name,
                input.blob_ref,
                input.content_type,
                input.size_bytes,
            ],
        )?;
        let attachment = load_attachment(&tx, task, id)?
            .ok_or_else(|| StoreError::InvalidData(format!("attachment {id} vanished")))?;
        tx.commit()?;
        Ok(attachment)
    }

    fn list_attachments(&self, task: TaskId) -> StoreResult<Vec<Attachment>> {
        let mut stmt = self.conn.prepare(
            "SELECT attachment_uuid, task_uuid, file_name, blob_ref, content_type, size_bytes,
                    uploaded_at
             FROM task_attachments
             WHERE task_uuid = ?1
             ORDER BY uploaded_at ASC, rowid ASC;",
        )?;
        let mut rows = stmt.query([task.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_attachment_row(row)?);
        }
        Ok(items)
    }

    fn delete_attachment(
        &self,
        task: TaskId,
        attachment: AttachmentId,
    ) -> StoreResult<Option<Attachment>> {
        let tx = self.write_tx()?;
        let Some(existing) = load_attachment(&tx, task, attachment)? else {
            return Ok(None);
        };
        tx.execute(
            "DELETE FROM task_attachments WHERE attachment_uuid = ?1;",
            [attachment.to_string()],
        )?;
        tx.commit()?;
        Ok(Some(existing))
    }
}

fn load_comment(conn: &Connection, task: TaskId, id: CommentId) -> StoreResult<Option<Comment>> {
    let mut stmt = conn.prepare(
        "SELECT comment_uuid, task_uuid, author_uuid, body, created_at
         FROM task_comments
         WHERE comment_uuid = ?1 AND task_uuid = ?2;",
    )?;
    let mut rows = stmt.query(params![id.to_string(), task.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_comment_row(row)?));
    }
    Ok(None)
}

fn load_attachment(
    conn: &Connection,
    task: TaskId,
    id: AttachmentId,
) -> StoreResult<Option<Attachment>> {
    let mut stmt = conn.prepare(
        "SELECT attachment_uuid, task_uuid, file_name, blob_ref, content_type, size_bytes,
                uploaded_at
         FROM task_attachments
         WHERE attachment_uuid = ?1 AND task_uuid = ?2;",
    )?;
    let mut rows = stmt.query(params![id.to_string(), task.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_attachment_row(row)?));
    }
    Ok(None)
}

fn parse_comment_row(row: &Row<'_>) -> StoreResult<Comment> {
    let id: String = row.get("comment_uuid")?;
    let task: String = row.get("task_uuid")?;
    let author: String = row.get("author_uuid")?;
    Ok(Comment {
        id: parse_uuid(&id, "task_comments.comment_uuid")?,
        task_id: parse_uuid(&task, "task_comments.task_uuid")?,
        author: parse_uuid(&author, "task_comments.author_uuid")?,
        text: row.get("body")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_attachment_row(row: &Row<'_>) -> StoreResult<Attachment> {
    let id: String = row.get("attachment_uuid")?;
    let task: String = row.get("task_uuid")?;
    Ok(Attachment {
        id: parse_uuid(&id, "task_attachments.attachment_uuid")?,
        task_id: parse_uuid(&task, "task_attachments.task_uuid")?,
        file_name: row.get("file_name")?,
        blob_ref: row.get("blob_ref")?,
        content_type: row.get("content_type")?,
        size_bytes: row.get("size_bytes")?,
        uploaded_at: row.get("uploaded_at")?,
    })
}
