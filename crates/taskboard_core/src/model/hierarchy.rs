//! Workspace, board, list and task read models.
//!
//! # Responsibility
//! - Define the records returned by storage and services.
//! - Define patch/input shapes accepted by update operations.
//!
//! # Invariants
//! - Every record carries its parent reference; positions are only
//!   meaningful relative to siblings of the same parent.

use crate::model::entity::{
    AttachmentId, BoardId, CommentId, ListId, TaskId, UserId, WorkspaceId,
};
use serde::{Deserialize, Serialize};

/// Default board background, matches the colour new boards get when none is
/// supplied.
pub const DEFAULT_BOARD_BACKGROUND: &str = "#0079bf";

/// Top-level container owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub name: String,
    pub description: Option<String>,
    pub owner: UserId,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Kanban board scoped to one workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: BoardId,
    pub workspace_id: WorkspaceId,
    pub name: String,
    pub description: Option<String>,
    /// `#rrggbb` colour.
    pub background: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Ordered column within a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardList {
    pub id: ListId,
    pub board_id: BoardId,
    pub name: String,
    pub position: f64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Task workflow status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Done,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::Done => "done",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "todo" => Some(Self::Todo),
            "in_progress" => Some(Self::InProgress),
            "done" => Some(Self::Done),
            _ => None,
        }
    }
}

/// Unit of work within a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub list_id: ListId,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    /// Epoch ms due date.
    pub due_at: Option<i64>,
    pub position: f64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Comment left on a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub task_id: TaskId,
    pub author: UserId,
    pub text: String,
    pub created_at: i64,
}

/// Attachment metadata; the bytes live in the external blob store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: AttachmentId,
    pub task_id: TaskId,
    pub file_name: String,
    /// Opaque blob store reference.
    pub blob_ref: String,
    pub content_type: Option<String>,
    pub size_bytes: Option<i64>,
    pub uploaded_at: i64,
}

/// Task with assignees, comments and attachments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDetail {
    pub task: Task,
    pub assignees: Vec<UserId>,
    pub comments: Vec<Comment>,
    pub attachments: Vec<Attachment>,
}

/// Input for board creation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewBoard {
    pub name: String,
    pub description: Option<String>,
    pub background: Option<String>,
}

/// Input for attachment registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttachment {
    pub file_name: String,
    pub blob_ref: String,
    pub content_type: Option<String>,
    pub size_bytes: Option<i64>,
}

/// Partial workspace update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspacePatch {
    pub name: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
}

/// Partial board update; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardPatch {
    pub name: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub background: Option<String>,
}

/// Partial task update of core fields; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub title: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    /// `Some(None)` clears the due date.
    pub due_at: Option<Option<i64>>,
}

/// Everything removed by one cascade delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub workspaces: usize,
    pub boards: usize,
    pub lists: usize,
    pub tasks: usize,
    pub memberships: usize,
    pub comments: usize,
    /// Blob references of removed attachments, for blob store cleanup.
    pub attachment_refs: Vec<String>,
}
