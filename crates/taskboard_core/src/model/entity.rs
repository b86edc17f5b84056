//! Entity identity and hierarchy references.
//!
//! # Responsibility
//! - Name every addressable node of the workspace → board → list → task tree.
//! - Describe the two ordered sibling collections (lists of a board, tasks of
//!   a list).
//!
//! # Invariants
//! - Ownership is strictly top-down; a reference never implies its ancestors
//!   exist, only resolution against storage does.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable workspace identifier.
pub type WorkspaceId = Uuid;
/// Stable board identifier.
pub type BoardId = Uuid;
/// Stable list identifier.
pub type ListId = Uuid;
/// Stable task identifier.
pub type TaskId = Uuid;
/// Stable comment identifier.
pub type CommentId = Uuid;
/// Stable attachment identifier.
pub type AttachmentId = Uuid;
/// User identifier resolved by the external identity provider.
pub type UserId = Uuid;

/// Typed reference to one node of the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntityRef {
    Workspace(WorkspaceId),
    Board(BoardId),
    List(ListId),
    Task(TaskId),
}

impl EntityRef {
    /// Raw identifier of the referenced entity.
    pub fn id(self) -> Uuid {
        match self {
            Self::Workspace(id) | Self::Board(id) | Self::List(id) | Self::Task(id) => id,
        }
    }

    /// Stable lowercase kind name used in logs and errors.
    pub fn kind_str(self) -> &'static str {
        match self {
            Self::Workspace(_) => "workspace",
            Self::Board(_) => "board",
            Self::List(_) => "list",
            Self::Task(_) => "task",
        }
    }
}

impl Display for EntityRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind_str(), self.id())
    }
}

/// Entity that carries its own membership set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum MemberScope {
    Workspace(WorkspaceId),
    Board(BoardId),
}

impl MemberScope {
    /// Converts a generic entity reference; only workspaces and boards hold
    /// membership records.
    pub fn from_entity(entity: EntityRef) -> Option<Self> {
        match entity {
            EntityRef::Workspace(id) => Some(Self::Workspace(id)),
            EntityRef::Board(id) => Some(Self::Board(id)),
            EntityRef::List(_) | EntityRef::Task(_) => None,
        }
    }

    pub fn entity(self) -> EntityRef {
        match self {
            Self::Workspace(id) => EntityRef::Workspace(id),
            Self::Board(id) => EntityRef::Board(id),
        }
    }
}

impl Display for MemberScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.entity().fmt(f)
    }
}

/// Ordered sibling collection owned by one parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionRef {
    /// Lists of one board.
    BoardLists(BoardId),
    /// Tasks of one list.
    ListTasks(ListId),
}

impl CollectionRef {
    /// Parent entity owning the collection.
    pub fn parent(self) -> EntityRef {
        match self {
            Self::BoardLists(id) => EntityRef::Board(id),
            Self::ListTasks(id) => EntityRef::List(id),
        }
    }

    /// Wraps an item id of this collection into an entity reference.
    pub fn item(self, id: Uuid) -> EntityRef {
        match self {
            Self::BoardLists(_) => EntityRef::List(id),
            Self::ListTasks(_) => EntityRef::Task(id),
        }
    }

    /// Returns whether both collections hold the same item kind.
    pub fn same_kind(self, other: CollectionRef) -> bool {
        matches!(
            (self, other),
            (Self::BoardLists(_), Self::BoardLists(_)) | (Self::ListTasks(_), Self::ListTasks(_))
        )
    }
}

impl Display for CollectionRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BoardLists(id) => write!(f, "lists of board {id}"),
            Self::ListTasks(id) => write!(f, "tasks of list {id}"),
        }
    }
}

/// Resolved ancestor chain of one entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityPath {
    pub workspace: WorkspaceId,
    pub board: Option<BoardId>,
    pub list: Option<ListId>,
    pub task: Option<TaskId>,
}
