//! Workspace/board/list/task record persistence.
//!
//! # Responsibility
//! - Create, read and update hierarchy records.
//! - Resolve the ancestor chain of any entity in one query.
//!
//! # Invariants
//! - Creating a workspace also records its owner membership.
//! - Creating a board also records its creator as `admin` when requested.
//! - Sibling listings are deterministic:
//!   `position ASC, created_at ASC, rowid ASC`.

use crate::model::entity::{BoardId, EntityPath, EntityRef, ListId, TaskId, UserId, WorkspaceId};
use crate::model::hierarchy::{Board, BoardList, Task, TaskPatch, TaskStatus, Workspace};
use crate::model::membership::Role;
use crate::repo::store::SqliteStore;
use crate::repo::{parse_optional_uuid, parse_uuid, StoreError, StoreResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

const WORKSPACE_COLUMNS: &str =
    "workspace_uuid, name, description, owner_uuid, created_at, updated_at";
const BOARD_COLUMNS: &str =
    "board_uuid, workspace_uuid, name, description, background, created_at, updated_at";
const LIST_COLUMNS: &str = "list_uuid, board_uuid, name, position, created_at, updated_at";
const TASK_COLUMNS: &str = "task_uuid, list_uuid, title, description, status, due_at, position, \
     created_at, updated_at";

/// Repository interface for hierarchy records.
pub trait HierarchyRepository {
    /// Creates one workspace and its owner membership.
    fn insert_workspace(
        &self,
        name: &str,
        description: Option<&str>,
        owner: UserId,
    ) -> StoreResult<Workspace>;
    fn get_workspace(&self, id: WorkspaceId) -> StoreResult<Option<Workspace>>;
    /// Workspaces where `user` holds any role, oldest first.
    fn list_workspaces_for_user(&self, user: UserId) -> StoreResult<Vec<Workspace>>;
    fn update_workspace(
        &self,
        id: WorkspaceId,
        name: Option<&str>,
        description: Option<Option<&str>>,
    ) -> StoreResult<Workspace>;

    /// Creates one board; `admin` becomes its first board admin.
    fn insert_board(
        &self,
        workspace: WorkspaceId,
        name: &str,
        description: Option<&str>,
        background: &str,
        admin: Option<UserId>,
    ) -> StoreResult<Board>;
    fn get_board(&self, id: BoardId) -> StoreResult<Option<Board>>;
    fn list_boards(&self, workspace: WorkspaceId) -> StoreResult<Vec<Board>>;
    fn update_board(
        &self,
        id: BoardId,
        name: Option<&str>,
        description: Option<Option<&str>>,
        background: Option<&str>,
    ) -> StoreResult<Board>;

    fn insert_list(&self, board: BoardId, name: &str, position: f64) -> StoreResult<BoardList>;
    fn get_list(&self, id: ListId) -> StoreResult<Option<BoardList>>;
    /// Lists of one board in order.
    fn list_lists(&self, board: BoardId) -> StoreResult<Vec<BoardList>>;
    fn rename_list(&self, id: ListId, name: &str) -> StoreResult<BoardList>;

    fn insert_task(&self, list: ListId, title: &str, position: f64) -> StoreResult<Task>;
    fn get_task(&self, id: TaskId) -> StoreResult<Option<Task>>;
    /// Tasks of one list in order.
    fn list_tasks(&self, list: ListId) -> StoreResult<Vec<Task>>;
    /// Applies core-field changes; the patch must already be normalized.
    fn update_task(&self, id: TaskId, patch: &TaskPatch) -> StoreResult<Task>;

    /// Resolves the ancestor chain of `entity`; `None` when the entity is
    /// absent.
    fn resolve_path(&self, entity: EntityRef) -> StoreResult<Option<EntityPath>>;
}

impl HierarchyRepository for SqliteStore<'_> {
    fn insert_workspace(
        &self,
        name: &str,
        description: Option<&str>,
        owner: UserId,
    ) -> StoreResult<Workspace> {
        let id = Uuid::new_v4();
        let tx = self.write_tx()?;
        tx.execute(
            "INSERT INTO workspaces (workspace_uuid, name, description, owner_uuid)
             VALUES (?1, ?2, ?3, ?4);",
            params![id.to_string(), name, description, owner.to_string()],
        )?;
        tx.execute(
            "INSERT INTO workspace_members (workspace_uuid, user_uuid, role)
             VALUES (?1, ?2, ?3);",
            params![id.to_string(), owner.to_string(), Role::Owner.as_str()],
        )?;
        let workspace = load_workspace(&tx, id)?
            .ok_or(StoreError::NotFound(EntityRef::Workspace(id)))?;
        tx.commit()?;
        Ok(workspace)
    }

    fn get_workspace(&self, id: WorkspaceId) -> StoreResult<Option<Workspace>> {
        load_workspace(self.conn, id)
    }

    fn list_workspaces_for_user(&self, user: UserId) -> StoreResult<Vec<Workspace>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                w.workspace_uuid AS workspace_uuid,
                w.name AS name,
                w.description AS description,
                w.owner_uuid AS owner_uuid,
                w.created_at AS created_at,
                w.updated_at AS updated_at
             FROM workspaces w
             INNER JOIN workspace_members m ON m.workspace_uuid = w.workspace_uuid
             WHERE m.user_uuid = ?1
             ORDER BY w.created_at ASC, w.rowid ASC;",
        )?;
        let mut rows = stmt.query([user.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_workspace_row(row)?);
        }
        Ok(items)
    }

    fn update_workspace(
        &self,
        id: WorkspaceId,
        name: Option<&str>,
        description: Option<Option<&str>>,
    ) -> StoreResult<Workspace> {
        let tx = self.write_tx()?;
        let changed = tx.execute(
            "UPDATE workspaces
             SET name = COALESCE(?2, name),
                 description = CASE WHEN ?3 THEN ?4 ELSE description END,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE workspace_uuid = ?1;",
            params![
                id.to_string(),
                name,
                description.is_some(),
                description.flatten()
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(EntityRef::Workspace(id)));
        }
        let workspace = load_workspace(&tx, id)?
            .ok_or(StoreError::NotFound(EntityRef::Workspace(id)))?;
        tx.commit()?;
        Ok(workspace)
    }

    fn insert_board(
        &self,
        workspace: WorkspaceId,
        name: &str,
        description: Option<&str>,
        background: &str,
        admin: Option<UserId>,
    ) -> StoreResult<Board> {
        let id = Uuid::new_v4();
        let tx = self.write_tx()?;
        tx.execute(
            "INSERT INTO boards (board_uuid, workspace_uuid, name, description, background)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                id.to_string(),
                workspace.to_string(),
                name,
                description,
                background
            ],
        )?;
        if let Some(admin) = admin {
            tx.execute(
                "INSERT INTO board_members (board_uuid, user_uuid, role)
                 VALUES (?1, ?2, ?3);",
                params![id.to_string(), admin.to_string(), Role::Admin.as_str()],
            )?;
        }
        let board = load_board(&tx, id)?
            .ok_or(StoreError::NotFound(EntityRef::Board(id)))?;
        tx.commit()?;
        Ok(board)
    }

    fn get_board(&self, id: BoardId) -> StoreResult<Option<Board>> {
        load_board(self.conn, id)
    }

    fn list_boards(&self, workspace: WorkspaceId) -> StoreResult<Vec<Board>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {BOARD_COLUMNS}
             FROM boards
             WHERE workspace_uuid = ?1
             ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([workspace.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_board_row(row)?);
        }
        Ok(items)
    }

    fn update_board(
        &self,
        id: BoardId,
        name: Option<&str>,
        description: Option<Option<&str>>,
        background: Option<&str>,
    ) -> StoreResult<Board> {
        let tx = self.write_tx()?;
        let changed = tx.execute(
            "UPDATE boards
             SET name = COALESCE(?2, name),
                 description = CASE WHEN ?3 THEN ?4 ELSE description END,
                 background = COALESCE(?5, background),
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE board_uuid = ?1;",
            params![
                id.to_string(),
                name,
                description.is_some(),
                description.flatten(),
                background
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(EntityRef::Board(id)));
        }
        let board = load_board(&tx, id)?
            .ok_or(StoreError::NotFound(EntityRef::Board(id)))?;
        tx.commit()?;
        Ok(board)
    }

    fn insert_list(&self, board: BoardId, name: &str, position: f64) -> StoreResult<BoardList> {
        let id = Uuid::new_v4();
        let tx = self.write_tx()?;
        tx.execute(
            "INSERT INTO lists (list_uuid, board_uuid, name, position)
             VALUES (?1, ?2, ?3, ?4);",
            params![id.to_string(), board.to_string(), name, position],
        )?;
        let list = load_list(&tx, id)?
            .ok_or(StoreError::NotFound(EntityRef::List(id)))?;
        tx.commit()?;
        Ok(list)
    }

    fn get_list(&self, id: ListId) -> StoreResult<Option<BoardList>> {
        load_list(self.conn, id)
    }

    fn list_lists(&self, board: BoardId) -> StoreResult<Vec<BoardList>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {LIST_COLUMNS}
             FROM lists
             WHERE board_uuid = ?1
             ORDER BY position ASC, created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([board.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_list_row(row)?);
        }
        Ok(items)
    }

    fn rename_list(&self, id: ListId, name: &str) -> StoreResult<BoardList> {
        let tx = self.write_tx()?;
        let changed = tx.execute(
            "UPDATE lists
             SET name = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE list_uuid = ?1;",
            params![id.to_string(), name],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(EntityRef::List(id)));
        }
        let list = load_list(&tx, id)?
            .ok_or(StoreError::NotFound(EntityRef::List(id)))?;
        tx.commit()?;
        Ok(list)
    }

    fn insert_task(&self, list: ListId, title: &str, position: f64) -> StoreResult<Task> {
        let id = Uuid::new_v4();
        let tx = self.write_tx()?;
        tx.execute(
            "INSERT INTO tasks (task_uuid, list_uuid, title, status, position)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                id.to_string(),
                list.to_string(),
                title,
                TaskStatus::Todo.as_str(),
                position
            ],
        )?;
        let task = load_task(&tx, id)?
            .ok_or(StoreError::NotFound(EntityRef::Task(id)))?;
        tx.commit()?;
        Ok(task)
    }

    fn get_task(&self, id: TaskId) -> StoreResult<Option<Task>> {
        load_task(self.conn, id)
    }

    fn list_tasks(&self, list: ListId) -> StoreResult<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS}
             FROM tasks
             WHERE list_uuid = ?1
             ORDER BY position ASC, created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([list.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_task_row(row)?);
        }
        Ok(items)
    }

    fn update_task(&self, id: TaskId, patch: &TaskPatch) -> StoreResult<Task> {
        let tx = self.write_tx()?;
        let changed = tx.execute(
            "UPDATE tasks
             SET title = COALESCE(?2, title),
                 description = CASE WHEN ?3 THEN ?4 ELSE description END,
                 status = COALESCE(?5, status),
                 due_at = CASE WHEN ?6 THEN ?7 ELSE due_at END,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE task_uuid = ?1;",
            params![
                id.to_string(),
                patch.title.as_deref(),
                patch.description.is_some(),
                patch.description.as_ref().and_then(Option::as_deref),
                patch.status.map(TaskStatus::as_str),
                patch.due_at.is_some(),
                patch.due_at.flatten(),
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(EntityRef::Task(id)));
        }
        let task = load_task(&tx, id)?
            .ok_or(StoreError::NotFound(EntityRef::Task(id)))?;
        tx.commit()?;
        Ok(task)
    }

    fn resolve_path(&self, entity: EntityRef) -> StoreResult<Option<EntityPath>> {
        let sql = match entity {
            EntityRef::Workspace(_) => {
                "SELECT workspace_uuid, NULL, NULL, NULL
                 FROM workspaces
                 WHERE workspace_uuid = ?1;"
            }
            EntityRef::Board(_) => {
                "SELECT b.workspace_uuid, b.board_uuid, NULL, NULL
                 FROM boards b
                 INNER JOIN workspaces w ON w.workspace_uuid = b.workspace_uuid
                 WHERE b.board_uuid = ?1;"
            }
            EntityRef::List(_) => {
                "SELECT b.workspace_uuid, b.board_uuid, l.list_uuid, NULL
                 FROM lists l
                 INNER JOIN boards b ON b.board_uuid = l.board_uuid
                 INNER JOIN workspaces w ON w.workspace_uuid = b.workspace_uuid
                 WHERE l.list_uuid = ?1;"
            }
            EntityRef::Task(_) => {
                "SELECT b.workspace_uuid, b.board_uuid, l.list_uuid, t.task_uuid
                 FROM tasks t
                 INNER JOIN lists l ON l.list_uuid = t.list_uuid
                 INNER JOIN boards b ON b.board_uuid = l.board_uuid
                 INNER JOIN workspaces w ON w.workspace_uuid = b.workspace_uuid
                 WHERE t.task_uuid = ?1;"
            }
        };

        let raw = self
            .conn
            .query_row(sql, [entity.id().to_string()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })
            .optional()?;

        let Some((workspace, board, list, task)) = raw else {
            return Ok(None);
        };
        Ok(Some(EntityPath {
            workspace: parse_uuid(&workspace, "workspaces.workspace_uuid")?,
            board: parse_optional_uuid(board, "boards.board_uuid")?,
            list: parse_optional_uuid(list, "lists.list_uuid")?,
            task: parse_optional_uuid(task, "tasks.task_uuid")?,
        }))
    }
}

pub(crate) fn load_workspace(conn: &Connection, id: WorkspaceId) -> StoreResult<Option<Workspace>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {WORKSPACE_COLUMNS} FROM workspaces WHERE workspace_uuid = ?1;"
    ))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_workspace_row(row)?));
    }
    Ok(None)
}

pub(crate) fn load_board(conn: &Connection, id: BoardId) -> StoreResult<Option<Board>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOARD_COLUMNS} FROM boards WHERE board_uuid = ?1;"
    ))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_board_row(row)?));
    }
    Ok(None)
}

pub(crate) fn load_list(conn: &Connection, id: ListId) -> StoreResult<Option<BoardList>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {LIST_COLUMNS} FROM lists WHERE list_uuid = ?1;"
    ))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_list_row(row)?));
    }
    Ok(None)
}

pub(crate) fn load_task(conn: &Connection, id: TaskId) -> StoreResult<Option<Task>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TASK_COLUMNS} FROM tasks WHERE task_uuid = ?1;"
    ))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_task_row(row)?));
    }
    Ok(None)
}

fn parse_workspace_row(row: &Row<'_>) -> StoreResult<Workspace> {
    let id: String = row.get("workspace_uuid")?;
    let owner: String = row.get("owner_uuid")?;
    Ok(Workspace {
        id: parse_uuid(&id, "workspaces.workspace_uuid")?,
        name: row.get("name")?,
        description: row.get("description")?,
        owner: parse_uuid(&owner, "workspaces.owner_uuid")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_board_row(row: &Row<'_>) -> StoreResult<Board> {
    let id: String = row.get("board_uuid")?;
    let workspace: String = row.get("workspace_uuid")?;
    Ok(Board {
        id: parse_uuid(&id, "boards.board_uuid")?,
        workspace_id: parse_uuid(&workspace, "boards.workspace_uuid")?,
        name: row.get("name")?,
        description: row.get("description")?,
        background: row.get("background")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_list_row(row: &Row<'_>) -> StoreResult<BoardList> {
    let id: String = row.get("list_uuid")?;
    let board: String = row.get("board_uuid")?;
    Ok(BoardList {
        id: parse_uuid(&id, "lists.list_uuid")?,
        board_id: parse_uuid(&board, "lists.board_uuid")?,
        name: row.get("name")?,
        position: row.get("position")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_task_row(row: &Row<'_>) -> StoreResult<Task> {
    let id: String = row.get("task_uuid")?;
    let list: String = row.get("list_uuid")?;
    let status_text: String = row.get("status")?;
    let status = TaskStatus::parse(&status_text).ok_or_else(|| {
        StoreError::InvalidData(format!("invalid task status `{status_text}` in tasks.status"))
    })?;
    Ok(Task {
        id: parse_uuid(&id, "tasks.task_uuid")?,
        list_id: parse_uuid(&list, "tasks.list_uuid")?,
        title: row.get("title")?,
        description: row.get("description")?,
        status,
        due_at: row.get("due_at")?,
        position: row.get("position")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
