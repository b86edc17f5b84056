//! Hard-delete of one entity together with everything below it.
//!
//! # Responsibility
//! - Remove a subtree bottom-up (attachments, comments, assignees, tasks,
//!   lists, board members, boards, workspace members, workspace) inside one
//!   `IMMEDIATE` transaction.
//! - Verify that no dangling descendant row survives before committing.
//!
//! # Invariants
//! - Either the whole subtree disappears or nothing changes.
//! - A missing root yields `StoreError::NotFound` and leaves storage intact.

use crate::model::entity::EntityRef;
use crate::model::hierarchy::CascadeReport;
use crate::repo::store::SqliteStore;
use crate::repo::{StoreError, StoreResult};
use rusqlite::Connection;

/// Named orphan probes run after every cascade, before commit.
const ORPHAN_CHECKS: &[(&str, &str)] = &[
    (
        "board_without_workspace",
        "SELECT COUNT(*) FROM boards b
         WHERE NOT EXISTS (SELECT 1 FROM workspaces w WHERE w.workspace_uuid = b.workspace_uuid);",
    ),
    (
        "list_without_board",
        "SELECT COUNT(*) FROM lists l
         WHERE NOT EXISTS (SELECT 1 FROM boards b WHERE b.board_uuid = l.board_uuid);",
    ),
    (
        "task_without_list",
        "SELECT COUNT(*) FROM tasks t
         WHERE NOT EXISTS (SELECT 1 FROM lists l WHERE l.list_uuid = t.list_uuid);",
    ),
    (
        "workspace_member_without_workspace",
        "SELECT COUNT(*) FROM workspace_members m
         WHERE NOT EXISTS (SELECT 1 FROM workspaces w WHERE w.workspace_uuid = m.workspace_uuid);",
    ),
    (
        "board_member_without_board",
        "SELECT COUNT(*) FROM board_members m
         WHERE NOT EXISTS (SELECT 1 FROM boards b WHERE b.board_uuid = m.board_uuid);",
    ),
    (
        "assignee_without_task",
        "SELECT COUNT(*) FROM task_assignees a
         WHERE NOT EXISTS (SELECT 1 FROM tasks t WHERE t.task_uuid = a.task_uuid);",
    ),
    (
        "comment_without_task",
        "SELECT COUNT(*) FROM task_comments c
         WHERE NOT EXISTS (SELECT 1 FROM tasks t WHERE t.task_uuid = c.task_uuid);",
    ),
    (
        "attachment_without_task",
        "SELECT COUNT(*) FROM task_attachments a
         WHERE NOT EXISTS (SELECT 1 FROM tasks t WHERE t.task_uuid = a.task_uuid);",
    ),
];

/// Repository interface for subtree removal.
pub trait CascadeRepository {
    /// Deletes `root` and all of its descendants, returning what was removed.
    fn delete_subtree(&self, root: EntityRef) -> StoreResult<CascadeReport>;
}

/// Row selectors for the descendants of one root, all bound to `?1`.
struct Subtree {
    boards: Option<&'static str>,
    lists: Option<&'static str>,
    tasks: &'static str,
}

impl Subtree {
    fn of(root: EntityRef) -> Self {
        match root {
            EntityRef::Workspace(_) => Self {
                boards: Some("SELECT board_uuid FROM boards WHERE workspace_uuid = ?1"),
                lists: Some(
                    "SELECT list_uuid FROM lists
                     WHERE board_uuid IN (SELECT board_uuid FROM boards WHERE workspace_uuid = ?1)",
                ),
                tasks: "SELECT task_uuid FROM tasks
                        WHERE list_uuid IN (
                          SELECT list_uuid FROM lists
                          WHERE board_uuid IN (
                            SELECT board_uuid FROM boards WHERE workspace_uuid = ?1
                          )
                        )",
            },
            EntityRef::Board(_) => Self {
                boards: Some("SELECT ?1"),
                lists: Some("SELECT list_uuid FROM lists WHERE board_uuid = ?1"),
                tasks: "SELECT task_uuid FROM tasks
                        WHERE list_uuid IN (SELECT list_uuid FROM lists WHERE board_uuid = ?1)",
            },
            EntityRef::List(_) => Self {
                boards: None,
                lists: Some("SELECT ?1"),
                tasks: "SELECT task_uuid FROM tasks WHERE list_uuid = ?1",
            },
            EntityRef::Task(_) => Self {
                boards: None,
                lists: None,
                tasks: "SELECT ?1",
            },
        }
    }
}

impl CascadeRepository for SqliteStore<'_> {
    fn delete_subtree(&self, root: EntityRef) -> StoreResult<CascadeReport> {
        let root_id = root.id().to_string();
        let subtree = Subtree::of(root);
        let tx = self.write_tx()?;

        if !root_exists(&tx, root)? {
            return Err(StoreError::NotFound(root));
        }

        let mut report = CascadeReport {
            attachment_refs: attachment_refs(&tx, subtree.tasks, &root_id)?,
            ..CascadeReport::default()
        };

        tx.execute(
            &format!("DELETE FROM task_attachments WHERE task_uuid IN ({});", subtree.tasks),
            [&root_id],
        )?;
        report.comments = tx.execute(
            &format!("DELETE FROM task_comments WHERE task_uuid IN ({});", subtree.tasks),
            [&root_id],
        )?;
        tx.execute(
            &format!("DELETE FROM task_assignees WHERE task_uuid IN ({});", subtree.tasks),
            [&root_id],
        )?;
        report.tasks = tx.execute(
            &format!("DELETE FROM tasks WHERE task_uuid IN ({});", subtree.tasks),
            [&root_id],
        )?;

        if let Some(lists) = subtree.lists {
            report.lists = tx.execute(
                &format!("DELETE FROM lists WHERE list_uuid IN ({lists});"),
                [&root_id],
            )?;
        }

        if let Some(boards) = subtree.boards {
            report.memberships += tx.execute(
                &format!("DELETE FROM board_members WHERE board_uuid IN ({boards});"),
                [&root_id],
            )?;
            report.boards = tx.execute(
                &format!("DELETE FROM boards WHERE board_uuid IN ({boards});"),
                [&root_id],
            )?;
        }

        if let EntityRef::Workspace(_) = root {
            report.memberships += tx.execute(
                "DELETE FROM workspace_members WHERE workspace_uuid = ?1;",
                [&root_id],
            )?;
            report.workspaces = tx.execute(
                "DELETE FROM workspaces WHERE workspace_uuid = ?1;",
                [&root_id],
            )?;
        }

        verify_no_orphans(&tx)?;
        tx.commit()?;
        Ok(report)
    }
}

fn root_exists(conn: &Connection, root: EntityRef) -> StoreResult<bool> {
    let sql = match root {
        EntityRef::Workspace(_) => {
            "SELECT EXISTS(SELECT 1 FROM workspaces WHERE workspace_uuid = ?1);"
        }
        EntityRef::Board(_) => "SELECT EXISTS(SELECT 1 FROM boards WHERE board_uuid = ?1);",
        EntityRef::List(_) => "SELECT EXISTS(SELECT 1 FROM lists WHERE list_uuid = ?1);",
        EntityRef::Task(_) => "SELECT EXISTS(SELECT 1 FROM tasks WHERE task_uuid = ?1);",
    };
    let exists: i64 = conn.query_row(sql, [root.id().to_string()], |row| row.get(0))?;
    Ok(exists == 1)
}

fn attachment_refs(conn: &Connection, tasks: &str, root_id: &str) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT blob_ref
         FROM task_attachments
         WHERE task_uuid IN ({tasks})
         ORDER BY uploaded_at ASC, rowid ASC;"
    ))?;
    let mut rows = stmt.query([root_id])?;
    let mut refs = Vec::new();
    while let Some(row) = rows.next()? {
        refs.push(row.get(0)?);
    }
    Ok(refs)
}

fn verify_no_orphans(conn: &Connection) -> StoreResult<()> {
    for &(check, sql) in ORPHAN_CHECKS {
        let violations: i64 = conn.query_row(sql, [], |row| row.get(0))?;
        if violations > 0 {
            return Err(StoreError::ConsistencyCheck { check, violations });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{Subtree, ORPHAN_CHECKS};
    use crate::model::entity::EntityRef;
    use uuid::Uuid;

    #[test]
    fn orphan_check_names_are_unique() {
        let mut names: Vec<_> = ORPHAN_CHECKS.iter().map(|(name, _)| *name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), ORPHAN_CHECKS.len());
    }

    #[test]
    fn task_subtree_touches_no_lists_or_boards() {
        let subtree = Subtree::of(EntityRef::Task(Uuid::new_v4()));
        assert!(subtree.lists.is_none());
        assert!(subtree.boards.is_none());
    }
}
