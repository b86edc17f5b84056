//! Ordering state persistence for sibling collections.
//!
//! # Responsibility
//! - Read the ordering slots of one collection.
//! - Write planned positions, and re-parent one item together with its new
//!   position.
//!
//! # Invariants
//! - A re-parented item's parent reference and position change in the same
//!   statement; no reader sees a stale parent/position pair.
//! - Position writes only touch rows that belong to the named collection.

use crate::model::entity::{CollectionRef, EntityRef};
use crate::ordering::OrderSlot;
use crate::repo::store::SqliteStore;
use crate::repo::{parse_uuid, StoreError, StoreResult};
use rusqlite::{params, Connection};
use uuid::Uuid;

/// Repository interface for collection ordering.
pub trait OrderRepository {
    /// Slots of `collection` sorted by position, insertion time, insertion
    /// sequence.
    fn order_slots(&self, collection: CollectionRef) -> StoreResult<Vec<OrderSlot>>;
    /// Writes positions for items that already belong to `collection`.
    fn write_positions(
        &self,
        collection: CollectionRef,
        positions: &[(Uuid, f64)],
    ) -> StoreResult<()>;
    /// Moves `item` from `from` into `to`, writing `positions` for the
    /// destination (which must include `item`).
    ///
    /// Assignees that are not members of the destination board are dropped
    /// from the moved task(s).
    fn reparent_item(
        &self,
        item: Uuid,
        from: CollectionRef,
        to: CollectionRef,
        positions: &[(Uuid, f64)],
    ) -> StoreResult<()>;
}

impl OrderRepository for SqliteStore<'_> {
    fn order_slots(&self, collection: CollectionRef) -> StoreResult<Vec<OrderSlot>> {
        let (sql, column) = match collection {
            CollectionRef::BoardLists(_) => (
                "SELECT list_uuid, position, created_at, rowid
                 FROM lists
                 WHERE board_uuid = ?1
                 ORDER BY position ASC, created_at ASC, rowid ASC;",
                "lists.list_uuid",
            ),
            CollectionRef::ListTasks(_) => (
                "SELECT task_uuid, position, created_at, rowid
                 FROM tasks
                 WHERE list_uuid = ?1
                 ORDER BY position ASC, created_at ASC, rowid ASC;",
                "tasks.task_uuid",
            ),
        };
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([collection.parent().id().to_string()])?;
        let mut slots = Vec::new();
        while let Some(row) = rows.next()? {
            let id: String = row.get(0)?;
            slots.push(OrderSlot {
                id: parse_uuid(&id, column)?,
                position: row.get(1)?,
                created_at: row.get(2)?,
                seq: row.get(3)?,
            });
        }
        Ok(slots)
    }

    fn write_positions(
        &self,
        collection: CollectionRef,
        positions: &[(Uuid, f64)],
    ) -> StoreResult<()> {
        let tx = self.write_tx()?;
        for (id, position) in positions {
            update_position(&tx, collection, *id, *position)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn reparent_item(
        &self,
        item: Uuid,
        from: CollectionRef,
        to: CollectionRef,
        positions: &[(Uuid, f64)],
    ) -> StoreResult<()> {
        if !from.same_kind(to) {
            return Err(StoreError::InvalidData(format!(
                "cannot move {} from {from} to {to}",
                from.item(item)
            )));
        }

        let tx = self.write_tx()?;
        let mut moved = false;
        for (id, position) in positions {
            if *id != item {
                update_position(&tx, to, *id, *position)?;
                continue;
            }

            let sql = match to {
                CollectionRef::BoardLists(_) => {
                    "UPDATE lists
                     SET board_uuid = ?3,
                         position = ?4,
                         updated_at = (strftime('%s', 'now') * 1000)
                     WHERE list_uuid = ?1 AND board_uuid = ?2;"
                }
                CollectionRef::ListTasks(_) => {
                    "UPDATE tasks
                     SET list_uuid = ?3,
                         position = ?4,
                         updated_at = (strftime('%s', 'now') * 1000)
                     WHERE task_uuid = ?1 AND list_uuid = ?2;"
                }
            };
            let changed = tx.execute(
                sql,
                params![
                    item.to_string(),
                    from.parent().id().to_string(),
                    to.parent().id().to_string(),
                    position
                ],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(from.item(item)));
            }
            moved = true;
        }
        if !moved {
            return Err(StoreError::InvalidData(format!(
                "position plan for {to} does not place {}",
                to.item(item)
            )));
        }

        prune_foreign_assignees(&tx, to.item(item))?;
        tx.commit()?;
        Ok(())
    }
}

fn update_position(
    conn: &Connection,
    collection: CollectionRef,
    id: Uuid,
    position: f64,
) -> StoreResult<()> {
    let sql = match collection {
        CollectionRef::BoardLists(_) => {
            "UPDATE lists SET position = ?3 WHERE list_uuid = ?1 AND board_uuid = ?2;"
        }
        CollectionRef::ListTasks(_) => {
            "UPDATE tasks SET position = ?3 WHERE task_uuid = ?1 AND list_uuid = ?2;"
        }
    };
    let changed = conn.execute(
        sql,
        params![id.to_string(), collection.parent().id().to_string(), position],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound(collection.item(id)));
    }
    Ok(())
}

/// Drops assignees of the moved entity's tasks that are not members of the
/// board those tasks now live on.
fn prune_foreign_assignees(conn: &Connection, moved: EntityRef) -> StoreResult<usize> {
    let tasks_sql = match moved {
        EntityRef::List(_) => "SELECT task_uuid FROM tasks WHERE list_uuid = ?1",
        EntityRef::Task(_) => "SELECT task_uuid FROM tasks WHERE task_uuid = ?1",
        EntityRef::Workspace(_) | EntityRef::Board(_) => return Ok(0),
    };
    let pruned = conn.execute(
        &format!(
            "DELETE FROM task_assignees
             WHERE task_uuid IN ({tasks_sql})
               AND NOT EXISTS (
                 SELECT 1
                 FROM tasks t
                 INNER JOIN lists l ON l.list_uuid = t.list_uuid
                 INNER JOIN board_members m ON m.board_uuid = l.board_uuid
                 WHERE t.task_uuid = task_assignees.task_uuid
                   AND m.user_uuid = task_assignees.user_uuid
               );"
        ),
        [moved.id().to_string()],
    )?;
    Ok(pruned)
}
