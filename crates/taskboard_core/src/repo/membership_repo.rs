//! Membership record persistence, keyed by `(scope, user)`.
//!
//! # Invariants
//! - Removing a workspace member also removes their board memberships in
//!   that workspace and their task assignments there, in one transaction.
//! - Removing a board member also drops their task assignments on that
//!   board.

use crate::model::entity::{MemberScope, UserId};
use crate::model::membership::{MemberRemoval, Membership, Role};
use crate::repo::store::SqliteStore;
use crate::repo::{parse_uuid, StoreError, StoreResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Repository interface for the membership registry.
pub trait MembershipRepository {
    /// Direct role at `scope`, without any inheritance.
    fn member_role(&self, scope: MemberScope, user: UserId) -> StoreResult<Option<Role>>;
    /// Members of `scope`, oldest first.
    fn list_members(&self, scope: MemberScope) -> StoreResult<Vec<Membership>>;
    fn insert_member(&self, scope: MemberScope, user: UserId, role: Role)
        -> StoreResult<Membership>;
    /// Returns `None` when `user` holds no record at `scope`.
    fn update_member_role(
        &self,
        scope: MemberScope,
        user: UserId,
        role: Role,
    ) -> StoreResult<Option<Membership>>;
    /// Deletes one record plus its dependent records; `None` when absent.
    fn delete_member(&self, scope: MemberScope, user: UserId)
        -> StoreResult<Option<MemberRemoval>>;
}

impl MembershipRepository for SqliteStore<'_> {
    fn member_role(&self, scope: MemberScope, user: UserId) -> StoreResult<Option<Role>> {
        let sql = match scope {
            MemberScope::Workspace(_) => {
                "SELECT role FROM workspace_members WHERE workspace_uuid = ?1 AND user_uuid = ?2;"
            }
            MemberScope::Board(_) => {
                "SELECT role FROM board_members WHERE board_uuid = ?1 AND user_uuid = ?2;"
            }
        };
        let value: Option<String> = self
            .conn
            .query_row(
                sql,
                params![scope.entity().id().to_string(), user.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        value.as_deref().map(parse_role).transpose()
    }

    fn list_members(&self, scope: MemberScope) -> StoreResult<Vec<Membership>> {
        let sql = match scope {
            MemberScope::Workspace(_) => {
                "SELECT user_uuid, role, joined_at
                 FROM workspace_members
                 WHERE workspace_uuid = ?1
                 ORDER BY joined_at ASC, rowid ASC;"
            }
            MemberScope::Board(_) => {
                "SELECT user_uuid, role, joined_at
                 FROM board_members
                 WHERE board_uuid = ?1
                 ORDER BY joined_at ASC, rowid ASC;"
            }
        };
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([scope.entity().id().to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_membership_row(scope, row)?);
        }
        Ok(items)
    }

    fn insert_member(
        &self,
        scope: MemberScope,
        user: UserId,
        role: Role,
    ) -> StoreResult<Membership> {
        let sql = match scope {
            MemberScope::Workspace(_) => {
                "INSERT INTO workspace_members (workspace_uuid, user_uuid, role)
                 VALUES (?1, ?2, ?3);"
            }
            MemberScope::Board(_) => {
                "INSERT INTO board_members (board_uuid, user_uuid, role)
                 VALUES (?1, ?2, ?3);"
            }
        };
        let tx = self.write_tx()?;
        tx.execute(
            sql,
            params![scope.entity().id().to_string(), user.to_string(), role.as_str()],
        )?;
        let membership = load_membership(&tx, scope, user)?.ok_or_else(|| {
            StoreError::InvalidData(format!("membership of {user} at {scope} vanished"))
        })?;
        tx.commit()?;
        Ok(membership)
    }

    fn update_member_role(
        &self,
        scope: MemberScope,
        user: UserId,
        role: Role,
    ) -> StoreResult<Option<Membership>> {
        let sql = match scope {
            MemberScope::Workspace(_) => {
                "UPDATE workspace_members SET role = ?3 WHERE workspace_uuid = ?1 AND user_uuid = ?2;"
            }
            MemberScope::Board(_) => {
                "UPDATE board_members SET role = ?3 WHERE board_uuid = ?1 AND user_uuid = ?2;"
            }
        };
        let tx = self.write_tx()?;
        let changed = tx.execute(
            sql,
            params![scope.entity().id().to_string(), user.to_string(), role.as_str()],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        let membership = load_membership(&tx, scope, user)?;
        tx.commit()?;
        Ok(membership)
    }

    fn delete_member(
        &self,
        scope: MemberScope,
        user: UserId,
    ) -> StoreResult<Option<MemberRemoval>> {
        let scope_id = scope.entity().id().to_string();
        let user_id = user.to_string();
        let tx = self.write_tx()?;

        let removal = match scope {
            MemberScope::Workspace(_) => {
                let task_assignments = tx.execute(
                    "DELETE FROM task_assignees
                     WHERE user_uuid = ?2
                       AND task_uuid IN (
                         SELECT t.task_uuid
                         FROM tasks t
                         INNER JOIN lists l ON l.list_uuid = t.list_uuid
                         INNER JOIN boards b ON b.board_uuid = l.board_uuid
                         WHERE b.workspace_uuid = ?1
                       );",
                    params![scope_id, user_id],
                )?;
                let board_memberships = tx.execute(
                    "DELETE FROM board_members
                     WHERE user_uuid = ?2
                       AND board_uuid IN (
                         SELECT board_uuid FROM boards WHERE workspace_uuid = ?1
                       );",
                    params![scope_id, user_id],
                )?;
                let removed = tx.execute(
                    "DELETE FROM workspace_members WHERE workspace_uuid = ?1 AND user_uuid = ?2;",
                    params![scope_id, user_id],
                )?;
                (removed > 0).then_some(MemberRemoval {
                    board_memberships,
                    task_assignments,
                })
            }
            MemberScope::Board(_) => {
                let task_assignments = tx.execute(
                    "DELETE FROM task_assignees
                     WHERE user_uuid = ?2
                       AND task_uuid IN (
                         SELECT t.task_uuid
                         FROM tasks t
                         INNER JOIN lists l ON l.list_uuid = t.list_uuid
                         WHERE l.board_uuid = ?1
                       );",
                    params![scope_id, user_id],
                )?;
                let removed = tx.execute(
                    "DELETE FROM board_members WHERE board_uuid = ?1 AND user_uuid = ?2;",
                    params![scope_id, user_id],
                )?;
                (removed > 0).then_some(MemberRemoval {
                    board_memberships: 0,
                    task_assignments,
                })
            }
        };

        // Nothing to remove: dropping `tx` rolls back the dependent deletes.
        if removal.is_some() {
            tx.commit()?;
        }
        Ok(removal)
    }
}

fn load_membership(
    conn: &Connection,
    scope: MemberScope,
    user: UserId,
) -> StoreResult<Option<Membership>> {
    let sql = match scope {
        MemberScope::Workspace(_) => {
            "SELECT user_uuid, role, joined_at
             FROM workspace_members
             WHERE workspace_uuid = ?1 AND user_uuid = ?2;"
        }
        MemberScope::Board(_) => {
            "SELECT user_uuid, role, joined_at
             FROM board_members
             WHERE board_uuid = ?1 AND user_uuid = ?2;"
        }
    };
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params![scope.entity().id().to_string(), user.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_membership_row(scope, row)?));
    }
    Ok(None)
}

fn parse_membership_row(scope: MemberScope, row: &Row<'_>) -> StoreResult<Membership> {
    let user: String = row.get("user_uuid")?;
    let role: String = row.get("role")?;
    Ok(Membership {
        scope,
        user: parse_uuid(&user, "members.user_uuid")?,
        role: parse_role(&role)?,
        joined_at: row.get("joined_at")?,
    })
}

fn parse_role(value: &str) -> StoreResult<Role> {
    Role::parse(value)
        .ok_or_else(|| StoreError::InvalidData(format!("invalid role `{value}` in members.role")))
}
