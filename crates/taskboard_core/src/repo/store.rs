//! SQLite-backed board store.
//!
//! # Responsibility
//! - Own the borrowed connection every repository trait runs against.
//! - Refuse connections that were not migrated by this binary.

use crate::db::migrations::latest_version;
use crate::repo::{StoreError, StoreResult};
use rusqlite::{Connection, Transaction, TransactionBehavior};

const REQUIRED_TABLES: &[&str] = &[
    "workspaces",
    "workspace_members",
    "boards",
    "board_members",
    "lists",
    "tasks",
    "task_assignees",
    "task_comments",
    "task_attachments",
];

/// SQLite implementation of every board repository trait.
pub struct SqliteStore<'conn> {
    pub(crate) conn: &'conn Connection,
}

impl<'conn> SqliteStore<'conn> {
    /// Creates store from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_store_connection_ready(conn)?;
        Ok(Self { conn })
    }

    /// Opens one write transaction that takes the database write lock up
    /// front, so reads inside it cannot go stale.
    pub(crate) fn write_tx(&self) -> StoreResult<Transaction<'conn>> {
        Ok(Transaction::new_unchecked(
            self.conn,
            TransactionBehavior::Immediate,
        )?)
    }
}

fn ensure_store_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in REQUIRED_TABLES {
        if !table_exists(conn, table)? {
            return Err(StoreError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
