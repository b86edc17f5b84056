use rusqlite::Connection;
use taskboard_core::db::migrations::latest_version;
use taskboard_core::db::{open_db, open_db_in_memory, open_db_with_config, DbError};
use taskboard_core::{ConfigError, CoreConfig, SqliteStore, StoreError};

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in [
        "workspaces",
        "workspace_members",
        "boards",
        "board_members",
        "lists",
        "tasks",
        "task_assignees",
        "task_comments",
        "task_attachments",
    ] {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn connections_enforce_foreign_keys() {
    let conn = open_db_in_memory().unwrap();

    let enabled: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enabled, 1);

    let err = conn
        .execute(
            "INSERT INTO lists (list_uuid, board_uuid, name, position)
             VALUES ('list-1', 'missing-board', 'Todo', 0);",
            [],
        )
        .unwrap_err();
    assert!(err.to_string().contains("FOREIGN KEY"));
}

#[test]
fn workspace_accepts_only_one_owner_row() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO workspaces (workspace_uuid, name, owner_uuid) VALUES ('w1', 'W', 'u1');
         INSERT INTO workspace_members (workspace_uuid, user_uuid, role) VALUES ('w1', 'u1', 'owner');",
    )
    .unwrap();

    let err = conn
        .execute(
            "INSERT INTO workspace_members (workspace_uuid, user_uuid, role)
             VALUES ('w1', 'u2', 'owner');",
            [],
        )
        .unwrap_err();
    assert!(err.to_string().contains("UNIQUE"));
}

#[test]
fn board_members_reject_owner_role() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO workspaces (workspace_uuid, name, owner_uuid) VALUES ('w1', 'W', 'u1');
         INSERT INTO boards (board_uuid, workspace_uuid, name) VALUES ('b1', 'w1', 'B');",
    )
    .unwrap();

    let err = conn
        .execute(
            "INSERT INTO board_members (board_uuid, user_uuid, role) VALUES ('b1', 'u1', 'owner');",
            [],
        )
        .unwrap_err();
    assert!(err.to_string().contains("CHECK"));
}

#[test]
fn store_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();

    let err = match SqliteStore::try_new(&conn) {
        Ok(_) => panic!("unmigrated connection must be rejected"),
        Err(err) => err,
    };
    assert!(matches!(
        err,
        StoreError::UninitializedConnection {
            actual_version: 0,
            ..
        }
    ));
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taskboard.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "tasks");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn invalid_config_is_rejected_before_creating_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("never.db");
    let config = CoreConfig {
        busy_timeout_ms: 0,
        ..CoreConfig::default()
    };

    let err = open_db_with_config(&path, &config).unwrap_err();
    assert!(matches!(
        err,
        DbError::InvalidConfig(ConfigError::ZeroBusyTimeout)
    ));
    assert!(!path.exists());
}

#[test]
fn failed_migration_names_the_script_and_keeps_version() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("foreign.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("CREATE TABLE workspace_members (legacy_id INTEGER PRIMARY KEY);")
        .unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    assert!(matches!(
        err,
        DbError::Migration {
            version: 1,
            name: "workspaces_boards",
            ..
        }
    ));

    let conn = Connection::open(&path).unwrap();
    assert_eq!(schema_version(&conn), 0);
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
