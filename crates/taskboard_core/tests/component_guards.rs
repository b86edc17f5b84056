use rusqlite::Connection;
use taskboard_core::db::open_db_in_memory;
use taskboard_core::service::{CascadeCoordinator, MembershipRegistry, OrderedCollections};
use taskboard_core::{
    Actor, Board, BoardService, CollectionRef, EntityRef, MemberScope, NewBoard, OrderingConfig,
    Role, ScopeKey, ScopeLocks, ServiceError, SqliteStore, Workspace,
};
use uuid::Uuid;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn seed(conn: &Connection, owner: &Actor) -> (Workspace, Board) {
    let service = BoardService::new(SqliteStore::try_new(conn).unwrap());
    let workspace = service.create_workspace(owner, "W", None).unwrap();
    let board = service
        .create_board(
            owner,
            workspace.id,
            NewBoard {
                name: "B".to_string(),
                ..NewBoard::default()
            },
        )
        .unwrap();
    for name in ["A", "B", "C"] {
        service.create_list(owner, board.id, name).unwrap();
    }
    (workspace, board)
}

#[test]
fn registry_requires_the_target_scope() {
    let conn = setup();
    let owner = Actor::user(Uuid::new_v4());
    let (workspace, board) = seed(&conn, &owner);
    let store = SqliteStore::try_new(&conn).unwrap();
    let registry = MembershipRegistry::new(&store);
    let locks = ScopeLocks::new();
    let user = Uuid::new_v4();

    let guard = locks.acquire([ScopeKey::Board(board.id)]);
    let err = registry
        .add_member(&guard, MemberScope::Workspace(workspace.id), user, Role::Member)
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::ScopeNotHeld(ScopeKey::Workspace(id)) if id == workspace.id
    ));
    drop(guard);

    let scope = MemberScope::Workspace(workspace.id);
    assert_eq!(registry.role_of(scope, user).unwrap(), None);
    assert_eq!(registry.role_of(scope, owner.user).unwrap(), Some(Role::Owner));

    let guard = locks.acquire([ScopeKey::Workspace(workspace.id)]);
    registry.add_member(&guard, scope, user, Role::Admin).unwrap();
    assert_eq!(registry.role_of(scope, user).unwrap(), Some(Role::Admin));
}

#[test]
fn renumber_rewrites_dense_positions_in_current_order() {
    let conn = setup();
    let owner = Actor::user(Uuid::new_v4());
    let (_, board) = seed(&conn, &owner);
    let store = SqliteStore::try_new(&conn).unwrap();
    let config = OrderingConfig::default();
    let collections = OrderedCollections::new(&store, &config);
    let collection = CollectionRef::BoardLists(board.id);
    let locks = ScopeLocks::new();

    let before = collections.ordered_ids(collection).unwrap();
    assert_eq!(before.len(), 3);

    let wrong = locks.acquire([ScopeKey::List(before[0])]);
    let err = collections.renumber(&wrong, collection).unwrap_err();
    assert!(matches!(err, ServiceError::ScopeNotHeld(ScopeKey::Board(_))));
    drop(wrong);

    let guard = locks.acquire([ScopeKey::from(collection)]);
    collections.renumber(&guard, collection).unwrap();
    assert_eq!(collections.ordered_ids(collection).unwrap(), before);

    let positions: Vec<f64> = conn
        .prepare("SELECT position FROM lists WHERE board_uuid = ?1 ORDER BY position;")
        .unwrap()
        .query_map([board.id.to_string()], |row| row.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(positions, vec![0.0, 1.0, 2.0]);
}

#[test]
fn cascade_refuses_to_run_without_every_scope() {
    let conn = setup();
    let owner = Actor::user(Uuid::new_v4());
    let (workspace, board) = seed(&conn, &owner);
    let store = SqliteStore::try_new(&conn).unwrap();
    let cascade = CascadeCoordinator::new(&store);
    let locks = ScopeLocks::new();
    let root = EntityRef::Board(board.id);

    let keys = cascade.scopes_for(root).unwrap();
    assert_eq!(keys.len(), 5);
    assert_eq!(keys[0], ScopeKey::Workspace(workspace.id));
    assert_eq!(keys[1], ScopeKey::Board(board.id));
    assert!(keys[2..].iter().all(|key| matches!(key, ScopeKey::List(_))));

    let partial = locks.acquire(keys[..2].iter().copied());
    let err = cascade.delete(&partial, root).unwrap_err();
    assert!(matches!(err, ServiceError::ScopeNotHeld(ScopeKey::List(_))));
    drop(partial);
    let lists: i64 = conn
        .query_row("SELECT COUNT(*) FROM lists;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(lists, 3);

    let guard = locks.acquire(keys);
    let report = cascade.delete(&guard, root).unwrap();
    assert_eq!(report.lists, 3);
}
