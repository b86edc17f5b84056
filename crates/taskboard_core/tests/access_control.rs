use rusqlite::Connection;
use taskboard_core::db::open_db_in_memory;
use taskboard_core::{
    Action, Actor, Board, BoardService, EntityRef, ErrorKind, NewBoard, Role, ServiceError,
    SqliteStore, Workspace,
};
use uuid::Uuid;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn workspace_with_board(
    service: &BoardService<SqliteStore<'_>>,
    owner: &Actor,
) -> (Workspace, Board) {
    let workspace = service.create_workspace(owner, "Acme", None).unwrap();
    let board = service
        .create_board(
            owner,
            workspace.id,
            NewBoard {
                name: "Roadmap".to_string(),
                ..NewBoard::default()
            },
        )
        .unwrap();
    (workspace, board)
}

#[test]
fn workspace_membership_alone_does_not_open_boards() {
    let conn = setup();
    let service = BoardService::new(SqliteStore::try_new(&conn).unwrap());
    let owner = Actor::user(Uuid::new_v4());
    let (workspace, board) = workspace_with_board(&service, &owner);
    let member = Actor::user(Uuid::new_v4());
    service
        .add_member(&owner, EntityRef::Workspace(workspace.id), member.user, Role::Admin)
        .unwrap();

    assert!(service.get_workspace(&member, workspace.id).is_ok());
    let err = service.get_board(&member, board.id).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Forbidden { action: Action::ReadBoard, user, .. } if user == member.user
    ));
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    assert!(service.list_boards(&member, workspace.id).unwrap().is_empty());
}

#[test]
fn workspace_owner_needs_a_board_record_too() {
    let conn = setup();
    let service = BoardService::new(SqliteStore::try_new(&conn).unwrap());
    let owner = Actor::user(Uuid::new_v4());
    let workspace = service.create_workspace(&owner, "Acme", None).unwrap();
    let admin = Actor::user(Uuid::new_v4());
    service
        .add_member(&owner, EntityRef::Workspace(workspace.id), admin.user, Role::Admin)
        .unwrap();
    let board = service
        .create_board(
            &admin,
            workspace.id,
            NewBoard {
                name: "Private".to_string(),
                ..NewBoard::default()
            },
        )
        .unwrap();

    let err = service.get_board(&owner, board.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    service
        .add_member(&admin, EntityRef::Board(board.id), owner.user, Role::Member)
        .unwrap();
    assert_eq!(service.get_board(&owner, board.id).unwrap().id, board.id);
}

#[test]
fn missing_entities_report_not_found_before_forbidden() {
    let conn = setup();
    let service = BoardService::new(SqliteStore::try_new(&conn).unwrap());
    let owner = Actor::user(Uuid::new_v4());
    let (_, board) = workspace_with_board(&service, &owner);
    let stranger = Actor::user(Uuid::new_v4());

    let err = service.get_board(&stranger, board.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let missing = Uuid::new_v4();
    let err = service.get_board(&stranger, missing).unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(EntityRef::Board(id)) if id == missing));

    let err = service
        .delete_entity(&stranger, EntityRef::List(Uuid::new_v4()))
        .unwrap_err();
    assert_eq!(err.kind().as_str(), "not_found");

    let err = service
        .create_task(&stranger, Uuid::new_v4(), "Orphan")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn board_members_edit_tasks_but_not_lists() {
    let conn = setup();
    let service = BoardService::new(SqliteStore::try_new(&conn).unwrap());
    let owner = Actor::user(Uuid::new_v4());
    let (workspace, board) = workspace_with_board(&service, &owner);
    let member = Actor::user(Uuid::new_v4());
    service
        .add_member(&owner, EntityRef::Workspace(workspace.id), member.user, Role::Member)
        .unwrap();
    service
        .add_member(&owner, EntityRef::Board(board.id), member.user, Role::Member)
        .unwrap();
    let list = service.create_list(&owner, board.id, "Todo").unwrap();

    let task = service.create_task(&member, list.id, "Draft").unwrap();
    assert_eq!(task.list_id, list.id);
    assert!(service.add_comment(&member, task.id, "on it").is_ok());

    let err = service.create_list(&member, board.id, "Doing").unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Forbidden { action: Action::CreateList, .. }
    ));
    let err = service.rename_list(&member, list.id, "Backlog").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
    let err = service
        .delete_entity(&member, EntityRef::Task(task.id))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Forbidden { action: Action::DeleteTask, .. }
    ));
    let err = service
        .add_member(&member, EntityRef::Board(board.id), Uuid::new_v4(), Role::Member)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[test]
fn only_the_owner_deletes_a_workspace() {
    let conn = setup();
    let service = BoardService::new(SqliteStore::try_new(&conn).unwrap());
    let owner = Actor::user(Uuid::new_v4());
    let (workspace, _) = workspace_with_board(&service, &owner);
    let admin = Actor::user(Uuid::new_v4());
    service
        .add_member(&owner, EntityRef::Workspace(workspace.id), admin.user, Role::Admin)
        .unwrap();

    let err = service
        .delete_entity(&admin, EntityRef::Workspace(workspace.id))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Forbidden { action: Action::DeleteWorkspace, .. }
    ));

    let report = service
        .delete_entity(&owner, EntityRef::Workspace(workspace.id))
        .unwrap();
    assert_eq!(report.workspaces, 1);
    assert_eq!(report.boards, 1);
    let err = service.get_workspace(&owner, workspace.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn super_admin_passes_role_gates_on_existing_entities() {
    let conn = setup();
    let service = BoardService::new(SqliteStore::try_new(&conn).unwrap());
    let owner = Actor::user(Uuid::new_v4());
    let (workspace, board) = workspace_with_board(&service, &owner);
    let root = Actor::super_admin(Uuid::new_v4());

    assert_eq!(service.get_board(&root, board.id).unwrap().id, board.id);
    let list = service.create_list(&root, board.id, "Ops").unwrap();
    assert_eq!(list.board_id, board.id);
    assert_eq!(service.list_boards(&root, workspace.id).unwrap().len(), 1);

    let extra = service
        .create_board(
            &root,
            workspace.id,
            NewBoard {
                name: "Audit".to_string(),
                ..NewBoard::default()
            },
        )
        .unwrap();
    let members = service
        .list_members(&root, EntityRef::Board(extra.id))
        .unwrap();
    assert!(members.is_empty());

    let err = service.get_board(&root, Uuid::new_v4()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn board_creator_becomes_board_admin() {
    let conn = setup();
    let service = BoardService::new(SqliteStore::try_new(&conn).unwrap());
    let owner = Actor::user(Uuid::new_v4());
    let (_, board) = workspace_with_board(&service, &owner);

    let members = service
        .list_members(&owner, EntityRef::Board(board.id))
        .unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].user, owner.user);
    assert_eq!(members[0].role, Role::Admin);
}

#[test]
fn workspace_list_only_shows_memberships() {
    let conn = setup();
    let service = BoardService::new(SqliteStore::try_new(&conn).unwrap());
    let alice = Actor::user(Uuid::new_v4());
    let bob = Actor::user(Uuid::new_v4());
    let shared = service.create_workspace(&alice, "Shared", None).unwrap();
    service.create_workspace(&alice, "Private", None).unwrap();
    service
        .add_member(&alice, EntityRef::Workspace(shared.id), bob.user, Role::Member)
        .unwrap();

    let names: Vec<_> = service
        .list_workspaces(&bob)
        .unwrap()
        .into_iter()
        .map(|workspace| workspace.name)
        .collect();
    assert_eq!(names, vec!["Shared".to_string()]);
    assert_eq!(service.list_workspaces(&alice).unwrap().len(), 2);
}

#[test]
fn error_kinds_have_stable_names() {
    let user = Uuid::new_v4();
    let entity = EntityRef::Board(Uuid::new_v4());
    let forbidden = ServiceError::Forbidden {
        user,
        entity,
        action: Action::UpdateBoard,
    };
    assert_eq!(forbidden.kind().as_str(), "forbidden");
    assert_eq!(ServiceError::NotFound(entity).kind().as_str(), "not_found");
    assert_eq!(
        ServiceError::BlankField("board name").kind().as_str(),
        "invalid_input"
    );
}
