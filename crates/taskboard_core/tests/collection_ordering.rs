use rusqlite::Connection;
use taskboard_core::db::open_db_in_memory;
use taskboard_core::{
    Actor, BoardId, BoardService, CoreConfig, ListId, NewBoard, OrderingConfig, SqliteStore,
};
use uuid::Uuid;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn board_with_lists(
    service: &BoardService<SqliteStore<'_>>,
    owner: &Actor,
    names: &[&str],
) -> (BoardId, Vec<ListId>) {
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
    let ids = names
        .iter()
        .map(|name| service.create_list(owner, board.id, *name).unwrap().id)
        .collect();
    (board.id, ids)
}

fn list_names(
    service: &BoardService<SqliteStore<'_>>,
    owner: &Actor,
    board: BoardId,
) -> Vec<String> {
    service
        .list_lists(owner, board)
        .unwrap()
        .into_iter()
        .map(|list| list.name)
        .collect()
}

fn assert_strictly_increasing(positions: &[f64]) {
    for pair in positions.windows(2) {
        assert!(pair[0] < pair[1], "positions not strictly increasing: {positions:?}");
    }
}

#[test]
fn appends_use_gap_from_zero() {
    let conn = setup();
    let service = BoardService::new(SqliteStore::try_new(&conn).unwrap());
    let owner = Actor::user(Uuid::new_v4());
    let (board, _) = board_with_lists(&service, &owner, &["A", "B", "C"]);

    let positions: Vec<f64> = service
        .list_lists(&owner, board)
        .unwrap()
        .iter()
        .map(|list| list.position)
        .collect();
    assert_eq!(positions, vec![0.0, 1024.0, 2048.0]);
}

#[test]
fn moved_item_lands_at_requested_index() {
    let conn = setup();
    let service = BoardService::new(SqliteStore::try_new(&conn).unwrap());
    let owner = Actor::user(Uuid::new_v4());
    let names = ["A", "B", "C", "D", "E"];
    let (board, _) = board_with_lists(&service, &owner, &names);

    for from in 0..names.len() {
        for to in 0..names.len() {
            let before = service.list_lists(&owner, board).unwrap();
            let moving = before[from].id;
            let mut expected: Vec<String> = before.iter().map(|list| list.name.clone()).collect();
            let name = expected.remove(from);
            expected.insert(to, name);

            service.move_list(&owner, moving, None, to).unwrap();

            let after = service.list_lists(&owner, board).unwrap();
            let actual: Vec<String> = after.iter().map(|list| list.name.clone()).collect();
            assert_eq!(actual, expected, "move {from} -> {to}");
            let positions: Vec<f64> = after.iter().map(|list| list.position).collect();
            assert_strictly_increasing(&positions);
        }
    }
}

#[test]
fn index_past_the_end_moves_to_tail() {
    let conn = setup();
    let service = BoardService::new(SqliteStore::try_new(&conn).unwrap());
    let owner = Actor::user(Uuid::new_v4());
    let (board, ids) = board_with_lists(&service, &owner, &["A", "B", "C"]);

    service.move_list(&owner, ids[0], None, 99).unwrap();
    assert_eq!(list_names(&service, &owner, board), vec!["B", "C", "A"]);
}

#[test]
fn moving_to_current_index_keeps_position() {
    let conn = setup();
    let service = BoardService::new(SqliteStore::try_new(&conn).unwrap());
    let owner = Actor::user(Uuid::new_v4());
    let (_, ids) = board_with_lists(&service, &owner, &["A", "B", "C"]);

    let moved = service.move_list(&owner, ids[1], None, 1).unwrap();
    assert_eq!(moved.position, 1024.0);
}

#[test]
fn tied_positions_are_repaired_on_next_move() {
    let conn = setup();
    let service = BoardService::new(SqliteStore::try_new(&conn).unwrap());
    let owner = Actor::user(Uuid::new_v4());
    let (board, ids) = board_with_lists(&service, &owner, &["A", "B", "C"]);

    conn.execute(
        "UPDATE lists SET position = 5.0 WHERE board_uuid = ?1;",
        [board.to_string()],
    )
    .unwrap();

    service.move_list(&owner, ids[2], None, 0).unwrap();

    let lists = service.list_lists(&owner, board).unwrap();
    let names: Vec<&str> = lists.iter().map(|list| list.name.as_str()).collect();
    assert_eq!(names, vec!["C", "A", "B"]);
    let positions: Vec<f64> = lists.iter().map(|list| list.position).collect();
    assert_strictly_increasing(&positions);
}

#[test]
fn exhausted_gap_triggers_dense_renumber() {
    let conn = setup();
    let config = CoreConfig {
        ordering: OrderingConfig {
            gap: 1.0,
            epsilon: 0.3,
        },
        ..CoreConfig::default()
    };
    let store = SqliteStore::try_new(&conn).unwrap();
    let service = BoardService::with_config(store, config).unwrap();
    let owner = Actor::user(Uuid::new_v4());
    let (board, ids) = board_with_lists(&service, &owner, &["A", "B", "C"]);

    // A=0, C=0.5, B=1
    service.move_list(&owner, ids[2], None, 1).unwrap();
    // A=0, B=0.25, C=0.5
    service.move_list(&owner, ids[1], None, 1).unwrap();
    // Gap between A and B is below epsilon.
    service.move_list(&owner, ids[2], None, 1).unwrap();

    let lists = service.list_lists(&owner, board).unwrap();
    let names: Vec<&str> = lists.iter().map(|list| list.name.as_str()).collect();
    assert_eq!(names, vec!["A", "C", "B"]);
    let positions: Vec<f64> = lists.iter().map(|list| list.position).collect();
    assert_eq!(positions, vec![0.0, 1.0, 2.0]);
}

#[test]
fn task_moves_across_lists_keep_both_orders_dense() {
    let conn = setup();
    let service = BoardService::new(SqliteStore::try_new(&conn).unwrap());
    let owner = Actor::user(Uuid::new_v4());
    let (_, ids) = board_with_lists(&service, &owner, &["Todo", "Done"]);
    let (todo, done) = (ids[0], ids[1]);

    let first = service.create_task(&owner, todo, "first").unwrap();
    let second = service.create_task(&owner, todo, "second").unwrap();
    service.create_task(&owner, done, "shipped").unwrap();

    let moved = service.move_task(&owner, second.id, Some(done), 0).unwrap();
    assert_eq!(moved.list_id, done);

    let todo_titles: Vec<String> = service
        .list_tasks(&owner, todo)
        .unwrap()
        .into_iter()
        .map(|task| task.title)
        .collect();
    assert_eq!(todo_titles, vec!["first"]);
    let done_tasks = service.list_tasks(&owner, done).unwrap();
    let done_titles: Vec<&str> = done_tasks.iter().map(|task| task.title.as_str()).collect();
    assert_eq!(done_titles, vec!["second", "shipped"]);
    let positions: Vec<f64> = done_tasks.iter().map(|task| task.position).collect();
    assert_strictly_increasing(&positions);

    let back = service.move_task(&owner, second.id, Some(todo), 5).unwrap();
    assert_eq!(back.list_id, todo);
    let todo_ids: Vec<_> = service
        .list_tasks(&owner, todo)
        .unwrap()
        .into_iter()
        .map(|task| task.id)
        .collect();
    assert_eq!(todo_ids, vec![first.id, second.id]);
}

#[test]
fn lists_move_between_boards_of_one_workspace() {
    let conn = setup();
    let service = BoardService::new(SqliteStore::try_new(&conn).unwrap());
    let owner = Actor::user(Uuid::new_v4());
    let workspace = service.create_workspace(&owner, "W", None).unwrap();
    let mut boards = Vec::new();
    for name in ["Source", "Target"] {
        let board = service
            .create_board(
                &owner,
                workspace.id,
                NewBoard {
                    name: name.to_string(),
                    ..NewBoard::default()
                },
            )
            .unwrap();
        boards.push(board.id);
    }
    let moving = service.create_list(&owner, boards[0], "Ideas").unwrap();
    service.create_list(&owner, boards[0], "Keep").unwrap();
    service.create_list(&owner, boards[1], "Existing").unwrap();
    let task = service.create_task(&owner, moving.id, "carried").unwrap();

    let moved = service
        .move_list(&owner, moving.id, Some(boards[1]), 0)
        .unwrap();
    assert_eq!(moved.board_id, boards[1]);
    assert_eq!(list_names(&service, &owner, boards[0]), vec!["Keep"]);
    assert_eq!(
        list_names(&service, &owner, boards[1]),
        vec!["Ideas", "Existing"]
    );
    let titles: Vec<String> = service
        .list_tasks(&owner, moving.id)
        .unwrap()
        .into_iter()
        .map(|task| task.title)
        .collect();
    assert_eq!(titles, vec![task.title]);
}
