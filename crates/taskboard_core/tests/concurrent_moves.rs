use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use taskboard_core::db::open_db;
use taskboard_core::{
    Actor, BoardId, BoardService, CoreConfig, ListId, NewBoard, ScopeLocks, SqliteStore, TaskId,
};
use tempfile::TempDir;
use uuid::Uuid;

const TASKS_PER_LIST: usize = 8;
const MOVES_PER_THREAD: usize = 40;

struct Seeded {
    owner: Actor,
    board: BoardId,
    lists: Vec<ListId>,
    tasks: HashSet<TaskId>,
}

fn seed(path: &Path) -> Seeded {
    let conn = open_db(path).unwrap();
    let service = BoardService::new(SqliteStore::try_new(&conn).unwrap());
    let owner = Actor::user(Uuid::new_v4());
    let workspace = service.create_workspace(&owner, "W", None).unwrap();
    let board = service
        .create_board(
            &owner,
            workspace.id,
            NewBoard {
                name: "B".to_string(),
                ..NewBoard::default()
            },
        )
        .unwrap();
    let mut lists = Vec::new();
    let mut tasks = HashSet::new();
    for name in ["Left", "Right", "Spare"] {
        let list = service.create_list(&owner, board.id, name).unwrap();
        for index in 0..TASKS_PER_LIST {
            let task = service
                .create_task(&owner, list.id, format!("{name} {index}"))
                .unwrap();
            tasks.insert(task.id);
        }
        lists.push(list.id);
    }
    Seeded {
        owner,
        board: board.id,
        lists,
        tasks,
    }
}

fn with_service<T>(
    path: &Path,
    scopes: &Arc<ScopeLocks>,
    run: impl FnOnce(&BoardService<SqliteStore<'_>>) -> T,
) -> T {
    let conn = open_db(path).unwrap();
    let service = BoardService::with_scopes(
        SqliteStore::try_new(&conn).unwrap(),
        CoreConfig::default(),
        Arc::clone(scopes),
    )
    .unwrap();
    run(&service)
}

fn assert_board_consistent(path: &Path, seeded: &Seeded) {
    let scopes = Arc::new(ScopeLocks::new());
    with_service(path, &scopes, |service| {
        let lists = service.list_lists(&seeded.owner, seeded.board).unwrap();
        assert_eq!(lists.len(), seeded.lists.len());
        for pair in lists.windows(2) {
            assert!(pair[0].position < pair[1].position);
        }

        let mut seen = HashSet::new();
        for list in &lists {
            let tasks = service.list_tasks(&seeded.owner, list.id).unwrap();
            for pair in tasks.windows(2) {
                assert!(
                    pair[0].position < pair[1].position,
                    "duplicate or unordered positions in {}",
                    list.name
                );
            }
            for task in tasks {
                assert!(seen.insert(task.id), "task {} listed twice", task.id);
            }
        }
        assert_eq!(seen, seeded.tasks);
    });
}

fn db_path(dir: &TempDir) -> PathBuf {
    dir.path().join("taskboard.db")
}

#[test]
fn disjoint_reorders_keep_every_collection_ordered() {
    let dir = TempDir::new().unwrap();
    let path = db_path(&dir);
    let seeded = seed(&path);
    let scopes = Arc::new(ScopeLocks::new());

    let mut handles = Vec::new();
    for (offset, list) in seeded.lists.iter().copied().enumerate() {
        let path = path.clone();
        let scopes = Arc::clone(&scopes);
        let owner = seeded.owner;
        handles.push(thread::spawn(move || {
            with_service(&path, &scopes, |service| {
                for step in 0..MOVES_PER_THREAD {
                    let tasks = service.list_tasks(&owner, list).unwrap();
                    let from = (step * 5 + offset) % tasks.len();
                    let to = (step * 3 + 1) % tasks.len();
                    service.move_task(&owner, tasks[from].id, None, to).unwrap();
                }
            });
        }));
    }
    {
        let path = path.clone();
        let scopes = Arc::clone(&scopes);
        let owner = seeded.owner;
        let board = seeded.board;
        handles.push(thread::spawn(move || {
            with_service(&path, &scopes, |service| {
                for step in 0..MOVES_PER_THREAD {
                    let lists = service.list_lists(&owner, board).unwrap();
                    let from = step % lists.len();
                    let to = (step * 2 + 1) % lists.len();
                    service.move_list(&owner, lists[from].id, None, to).unwrap();
                }
            });
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(scopes.held_count(), 0);
    assert_board_consistent(&path, &seeded);
}

#[test]
fn opposing_cross_list_moves_do_not_lose_tasks() {
    let dir = TempDir::new().unwrap();
    let path = db_path(&dir);
    let seeded = seed(&path);
    let scopes = Arc::new(ScopeLocks::new());
    let (left, right) = (seeded.lists[0], seeded.lists[1]);

    let mut handles = Vec::new();
    for (from_list, to_list) in [(left, right), (right, left)] {
        let path = path.clone();
        let scopes = Arc::clone(&scopes);
        let owner = seeded.owner;
        handles.push(thread::spawn(move || {
            with_service(&path, &scopes, |service| {
                for step in 0..MOVES_PER_THREAD {
                    let tasks = service.list_tasks(&owner, from_list).unwrap();
                    let Some(task) = tasks.get(step % tasks.len().max(1)) else {
                        continue;
                    };
                    let moved = service
                        .move_task(&owner, task.id, Some(to_list), step % 4)
                        .unwrap();
                    assert_eq!(moved.list_id, to_list);
                }
            });
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(scopes.held_count(), 0);
    assert_board_consistent(&path, &seeded);
}
