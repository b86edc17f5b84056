//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `taskboard_core` linkage.
//! - Exercise one create/move round against an in-memory store.

use std::error::Error;
use taskboard_core::db::migrations::latest_version;
use taskboard_core::{open_db_in_memory, Actor, BoardService, NewBoard, SqliteStore};
use uuid::Uuid;

fn main() -> Result<(), Box<dyn Error>> {
    println!("taskboard_core version={}", taskboard_core::core_version());

    let conn = open_db_in_memory()?;
    println!("taskboard_core schema_version={}", latest_version());

    let service = BoardService::new(SqliteStore::try_new(&conn)?);
    let owner = Actor::user(Uuid::new_v4());
    let workspace = service.create_workspace(&owner, "Probe", None)?;
    let board = service.create_board(
        &owner,
        workspace.id,
        NewBoard {
            name: "Probe board".to_string(),
            ..NewBoard::default()
        },
    )?;
    for name in ["Todo", "Doing", "Done"] {
        service.create_list(&owner, board.id, name)?;
    }
    let done = service
        .list_lists(&owner, board.id)?
        .into_iter()
        .last()
        .ok_or("probe board has no lists")?;
    service.move_list(&owner, done.id, None, 0)?;

    let order: Vec<String> = service
        .list_lists(&owner, board.id)?
        .into_iter()
        .map(|list| list.name)
        .collect();
    println!("taskboard_core probe_order={}", order.join(","));
    Ok(())
}
