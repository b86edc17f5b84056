//! Core domain logic for collaborative task boards.
//! This crate is the single source of truth for access rules, sibling
//! ordering and cascade consistency.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod ordering;
pub mod repo;
pub mod scope;
pub mod service;

pub use config::{ConfigError, CoreConfig, LogLevel, LoggingConfig, OrderingConfig};
pub use db::{open_db, open_db_in_memory, open_db_with_config, DbError, DbResult};
pub use logging::{active_log_dir, init_logging, LoggingError};
pub use model::entity::{
    AttachmentId, BoardId, CollectionRef, CommentId, EntityPath, EntityRef, ListId, MemberScope,
    TaskId, UserId, WorkspaceId,
};
pub use model::hierarchy::{
    Attachment, Board, BoardList, BoardPatch, CascadeReport, Comment, NewAttachment, NewBoard,
    Task, TaskDetail, TaskPatch, TaskStatus, Workspace, WorkspacePatch, DEFAULT_BOARD_BACKGROUND,
};
pub use model::membership::{Actor, MemberRemoval, Membership, Role};
pub use repo::{BoardStore, SqliteStore, StoreError, StoreResult};
pub use scope::{ScopeGuard, ScopeKey, ScopeLocks};
pub use service::{Action, BoardService, ErrorKind, ServiceError, ServiceResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
