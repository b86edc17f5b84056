//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define storage contracts per concern (hierarchy, membership, ordering,
//!   task details, cascades).
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Every mutating call is one `IMMEDIATE` transaction: it either fully
//!   applies or leaves no trace.
//! - Repositories never evaluate authorization policy.

use crate::db::DbError;
use crate::model::entity::EntityRef;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod cascade_repo;
pub mod hierarchy_repo;
pub mod membership_repo;
pub mod order_repo;
pub mod store;
pub mod task_detail_repo;

pub use cascade_repo::CascadeRepository;
pub use hierarchy_repo::HierarchyRepository;
pub use membership_repo::MembershipRepository;
pub use order_repo::OrderRepository;
pub use store::SqliteStore;
pub use task_detail_repo::TaskDetailRepository;

/// Result type used by repository operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Every storage contract the board services need.
pub trait BoardStore:
    HierarchyRepository
    + MembershipRepository
    + OrderRepository
    + TaskDetailRepository
    + CascadeRepository
{
}

impl<T> BoardStore for T where
    T: HierarchyRepository
        + MembershipRepository
        + OrderRepository
        + TaskDetailRepository
        + CascadeRepository
{
}

/// Errors from repository operations.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target row does not exist.
    NotFound(EntityRef),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
    /// A cascade left rows behind; the transaction was rolled back.
    ConsistencyCheck { check: &'static str, violations: i64 },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(entity) => write!(f, "{entity} not found"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "board store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "board store requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid board data: {message}"),
            Self::ConsistencyCheck { check, violations } => write!(
                f,
                "consistency check `{check}` failed with {violations} dangling row(s)"
            ),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> StoreResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| StoreError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn parse_optional_uuid(
    value: Option<String>,
    column: &'static str,
) -> StoreResult<Option<Uuid>> {
    value.map(|value| parse_uuid(&value, column)).transpose()
}
