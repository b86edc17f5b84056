//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into actor-facing operations.
//! - Host the four core components: access evaluation, membership registry,
//!   ordered collections and cascades.
//!
//! # Invariants
//! - Every operation authorizes through [`access::AccessEvaluator`] before it
//!   reads or mutates.

pub mod access;
pub mod board_service;
pub mod cascade_service;
pub mod error;
pub mod membership_service;
pub mod order_service;

pub use access::{AccessDecision, AccessEvaluator, Action, GateLevel, Grant};
pub use board_service::BoardService;
pub use cascade_service::CascadeCoordinator;
pub use error::{ErrorKind, ServiceError, ServiceResult};
pub use membership_service::MembershipRegistry;
pub use order_service::OrderedCollections;
