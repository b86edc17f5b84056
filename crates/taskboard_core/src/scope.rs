//! Per-parent exclusive scopes.
//!
//! # Responsibility
//! - Serialize mutations that touch the same parent's ordering or membership
//!   state while letting unrelated parents proceed concurrently.
//!
//! # Invariants
//! - Keys are taken all-or-nothing per call.
//! - A guard only grows downwards (workspace → board → list), so two guards
//!   can never wait on each other.
//! - Dropping a guard releases every key it holds.

use crate::model::entity::{BoardId, CollectionRef, ListId, WorkspaceId};
use log::trace;
use std::collections::{BTreeSet, HashSet};
use std::fmt::{Display, Formatter};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Exclusive scope key. Variant order is lock order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ScopeKey {
    Workspace(WorkspaceId),
    Board(BoardId),
    List(ListId),
}

impl ScopeKey {
    fn level(self) -> u8 {
        match self {
            Self::Workspace(_) => 0,
            Self::Board(_) => 1,
            Self::List(_) => 2,
        }
    }
}

impl From<CollectionRef> for ScopeKey {
    fn from(value: CollectionRef) -> Self {
        match value {
            CollectionRef::BoardLists(board) => Self::Board(board),
            CollectionRef::ListTasks(list) => Self::List(list),
        }
    }
}

impl Display for ScopeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Workspace(id) => write!(f, "workspace:{id}"),
            Self::Board(id) => write!(f, "board:{id}"),
            Self::List(id) => write!(f, "list:{id}"),
        }
    }
}

/// Registry of currently held scopes, shared by every service instance that
/// works on the same store.
#[derive(Debug, Default)]
pub struct ScopeLocks {
    held: Mutex<HashSet<ScopeKey>>,
    released: Condvar,
}

impl ScopeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocks until all `keys` are free, then takes them.
    pub fn acquire(&self, keys: impl IntoIterator<Item = ScopeKey>) -> ScopeGuard<'_> {
        let mut guard = ScopeGuard {
            locks: self,
            keys: BTreeSet::new(),
        };
        guard.take(keys.into_iter().collect());
        guard
    }

    fn lock_held(&self) -> MutexGuard<'_, HashSet<ScopeKey>> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self, keys: &BTreeSet<ScopeKey>) {
        if keys.is_empty() {
            return;
        }
        let mut held = self.lock_held();
        for key in keys {
            held.remove(key);
        }
        drop(held);
        self.released.notify_all();
    }

    /// Number of keys currently held by any guard.
    pub fn held_count(&self) -> usize {
        self.lock_held().len()
    }
}

/// Set of scopes held by one operation.
#[derive(Debug)]
pub struct ScopeGuard<'a> {
    locks: &'a ScopeLocks,
    keys: BTreeSet<ScopeKey>,
}

impl ScopeGuard<'_> {
    /// Takes additional, strictly deeper keys.
    ///
    /// Keys already held are ignored.
    pub fn extend(&mut self, keys: impl IntoIterator<Item = ScopeKey>) {
        let wanted: BTreeSet<ScopeKey> = keys
            .into_iter()
            .filter(|key| !self.keys.contains(key))
            .collect();
        if let (Some(deepest), Some(shallowest)) = (self.keys.last(), wanted.first()) {
            debug_assert!(
                shallowest.level() > deepest.level(),
                "scope {shallowest} requested after {deepest}; scopes must be taken top-down"
            );
        }
        self.take(wanted);
    }

    /// Returns whether this guard holds `key`.
    pub fn holds(&self, key: ScopeKey) -> bool {
        self.keys.contains(&key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &ScopeKey> {
        self.keys.iter()
    }

    fn take(&mut self, wanted: BTreeSet<ScopeKey>) {
        if wanted.is_empty() {
            return;
        }
        let mut held = self.locks.lock_held();
        while wanted.iter().any(|key| held.contains(key)) {
            held = self
                .locks
                .released
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        for key in &wanted {
            held.insert(*key);
            trace!("event=scope_acquire module=scope status=ok key={key}");
        }
        drop(held);
        self.keys.extend(wanted);
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.locks.release(&self.keys);
    }
}
