//! Sibling position planning.
//!
//! # Responsibility
//! - Compute positions for appends and index-based moves inside one ordered
//!   collection without touching storage.
//! - Detect and describe ordering collisions so callers can renumber.
//!
//! # Invariants
//! - Input slots are sorted with [`sort_slots`] before planning.
//! - A produced position lies strictly between the neighbours the item ends
//!   up with; otherwise the plan is a full dense renumber.

use crate::config::OrderingConfig;
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// One sibling's ordering state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderSlot {
    pub id: Uuid,
    pub position: f64,
    /// Epoch ms insertion time, first tie-break.
    pub created_at: i64,
    /// Storage insertion sequence, last tie-break.
    pub seq: i64,
}

/// Outcome of planning one move.
#[derive(Debug, Clone, PartialEq)]
pub enum PositionPlan {
    /// The item already sits at the requested index.
    Unchanged,
    /// Write this position for the moved item only.
    Place(f64),
    /// Rewrite every sibling (moved item included) with these positions.
    Renumber(Vec<(Uuid, f64)>),
}

/// Two adjacent siblings that do not compare strictly.
///
/// Never surfaced to callers; the collection manager repairs it by
/// renumbering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrderingConflict {
    pub index: usize,
    pub item: Uuid,
    pub position: f64,
}

impl Display for OrderingConflict {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ordering conflict at index {} for item {} (position {})",
            self.index, self.item, self.position
        )
    }
}

/// Sorts slots by position, then insertion time, then insertion sequence.
pub fn sort_slots(slots: &mut [OrderSlot]) {
    slots.sort_by(compare_slots);
}

fn compare_slots(left: &OrderSlot, right: &OrderSlot) -> Ordering {
    left.position
        .total_cmp(&right.position)
        .then(left.created_at.cmp(&right.created_at))
        .then(left.seq.cmp(&right.seq))
}

/// Returns the first slot that ties with its predecessor or holds a
/// non-finite position.
pub fn detect_conflict(slots: &[OrderSlot]) -> Option<OrderingConflict> {
    for (index, slot) in slots.iter().enumerate() {
        let tied = index > 0 && slot.position <= slots[index - 1].position;
        if !slot.position.is_finite() || tied {
            return Some(OrderingConflict {
                index,
                item: slot.id,
                position: slot.position,
            });
        }
    }
    None
}

/// Position for a new item appended after `slots`.
///
/// Returns `None` when the increment overflows, in which case the collection
/// must be renumbered first.
pub fn append_position(slots: &[OrderSlot], config: &OrderingConfig) -> Option<f64> {
    match slots.last() {
        None => Some(0.0),
        Some(last) => after_edge(last.position, config.gap),
    }
}

/// Plans moving `item` to the zero-based `target_index` among the siblings
/// it will have after the move.
///
/// `slots` may or may not contain `item`; when it does not (cross-parent
/// move) the item is inserted. Indices past the end clamp to the tail.
pub fn plan_move(
    slots: &[OrderSlot],
    item: Uuid,
    target_index: usize,
    config: &OrderingConfig,
) -> PositionPlan {
    let current_index = slots.iter().position(|slot| slot.id == item);
    let siblings: Vec<&OrderSlot> = slots.iter().filter(|slot| slot.id != item).collect();
    let index = target_index.min(siblings.len());
    if current_index == Some(index) {
        return PositionPlan::Unchanged;
    }

    let before = index.checked_sub(1).map(|value| siblings[value].position);
    let after = siblings.get(index).map(|slot| slot.position);
    let candidate = match (before, after) {
        (None, None) => Some(0.0),
        (Some(before), None) => after_edge(before, config.gap),
        (None, Some(after)) => before_edge(after, config.gap),
        (Some(before), Some(after)) => midpoint(before, after, config.epsilon),
    };

    match candidate {
        Some(position) => PositionPlan::Place(position),
        None => {
            let mut order: Vec<Uuid> = siblings.iter().map(|slot| slot.id).collect();
            order.insert(index, item);
            PositionPlan::Renumber(dense_positions(order))
        }
    }
}

/// Dense `0, 1, 2, …` positions in the given order.
pub fn dense_positions(order: impl IntoIterator<Item = Uuid>) -> Vec<(Uuid, f64)> {
    order
        .into_iter()
        .enumerate()
        .map(|(index, id)| (id, index as f64))
        .collect()
}

fn midpoint(before: f64, after: f64, epsilon: f64) -> Option<f64> {
    if after - before <= epsilon {
        return None;
    }
    let mid = before + (after - before) / 2.0;
    (mid > before && mid < after).then_some(mid)
}

/// `edge + gap`, or `None` when the sum is not finite or is absorbed by
/// `edge`.
fn after_edge(edge: f64, gap: f64) -> Option<f64> {
    let position = edge + gap;
    (position.is_finite() && position > edge).then_some(position)
}

fn before_edge(edge: f64, gap: f64) -> Option<f64> {
    let position = edge - gap;
    (position.is_finite() && position < edge).then_some(position)
}
