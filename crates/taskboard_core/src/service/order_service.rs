//! Ordered collection manager.
//!
//! # Responsibility
//! - Keep a strict total order over the lists of a board and the tasks of a
//!   list, addressed by zero-based index.
//! - Repair ties and exhausted gaps by renumbering.
//!
//! # Invariants
//! - Every call runs under the exclusive scope of each collection it reads
//!   and writes; plans are computed from a read taken under that scope.
//! - Ordering conflicts are logged and repaired, never returned.

use crate::config::OrderingConfig;
use crate::model::entity::CollectionRef;
use crate::ordering::{
    append_position, dense_positions, detect_conflict, plan_move, sort_slots, OrderSlot,
    PositionPlan,
};
use crate::repo::{OrderRepository, StoreError};
use crate::scope::{ScopeGuard, ScopeKey};
use crate::service::error::{ServiceError, ServiceResult};
use log::{debug, warn};
use uuid::Uuid;

/// Position manager over one store.
pub struct OrderedCollections<'a, S: ?Sized> {
    store: &'a S,
    config: &'a OrderingConfig,
}

impl<'a, S> OrderedCollections<'a, S>
where
    S: OrderRepository + ?Sized,
{
    pub fn new(store: &'a S, config: &'a OrderingConfig) -> Self {
        Self { store, config }
    }

    /// Item ids of `collection` in order.
    pub fn ordered_ids(&self, collection: CollectionRef) -> ServiceResult<Vec<Uuid>> {
        let mut slots = self.store.order_slots(collection)?;
        sort_slots(&mut slots);
        Ok(slots.into_iter().map(|slot| slot.id).collect())
    }

    /// Position for a new last item of `collection`.
    pub fn append_position(
        &self,
        guard: &ScopeGuard<'_>,
        collection: CollectionRef,
    ) -> ServiceResult<f64> {
        ensure_held(guard, collection)?;
        let slots = self.consistent_slots(collection)?;
        if let Some(position) = append_position(&slots, self.config) {
            return Ok(position);
        }

        let slots = self.rewrite_dense(collection, &slots, "append_overflow")?;
        append_position(&slots, self.config).ok_or_else(|| {
            ServiceError::Store(StoreError::InvalidData(format!(
                "no finite append position for {collection}"
            )))
        })
    }

    /// Moves `item` to `target_index` among its current siblings.
    pub fn move_to(
        &self,
        guard: &ScopeGuard<'_>,
        collection: CollectionRef,
        item: Uuid,
        target_index: usize,
    ) -> ServiceResult<()> {
        ensure_held(guard, collection)?;
        let slots = self.consistent_slots(collection)?;
        if !slots.iter().any(|slot| slot.id == item) {
            return Err(ServiceError::NotFound(collection.item(item)));
        }

        match plan_move(&slots, item, target_index, self.config) {
            PositionPlan::Unchanged => {
                debug!(
                    "event=order_move module=ordering status=noop collection={} item={} index={}",
                    collection, item, target_index
                );
            }
            PositionPlan::Place(position) => {
                self.store.write_positions(collection, &[(item, position)])?;
            }
            PositionPlan::Renumber(positions) => {
                warn!(
                    "event=order_renumber module=ordering status=ok collection={} reason=gap_exhausted items={}",
                    collection,
                    positions.len()
                );
                self.store.write_positions(collection, &positions)?;
            }
        }
        Ok(())
    }

    /// Moves `item` from `from` into `to` at `target_index`, changing its
    /// parent and position together.
    pub fn move_across(
        &self,
        guard: &ScopeGuard<'_>,
        item: Uuid,
        from: CollectionRef,
        to: CollectionRef,
        target_index: usize,
    ) -> ServiceResult<()> {
        if from == to {
            return self.move_to(guard, from, item, target_index);
        }
        ensure_held(guard, from)?;
        ensure_held(guard, to)?;

        let slots = self.consistent_slots(to)?;
        let positions = match plan_move(&slots, item, target_index, self.config) {
            PositionPlan::Place(position) => vec![(item, position)],
            PositionPlan::Renumber(positions) => {
                warn!(
                    "event=order_renumber module=ordering status=ok collection={} reason=gap_exhausted items={}",
                    to,
                    positions.len()
                );
                positions
            }
            PositionPlan::Unchanged => {
                return Err(ServiceError::Store(StoreError::InvalidData(format!(
                    "{} is already part of {to}",
                    to.item(item)
                ))))
            }
        };
        self.store.reparent_item(item, from, to, &positions)?;
        Ok(())
    }

    /// Rewrites `collection` with dense positions in its current order.
    pub fn renumber(&self, guard: &ScopeGuard<'_>, collection: CollectionRef) -> ServiceResult<()> {
        ensure_held(guard, collection)?;
        let mut slots = self.store.order_slots(collection)?;
        sort_slots(&mut slots);
        self.rewrite_dense(collection, &slots, "requested")?;
        Ok(())
    }

    /// Reads the collection, renumbering first when a tie or non-finite
    /// position is found.
    fn consistent_slots(&self, collection: CollectionRef) -> ServiceResult<Vec<OrderSlot>> {
        let mut slots = self.store.order_slots(collection)?;
        sort_slots(&mut slots);
        match detect_conflict(&slots) {
            None => Ok(slots),
            Some(conflict) => {
                warn!(
                    "event=order_conflict module=ordering status=repairing collection={} detail=\"{}\"",
                    collection, conflict
                );
                self.rewrite_dense(collection, &slots, "conflict")
            }
        }
    }

    fn rewrite_dense(
        &self,
        collection: CollectionRef,
        slots: &[OrderSlot],
        reason: &str,
    ) -> ServiceResult<Vec<OrderSlot>> {
        let positions = dense_positions(slots.iter().map(|slot| slot.id));
        self.store.write_positions(collection, &positions)?;
        warn!(
            "event=order_renumber module=ordering status=ok collection={} reason={} items={}",
            collection,
            reason,
            positions.len()
        );
        Ok(slots
            .iter()
            .zip(positions)
            .map(|(slot, (_, position))| OrderSlot { position, ..*slot })
            .collect())
    }
}

fn ensure_held(guard: &ScopeGuard<'_>, collection: CollectionRef) -> ServiceResult<()> {
    let key = ScopeKey::from(collection);
    if guard.holds(key) {
        Ok(())
    } else {
        Err(ServiceError::ScopeNotHeld(key))
    }
}
