//! Positionally stable assignment of queued events to deck keys.

use std::collections::HashSet;

use tracing::debug;

use crate::catalog::{Catalog, QueuedEvent};

/// Fixed-length mapping of deck keys to events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotTable {
    slots: Vec<Option<QueuedEvent>>,
}

impl SlotTable {
    pub fn empty(len: usize) -> Self {
        Self {
            slots: vec![None; len],
        }
    }

    pub fn from_slots(slots: Vec<Option<QueuedEvent>>) -> Self {
        Self { slots }
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    pub fn get(&self, index: usize) -> Option<&QueuedEvent> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&QueuedEvent>> + '_ {
        self.slots.iter().map(Option::as_ref)
    }

    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn reconcile_catalog(&self, catalog: &Catalog) -> Self {
        self.reconcile(catalog.queue())
    }

    /// Produces the next table for `queue`.
    ///
    /// Repeated keys in `queue` are collapsed to their first occurrence.
    /// Slots are then walked in ascending order. An occupant whose key is still
    /// queued stays in its slot, refreshed to the incoming version, and its
    /// queue entry is consumed immediately; so if the same key sits in two
    /// slots only the lower one keeps it. Vacated slots are then filled in
    /// ascending order from the head of what remains. Entries that do not fit
    /// are dropped.
    pub fn reconcile(&self, queue: Vec<QueuedEvent>) -> Self {
        let mut seen = HashSet::new();
        let mut remaining: Vec<Option<QueuedEvent>> = queue
            .into_iter()
            .filter(|entry| seen.insert(entry.key.clone()))
            .map(Some)
            .collect();
        let mut slots: Vec<Option<QueuedEvent>> = Vec::with_capacity(self.slots.len());

        for current in &self.slots {
            let retained = current.as_ref().and_then(|occupant| {
                remaining
                    .iter_mut()
                    .find(|entry| entry.as_ref().is_some_and(|e| e.key == occupant.key))
                    .and_then(Option::take)
            });
            slots.push(retained);
        }

        let mut unassigned = remaining.into_iter().flatten();
        for slot in slots.iter_mut().filter(|slot| slot.is_none()) {
            match unassigned.next() {
                Some(entry) => *slot = Some(entry),
                None => break,
            }
        }

        let dropped = unassigned.count();
        if dropped > 0 {
            debug!(dropped, slots = self.slots.len(), "slots: queue exceeds deck capacity");
        }

        Self { slots }
    }
}

#[cfg(test)]
#[path = "tests/slots_tests.rs"]
mod tests;
