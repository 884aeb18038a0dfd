//! Normalizes a raw event list into ready/active partitions and the effective queue.

use shared::domain::{Event, EventId};

/// One consistent snapshot of the document's events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    active: Vec<Event>,
    ready: Vec<Event>,
}

/// A logical event as it sits in the queue: the ready template's id plus the
/// version to display, which is the running instance once one exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedEvent {
    pub key: EventId,
    pub event: Event,
}

impl Catalog {
    /// Abstract events are dropped; they cannot be launched from the deck.
    pub fn from_events(events: Vec<Event>) -> Self {
        let (active, rest): (Vec<_>, Vec<_>) = events.into_iter().partition(Event::is_active);
        let ready = rest.into_iter().filter(Event::is_ready).collect();
        Self { active, ready }
    }

    pub fn active(&self) -> &[Event] {
        &self.active
    }

    pub fn ready(&self) -> &[Event] {
        &self.ready
    }

    /// Ready events in server order, each replaced by its first running instance if any.
    pub fn queue(&self) -> Vec<QueuedEvent> {
        self.ready
            .iter()
            .map(|template| {
                let event = self
                    .active
                    .iter()
                    .find(|active| active.is_instance_of(&template.id))
                    .unwrap_or(template);
                QueuedEvent {
                    key: template.id.clone(),
                    event: event.clone(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
#[path = "tests/catalog_tests.rs"]
mod tests;
