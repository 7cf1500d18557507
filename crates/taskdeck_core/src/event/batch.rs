//! Staged event batch delivered as one atomic wave.
//!
//! # Responsibility
//! - Accumulate (type, source, payload) entries while a mutation runs.
//! - Merge and deliver them in one `send`, after all state is in place.
//!
//! # Invariants
//! - Entries with the same (type, source) key are merged before delivery;
//!   each merged event is delivered exactly once.
//! - Id payloads merge by union, other payloads keep the newest value, and
//!   byte-identical restagings are dropped.

use crate::event::bus::{Event, EventBus, EventType, Payload};
use crate::model::EntityId;

/// Mutable batch of staged change events.
///
/// Public setters take `Option<&mut EventBatch>`: with `None` they open,
/// fill and send a private batch before returning (the atomic-mutation
/// guarantee); with `Some` they only stage, and the caller sends later.
#[derive(Debug, Default)]
pub struct EventBatch {
    entries: Vec<Event>,
}

impl EventBatch {
    pub fn new() -> EventBatch {
        EventBatch::default()
    }

    /// Stages one event for later delivery.
    pub fn stage(&mut self, event_type: EventType, source: EntityId, payload: Payload) {
        self.entries.push(Event::new(event_type, source, payload));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Merges the staged entries and delivers each merged event once.
    ///
    /// Events keep the order in which their (type, source) key was first
    /// staged, so observers see the mutation steps in causal order.
    pub fn send(self, bus: &EventBus) {
        for event in self.merged() {
            bus.publish(&event);
        }
    }

    fn merged(self) -> Vec<Event> {
        let mut merged: Vec<Event> = Vec::with_capacity(self.entries.len());
        for event in self.entries {
            let existing = merged.iter_mut().find(|candidate| {
                candidate.event_type == event.event_type && candidate.source == event.source
            });
            let Some(existing) = existing else {
                merged.push(event);
                continue;
            };
            if existing.payload == event.payload {
                continue;
            }
            match (&mut existing.payload, event.payload) {
                (Payload::Ids(current), Payload::Ids(incoming)) => {
                    for id in incoming {
                        if !current.contains(&id) {
                            current.push(id);
                        }
                    }
                }
                (current, incoming) => *current = incoming,
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::EventBatch;
    use crate::event::bus::{EventBus, Payload};
    use std::cell::RefCell;
    use std::rc::Rc;
    use uuid::Uuid;

    #[test]
    fn same_key_entries_merge_into_one_delivery() {
        let bus = EventBus::new();
        let source = Uuid::new_v4();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        let deliveries = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&deliveries);
        bus.subscribe("tasks.add", Some(source), move |_, event| {
            sink.borrow_mut().push(event.payload.clone());
        });

        let mut batch = EventBatch::new();
        batch.stage("tasks.add", source, Payload::Ids(vec![first]));
        batch.stage("tasks.add", source, Payload::Ids(vec![second, first]));
        batch.send(&bus);

        let seen = deliveries.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], Payload::Ids(vec![first, second]));
    }

    #[test]
    fn identical_restaging_is_dropped() {
        let bus = EventBus::new();
        let source = Uuid::new_v4();
        let count = Rc::new(RefCell::new(0u32));
        let sink = Rc::clone(&count);
        bus.subscribe("task.subject", Some(source), move |_, _| {
            *sink.borrow_mut() += 1;
        });

        let mut batch = EventBatch::new();
        batch.stage("task.subject", source, Payload::Text("a".into()));
        batch.stage("task.subject", source, Payload::Text("a".into()));
        batch.send(&bus);
        assert_eq!(*count.borrow(), 1);
    }
}
