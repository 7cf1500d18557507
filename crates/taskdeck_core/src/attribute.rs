//! Single-value and set-value attribute containers.
//!
//! # Responsibility
//! - Own one attribute value (or id set) together with its event type(s).
//! - Stage the matching change events whenever the value actually changes.
//!
//! # Invariants
//! - Writing an equal value stages nothing (no-op setters stay silent).
//! - A set cell fires its content-changed event iff at least one of its
//!   delta events fired.

use crate::event::{EventBatch, EventType, Payload};
use crate::model::EntityId;
use std::collections::BTreeSet;

/// One owned attribute value plus the event type announcing changes to it.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueCell<T> {
    event_type: EventType,
    value: T,
}

impl<T: Clone + PartialEq + Into<Payload>> ValueCell<T> {
    pub fn new(event_type: EventType, value: T) -> ValueCell<T> {
        ValueCell { event_type, value }
    }

    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Writes `value` and stages the change event with `owner` as source.
    /// Returns whether anything changed.
    pub fn set(&mut self, owner: EntityId, value: T, batch: &mut EventBatch) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        batch.stage(self.event_type, owner, self.value.clone().into());
        true
    }

    /// Writes `value` without staging anything. Load paths use this while
    /// the object graph is still being materialised.
    pub fn load(&mut self, value: T) {
        self.value = value;
    }
}

/// An owned id set with optional delta and content-changed event types.
///
/// Fields that only announce their full contents (a task's category set)
/// configure just `changed_event`; fields with delta subscribers (a
/// category's member set) configure the delta pair.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SetCell {
    added_event: Option<EventType>,
    removed_event: Option<EventType>,
    changed_event: Option<EventType>,
    items: BTreeSet<EntityId>,
}

impl SetCell {
    pub fn new(
        added_event: Option<EventType>,
        removed_event: Option<EventType>,
        changed_event: Option<EventType>,
    ) -> SetCell {
        SetCell {
            added_event,
            removed_event,
            changed_event,
            items: BTreeSet::new(),
        }
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.items.contains(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.items.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Adds one id. Returns whether the set changed.
    pub fn insert(&mut self, owner: EntityId, id: EntityId, batch: &mut EventBatch) -> bool {
        if !self.items.insert(id) {
            return false;
        }
        self.stage_delta(owner, self.added_event, vec![id], batch);
        self.stage_changed(owner, batch);
        true
    }

    /// Removes one id. Returns whether the set changed.
    pub fn remove(&mut self, owner: EntityId, id: EntityId, batch: &mut EventBatch) -> bool {
        if !self.items.remove(&id) {
            return false;
        }
        self.stage_delta(owner, self.removed_event, vec![id], batch);
        self.stage_changed(owner, batch);
        true
    }

    /// Replaces the whole set, staging only the actual delta.
    pub fn replace(
        &mut self,
        owner: EntityId,
        items: BTreeSet<EntityId>,
        batch: &mut EventBatch,
    ) -> bool {
        let added: Vec<EntityId> = items.difference(&self.items).copied().collect();
        let removed: Vec<EntityId> = self.items.difference(&items).copied().collect();
        if added.is_empty() && removed.is_empty() {
            return false;
        }
        self.items = items;
        if !added.is_empty() {
            self.stage_delta(owner, self.added_event, added, batch);
        }
        if !removed.is_empty() {
            self.stage_delta(owner, self.removed_event, removed, batch);
        }
        self.stage_changed(owner, batch);
        true
    }

    /// Replaces the contents without staging anything (load paths).
    pub fn load(&mut self, items: BTreeSet<EntityId>) {
        self.items = items;
    }

    fn stage_delta(
        &self,
        owner: EntityId,
        event_type: Option<EventType>,
        ids: Vec<EntityId>,
        batch: &mut EventBatch,
    ) {
        if let Some(event_type) = event_type {
            batch.stage(event_type, owner, Payload::Ids(ids));
        }
    }

    fn stage_changed(&self, owner: EntityId, batch: &mut EventBatch) {
        if let Some(event_type) = self.changed_event {
            batch.stage(event_type, owner, Payload::Ids(self.ids().collect()));
        }
    }
}
