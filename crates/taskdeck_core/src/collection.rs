//! Ordered containers of domain entities.
//!
//! # Responsibility
//! - Keep one pool of entities per kind, in stable insertion order.
//! - Publish collection-level add/remove events with the collection itself
//!   as source.
//!
//! # Invariants
//! - Ids are unique within a collection; duplicate inserts are refused
//!   before any state changes.
//! - `order` and `items` always agree on membership.

use crate::error::DomainError;
use crate::event::{EventBatch, Payload};
use crate::model::composite::Entity;
use crate::model::{EntityId, EntityKind};
use std::collections::HashMap;
use uuid::Uuid;

/// Ordered entity container with its own event source identity.
///
/// The synthetic source id lets observers subscribe to exactly one
/// collection's add/remove traffic on a bus shared by many collections.
#[derive(Debug)]
pub struct Collection<T: Entity> {
    kind: EntityKind,
    source: EntityId,
    order: Vec<EntityId>,
    items: HashMap<EntityId, T>,
}

impl<T: Entity> Collection<T> {
    pub fn new(kind: EntityKind) -> Collection<T> {
        Collection {
            kind,
            source: Uuid::new_v4(),
            order: Vec::new(),
            items: HashMap::new(),
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Event source id of this collection.
    pub fn source_id(&self) -> EntityId {
        self.source
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&T> {
        self.items.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        self.items.get_mut(&id)
    }

    /// Ids in insertion order.
    pub fn ids(&self) -> &[EntityId] {
        &self.order
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.order.iter().filter_map(|id| self.items.get(id))
    }

    /// Inserts one entity and stages the collection add event.
    pub fn insert(&mut self, item: T, batch: &mut EventBatch) -> Result<EntityId, DomainError> {
        let id = item.id();
        if self.items.contains_key(&id) {
            return Err(DomainError::DuplicateEntity(id));
        }
        self.order.push(id);
        self.items.insert(id, item);
        batch.stage(
            self.kind.collection_added_event(),
            self.source,
            Payload::Ids(vec![id]),
        );
        Ok(id)
    }

    /// Removes one entity and stages the collection remove event. Returns
    /// the removed entity so callers can keep it for undo.
    pub fn remove(&mut self, id: EntityId, batch: &mut EventBatch) -> Option<T> {
        let item = self.items.remove(&id)?;
        self.order.retain(|candidate| *candidate != id);
        batch.stage(
            self.kind.collection_removed_event(),
            self.source,
            Payload::Ids(vec![id]),
        );
        Some(item)
    }

    /// Ids of entities whose tree parent is not part of this collection.
    pub fn root_ids(&self) -> Vec<EntityId>
    where
        T: crate::model::composite::Composite,
    {
        self.order
            .iter()
            .copied()
            .filter(|id| {
                self.items
                    .get(id)
                    .and_then(|item| item.core().parent())
                    .map(|parent| !self.items.contains_key(&parent))
                    .unwrap_or(true)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::Collection;
    use crate::error::DomainError;
    use crate::event::EventBatch;
    use crate::model::composite::Entity;
    use crate::model::task::Task;
    use crate::model::EntityKind;

    #[test]
    fn duplicate_insert_is_refused() {
        let mut tasks = Collection::new(EntityKind::Task);
        let mut batch = EventBatch::new();
        let task = Task::new("once");
        let id = task.id();
        tasks.insert(task, &mut batch).unwrap();
        let err = tasks
            .insert(Task::with_id(id, "again"), &mut batch)
            .unwrap_err();
        assert_eq!(err, DomainError::DuplicateEntity(id));
    }
}
