//! Category record.
//!
//! # Responsibility
//! - Keep the category side of the bidirectional membership link.
//! - Carry the user-facing `filtered` flag and the exclusive-subcategories
//!   flag.
//!
//! # Invariants
//! - Membership is mirrored on the categorizable; only the workspace
//!   mutates either side, always both in one batch.

use crate::attribute::{SetCell, ValueCell};
use crate::event::EventBatch;
use crate::model::composite::{Composite, CompositeCore, Entity};
use crate::model::{
    EntityId, EntityKind, CATEGORY_FILTER_CHANGED, CATEGORY_MEMBER_ADDED, CATEGORY_MEMBER_REMOVED,
};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    core: CompositeCore,
    pub(crate) categorizables: SetCell,
    filtered: ValueCell<bool>,
    exclusive_subcategories: ValueCell<bool>,
}

impl Category {
    pub fn new(subject: impl Into<String>) -> Category {
        Self::with_id(Uuid::new_v4(), subject)
    }

    pub fn with_id(id: EntityId, subject: impl Into<String>) -> Category {
        Category {
            core: CompositeCore::with_id(id, EntityKind::Category, subject),
            categorizables: SetCell::new(
                Some(CATEGORY_MEMBER_ADDED),
                Some(CATEGORY_MEMBER_REMOVED),
                None,
            ),
            filtered: ValueCell::new(CATEGORY_FILTER_CHANGED, false),
            exclusive_subcategories: ValueCell::new("category.exclusiveSubcategories", false),
        }
    }

    pub fn categorizable_ids(&self) -> Vec<EntityId> {
        self.categorizables.ids().collect()
    }

    pub fn contains_directly(&self, id: EntityId) -> bool {
        self.categorizables.contains(id)
    }

    /// Whether the user toggled this category into the active filter.
    pub fn is_filtered(&self) -> bool {
        *self.filtered.get()
    }

    pub fn set_filtered(&mut self, value: bool, batch: &mut EventBatch) -> bool {
        let id = self.id();
        self.filtered.set(id, value, batch)
    }

    pub fn has_exclusive_subcategories(&self) -> bool {
        *self.exclusive_subcategories.get()
    }

    pub fn set_exclusive_subcategories(&mut self, value: bool, batch: &mut EventBatch) -> bool {
        let id = self.id();
        self.exclusive_subcategories.set(id, value, batch)
    }
}

impl Entity for Category {
    fn id(&self) -> EntityId {
        self.core.id()
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Category
    }
}

impl Composite for Category {
    fn core(&self) -> &CompositeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CompositeCore {
        &mut self.core
    }
}
