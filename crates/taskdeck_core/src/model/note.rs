//! Note record: a composite with category membership and nothing else.

use crate::attribute::SetCell;
use crate::model::composite::{Composite, CompositeCore, Entity};
use crate::model::{EntityId, EntityKind};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    core: CompositeCore,
    pub(crate) categories: SetCell,
}

impl Note {
    pub fn new(subject: impl Into<String>) -> Note {
        Self::with_id(Uuid::new_v4(), subject)
    }

    pub fn with_id(id: EntityId, subject: impl Into<String>) -> Note {
        Note {
            core: CompositeCore::with_id(id, EntityKind::Note, subject),
            categories: SetCell::new(None, None, Some("note.categories")),
        }
    }

    pub fn category_ids(&self) -> Vec<EntityId> {
        self.categories.ids().collect()
    }
}

impl Entity for Note {
    fn id(&self) -> EntityId {
        self.core.id()
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Note
    }
}

impl Composite for Note {
    fn core(&self) -> &CompositeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CompositeCore {
        &mut self.core
    }
}
