//! Shared base of every composite domain entity.
//!
//! # Responsibility
//! - Carry the attributes common to tasks, notes, categories and
//!   attachments: subject, description, appearance, icons, tree links and
//!   owned note/attachment ids.
//! - Stage the per-kind change events when those attributes move.
//!
//! # Invariants
//! - `id` and `kind` are fixed at construction.
//! - Tree and ownership links are adjusted only by the workspace, which
//!   keeps both sides of each link in step.

use crate::appearance::{FontSpec, Rgba};
use crate::attribute::ValueCell;
use crate::event::EventBatch;
use crate::model::{EntityId, EntityKind};
use uuid::Uuid;

/// Common state embedded in every composite entity.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeCore {
    id: EntityId,
    kind: EntityKind,
    subject: ValueCell<String>,
    description: ValueCell<String>,
    foreground_color: ValueCell<Option<Rgba>>,
    background_color: ValueCell<Option<Rgba>>,
    font: ValueCell<Option<FontSpec>>,
    icon: ValueCell<String>,
    selected_icon: ValueCell<String>,
    /// Same-kind tree parent; `None` for roots.
    pub(crate) parent: Option<EntityId>,
    /// Same-kind children, in presentation order.
    pub(crate) children: Vec<EntityId>,
    /// Composite that owns this entity as a note or attachment, if any.
    pub(crate) owner: Option<EntityId>,
    /// Owned notes, in creation order.
    pub(crate) notes: Vec<EntityId>,
    /// Owned attachments, in creation order.
    pub(crate) attachments: Vec<EntityId>,
}

impl CompositeCore {
    pub fn new(kind: EntityKind, subject: impl Into<String>) -> CompositeCore {
        Self::with_id(Uuid::new_v4(), kind, subject)
    }

    /// Used by load and restore paths where identity already exists.
    pub fn with_id(id: EntityId, kind: EntityKind, subject: impl Into<String>) -> CompositeCore {
        CompositeCore {
            id,
            kind,
            subject: ValueCell::new(kind.subject_event(), subject.into()),
            description: ValueCell::new(kind.description_event(), String::new()),
            foreground_color: ValueCell::new(kind.foreground_color_event(), None),
            background_color: ValueCell::new(kind.background_color_event(), None),
            font: ValueCell::new(kind.font_event(), None),
            icon: ValueCell::new(kind.icon_event(), String::new()),
            selected_icon: ValueCell::new(kind.selected_icon_event(), String::new()),
            parent: None,
            children: Vec::new(),
            owner: None,
            notes: Vec::new(),
            attachments: Vec::new(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    pub fn subject(&self) -> &str {
        self.subject.get()
    }

    pub fn description(&self) -> &str {
        self.description.get()
    }

    /// Own colour; `None` means "inherit" and is resolved by the workspace.
    pub fn foreground_color(&self) -> Option<Rgba> {
        *self.foreground_color.get()
    }

    pub fn background_color(&self) -> Option<Rgba> {
        *self.background_color.get()
    }

    pub fn font(&self) -> Option<&FontSpec> {
        self.font.get().as_ref()
    }

    pub fn icon(&self) -> &str {
        self.icon.get()
    }

    pub fn selected_icon(&self) -> &str {
        self.selected_icon.get()
    }

    pub fn parent(&self) -> Option<EntityId> {
        self.parent
    }

    pub fn children(&self) -> &[EntityId] {
        &self.children
    }

    pub fn owner(&self) -> Option<EntityId> {
        self.owner
    }

    pub fn notes(&self) -> &[EntityId] {
        &self.notes
    }

    pub fn attachments(&self) -> &[EntityId] {
        &self.attachments
    }

    pub fn set_subject(&mut self, value: impl Into<String>, batch: &mut EventBatch) -> bool {
        self.subject.set(self.id, value.into(), batch)
    }

    pub fn set_description(&mut self, value: impl Into<String>, batch: &mut EventBatch) -> bool {
        self.description.set(self.id, value.into(), batch)
    }

    pub fn set_foreground_color(&mut self, value: Option<Rgba>, batch: &mut EventBatch) -> bool {
        self.foreground_color.set(self.id, value, batch)
    }

    pub fn set_background_color(&mut self, value: Option<Rgba>, batch: &mut EventBatch) -> bool {
        self.background_color.set(self.id, value, batch)
    }

    pub fn set_font(&mut self, value: Option<FontSpec>, batch: &mut EventBatch) -> bool {
        self.font.set(self.id, value, batch)
    }

    pub fn set_icon(&mut self, value: impl Into<String>, batch: &mut EventBatch) -> bool {
        self.icon.set(self.id, value.into(), batch)
    }

    pub fn set_selected_icon(&mut self, value: impl Into<String>, batch: &mut EventBatch) -> bool {
        self.selected_icon.set(self.id, value.into(), batch)
    }
}

/// Anything stored in a workspace collection.
pub trait Entity {
    fn id(&self) -> EntityId;
    fn kind(&self) -> EntityKind;
}

/// Entities built on [`CompositeCore`].
pub trait Composite: Entity {
    fn core(&self) -> &CompositeCore;
    fn core_mut(&mut self) -> &mut CompositeCore;
}
