//! Domain entity records and the event-type vocabulary they publish.
//!
//! # Responsibility
//! - Define the entity kinds and their stable event-type strings.
//! - Host the per-kind record types (task, note, category, attachment,
//!   effort).
//!
//! # Invariants
//! - Every entity is identified by a stable `EntityId`, never reused.
//! - Event-type strings are part of the embedder contract and never change
//!   at runtime.

pub mod attachment;
pub mod category;
pub mod composite;
pub mod effort;
pub mod note;
pub mod task;

use crate::event::EventType;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for every domain entity.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type EntityId = Uuid;

/// Shared track-state event types, identical for single and aggregated
/// efforts so aggregate observers subscribe once.
pub const EFFORT_TRACK_START: EventType = "effort.track.start";
pub const EFFORT_TRACK_STOP: EventType = "effort.track.stop";

/// Category membership events, published with the category as source.
pub const CATEGORY_MEMBER_ADDED: EventType = "category.categorizable.add";
pub const CATEGORY_MEMBER_REMOVED: EventType = "category.categorizable.remove";
pub const CATEGORY_FILTER_CHANGED: EventType = "category.filterChanged";

/// The kind of a domain entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Task,
    Note,
    Category,
    Attachment,
    Effort,
}

impl EntityKind {
    /// Lower-case label used in event-type strings and log lines.
    pub fn label(self) -> &'static str {
        match self {
            EntityKind::Task => "task",
            EntityKind::Note => "note",
            EntityKind::Category => "category",
            EntityKind::Attachment => "attachment",
            EntityKind::Effort => "effort",
        }
    }

    /// Whether entities of this kind can belong to categories.
    pub fn is_categorizable(self) -> bool {
        matches!(
            self,
            EntityKind::Task | EntityKind::Note | EntityKind::Attachment
        )
    }

    pub fn subject_event(self) -> EventType {
        match self {
            EntityKind::Task => "task.subject",
            EntityKind::Note => "note.subject",
            EntityKind::Category => "category.subject",
            EntityKind::Attachment => "attachment.subject",
            EntityKind::Effort => "effort.subject",
        }
    }

    pub fn description_event(self) -> EventType {
        match self {
            EntityKind::Task => "task.description",
            EntityKind::Note => "note.description",
            EntityKind::Category => "category.description",
            EntityKind::Attachment => "attachment.description",
            EntityKind::Effort => "effort.description",
        }
    }

    pub fn foreground_color_event(self) -> EventType {
        match self {
            EntityKind::Task => "task.foregroundColor",
            EntityKind::Note => "note.foregroundColor",
            EntityKind::Category => "category.foregroundColor",
            EntityKind::Attachment => "attachment.foregroundColor",
            EntityKind::Effort => "effort.foregroundColor",
        }
    }

    pub fn background_color_event(self) -> EventType {
        match self {
            EntityKind::Task => "task.backgroundColor",
            EntityKind::Note => "note.backgroundColor",
            EntityKind::Category => "category.backgroundColor",
            EntityKind::Attachment => "attachment.backgroundColor",
            EntityKind::Effort => "effort.backgroundColor",
        }
    }

    pub fn font_event(self) -> EventType {
        match self {
            EntityKind::Task => "task.font",
            EntityKind::Note => "note.font",
            EntityKind::Category => "category.font",
            EntityKind::Attachment => "attachment.font",
            EntityKind::Effort => "effort.font",
        }
    }

    pub fn icon_event(self) -> EventType {
        match self {
            EntityKind::Task => "task.icon",
            EntityKind::Note => "note.icon",
            EntityKind::Category => "category.icon",
            EntityKind::Attachment => "attachment.icon",
            EntityKind::Effort => "effort.icon",
        }
    }

    pub fn selected_icon_event(self) -> EventType {
        match self {
            EntityKind::Task => "task.selectedIcon",
            EntityKind::Note => "note.selectedIcon",
            EntityKind::Category => "category.selectedIcon",
            EntityKind::Attachment => "attachment.selectedIcon",
            EntityKind::Effort => "effort.selectedIcon",
        }
    }

    pub fn children_added_event(self) -> EventType {
        match self {
            EntityKind::Task => "task.children.add",
            EntityKind::Note => "note.children.add",
            EntityKind::Category => "category.children.add",
            EntityKind::Attachment => "attachment.children.add",
            EntityKind::Effort => "effort.children.add",
        }
    }

    pub fn children_removed_event(self) -> EventType {
        match self {
            EntityKind::Task => "task.children.remove",
            EntityKind::Note => "note.children.remove",
            EntityKind::Category => "category.children.remove",
            EntityKind::Attachment => "attachment.children.remove",
            EntityKind::Effort => "effort.children.remove",
        }
    }

    /// Membership-changed event on the categorizable side of the link.
    pub fn categories_event(self) -> EventType {
        match self {
            EntityKind::Task => "task.categories",
            EntityKind::Note => "note.categories",
            EntityKind::Category => "category.categories",
            EntityKind::Attachment => "attachment.categories",
            EntityKind::Effort => "effort.categories",
        }
    }

    /// Add event of the collection holding this kind.
    pub fn collection_added_event(self) -> EventType {
        match self {
            EntityKind::Task => "tasks.add",
            EntityKind::Note => "notes.add",
            EntityKind::Category => "categories.add",
            EntityKind::Attachment => "attachments.add",
            EntityKind::Effort => "efforts.add",
        }
    }

    /// Remove event of the collection holding this kind.
    pub fn collection_removed_event(self) -> EventType {
        match self {
            EntityKind::Task => "tasks.remove",
            EntityKind::Note => "notes.remove",
            EntityKind::Category => "categories.remove",
            EntityKind::Attachment => "attachments.remove",
            EntityKind::Effort => "efforts.remove",
        }
    }

    /// All event types that count as a modification of an entity of this
    /// kind. The change monitor subscribes to every one of them.
    pub fn modification_event_types(self) -> &'static [EventType] {
        match self {
            EntityKind::Task => TASK_MODIFICATION_EVENTS,
            EntityKind::Note => NOTE_MODIFICATION_EVENTS,
            EntityKind::Category => CATEGORY_MODIFICATION_EVENTS,
            EntityKind::Attachment => ATTACHMENT_MODIFICATION_EVENTS,
            EntityKind::Effort => EFFORT_MODIFICATION_EVENTS,
        }
    }
}

const TASK_MODIFICATION_EVENTS: &[EventType] = &[
    "task.subject",
    "task.description",
    "task.foregroundColor",
    "task.backgroundColor",
    "task.font",
    "task.icon",
    "task.selectedIcon",
    "task.children.add",
    "task.children.remove",
    "task.categories",
    "task.plannedStartDateTime",
    "task.dueDateTime",
    "task.actualStartDateTime",
    "task.completionDateTime",
    "task.percentageComplete",
    "task.prerequisites",
    "task.recurrence",
    "task.reminder",
    "task.budget",
    "task.hourlyFee",
    "task.fixedFee",
    "task.priority",
    "task.efforts",
];

const NOTE_MODIFICATION_EVENTS: &[EventType] = &[
    "note.subject",
    "note.description",
    "note.foregroundColor",
    "note.backgroundColor",
    "note.font",
    "note.icon",
    "note.selectedIcon",
    "note.children.add",
    "note.children.remove",
    "note.categories",
];

const CATEGORY_MODIFICATION_EVENTS: &[EventType] = &[
    "category.subject",
    "category.description",
    "category.foregroundColor",
    "category.backgroundColor",
    "category.font",
    "category.icon",
    "category.selectedIcon",
    "category.children.add",
    "category.children.remove",
    CATEGORY_MEMBER_ADDED,
    CATEGORY_MEMBER_REMOVED,
    CATEGORY_FILTER_CHANGED,
    "category.exclusiveSubcategories",
];

const ATTACHMENT_MODIFICATION_EVENTS: &[EventType] = &[
    "attachment.subject",
    "attachment.description",
    "attachment.foregroundColor",
    "attachment.backgroundColor",
    "attachment.font",
    "attachment.icon",
    "attachment.selectedIcon",
    "attachment.children.add",
    "attachment.children.remove",
    "attachment.categories",
    "attachment.location",
];

const EFFORT_MODIFICATION_EVENTS: &[EventType] = &["effort.start", "effort.stop", "effort.task"];

/// Recurrence period unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceUnit {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// Recurrence rule of a task: a period unit times `amount`, optionally
/// bounded by a remaining-occurrence count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Recurrence {
    pub unit: RecurrenceUnit,
    /// Period multiplier, at least 1.
    pub amount: u32,
    /// Remaining occurrences; `None` recurs forever.
    pub max: Option<u32>,
}

impl Recurrence {
    pub fn new(unit: RecurrenceUnit, amount: u32) -> Recurrence {
        Recurrence {
            unit,
            amount: amount.max(1),
            max: None,
        }
    }

    pub fn with_max(unit: RecurrenceUnit, amount: u32, max: u32) -> Recurrence {
        Recurrence {
            unit,
            amount: amount.max(1),
            max: Some(max),
        }
    }
}
