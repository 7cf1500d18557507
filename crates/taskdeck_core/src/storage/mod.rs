//! Persisted workspace document.
//!
//! # Responsibility
//! - Serialize a workspace into one canonical JSON document and load it
//!   back in two passes (materialise records, then resolve references).
//! - Keep loading tolerant: dangling references are logged and skipped,
//!   a load that parses always completes.
//!
//! # Invariants
//! - Category membership is stored once, on the category side; the member
//!   side is rebuilt on load.
//! - Record order follows collection insertion order, so load → save
//!   round-trips byte-for-byte.
//! - Loading publishes no events.

use crate::appearance::{FontSpec, Rgba};
use crate::event::EventBatch;
use crate::model::attachment::{Attachment, AttachmentKind};
use crate::model::category::Category;
use crate::model::composite::{Composite, CompositeCore, Entity};
use crate::model::effort::Effort;
use crate::model::note::Note;
use crate::model::task::Task;
use crate::model::{EntityId, Recurrence};
use crate::time::{parse_date, parse_time_delta, Date};
use crate::workspace::Workspace;
use chrono::NaiveDateTime;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::Path;
use uuid::Uuid;

const DOCUMENT_VERSION: u32 = 1;
const STAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Load/save failures. Parse errors carry the underlying message verbatim.
#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Parse(String),
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(error) => write!(f, "document io failed: {error}"),
            Self::Parse(message) => write!(f, "document is not valid: {message}"),
        }
    }
}

impl Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(error: std::io::Error) -> StorageError {
        StorageError::Io(error)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(error: serde_json::Error) -> StorageError {
        StorageError::Parse(error.to_string())
    }
}

// ---- wire records ------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
struct CompositeRecord {
    id: String,
    subject: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    foreground_color: Option<Rgba>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    background_color: Option<Rgba>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    font: Option<FontSpec>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    icon: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    selected_icon: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
struct TaskRecord {
    #[serde(flatten)]
    composite: CompositeRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    planned_start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    actual_start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    completion_date: Option<String>,
    #[serde(default)]
    percentage_complete: u8,
    /// `H:MM:SS`; absent reads as zero.
    #[serde(default)]
    budget: String,
    #[serde(default)]
    hourly_fee_cents: i64,
    #[serde(default)]
    fixed_fee_cents: i64,
    #[serde(default)]
    priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    recurrence: Option<Recurrence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reminder: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    prerequisites: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
struct NoteRecord {
    #[serde(flatten)]
    composite: CompositeRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    owner: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
struct CategoryRecord {
    #[serde(flatten)]
    composite: CompositeRecord,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    categorizables: Vec<String>,
    #[serde(default)]
    filtered: bool,
    #[serde(default)]
    exclusive_subcategories: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
struct AttachmentRecord {
    #[serde(flatten)]
    composite: CompositeRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    owner: Option<String>,
    kind: AttachmentKind,
    location: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
struct EffortRecord {
    id: String,
    task: String,
    start: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stop: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
struct Document {
    version: u32,
    tasks: Vec<TaskRecord>,
    notes: Vec<NoteRecord>,
    categories: Vec<CategoryRecord>,
    attachments: Vec<AttachmentRecord>,
    efforts: Vec<EffortRecord>,
}

// ---- save --------------------------------------------------------------

/// Serializes the workspace into the canonical document string.
pub fn save_document(workspace: &Workspace) -> Result<String, StorageError> {
    let document = Document {
        version: DOCUMENT_VERSION,
        tasks: workspace.tasks().iter().map(task_record).collect(),
        notes: workspace.notes().iter().map(note_record).collect(),
        categories: workspace.categories().iter().map(category_record).collect(),
        attachments: workspace.attachments().iter().map(attachment_record).collect(),
        efforts: workspace.efforts().iter().map(effort_record).collect(),
    };
    let mut text = serde_json::to_string_pretty(&document)?;
    text.push('\n');
    Ok(text)
}

pub fn save_to_path(workspace: &Workspace, path: &Path) -> Result<(), StorageError> {
    let text = save_document(workspace)?;
    fs::write(path, text)?;
    info!(
        "event=document_saved module=storage path={} tasks={} notes={} categories={}",
        path.display(),
        workspace.tasks().len(),
        workspace.notes().len(),
        workspace.categories().len()
    );
    Ok(())
}

fn composite_record(core: &CompositeCore) -> CompositeRecord {
    CompositeRecord {
        id: core.id().to_string(),
        subject: core.subject().to_string(),
        description: core.description().to_string(),
        parent: core.parent().map(|id| id.to_string()),
        foreground_color: core.foreground_color(),
        background_color: core.background_color(),
        font: core.font().cloned(),
        icon: core.icon().to_string(),
        selected_icon: core.selected_icon().to_string(),
    }
}

fn task_record(task: &Task) -> TaskRecord {
    TaskRecord {
        composite: composite_record(task.core()),
        planned_start_date: date_to_wire(task.planned_start_date()),
        due_date: date_to_wire(task.due_date()),
        actual_start_date: date_to_wire(task.actual_start_date()),
        completion_date: date_to_wire(task.completion_date()),
        percentage_complete: task.percentage_complete(),
        budget: task.budget().to_string(),
        hourly_fee_cents: task.hourly_fee_cents(),
        fixed_fee_cents: task.fixed_fee_cents(),
        priority: task.priority(),
        recurrence: task.recurrence(),
        reminder: task.reminder().map(stamp_to_wire),
        prerequisites: task
            .prerequisite_ids()
            .iter()
            .map(|id| id.to_string())
            .collect(),
    }
}

fn note_record(note: &Note) -> NoteRecord {
    NoteRecord {
        composite: composite_record(note.core()),
        owner: note.core().owner().map(|id| id.to_string()),
    }
}

fn category_record(category: &Category) -> CategoryRecord {
    CategoryRecord {
        composite: composite_record(category.core()),
        categorizables: category
            .categorizable_ids()
            .iter()
            .map(|id| id.to_string())
            .collect(),
        filtered: category.is_filtered(),
        exclusive_subcategories: category.has_exclusive_subcategories(),
    }
}

fn attachment_record(attachment: &Attachment) -> AttachmentRecord {
    AttachmentRecord {
        composite: composite_record(attachment.core()),
        owner: attachment.core().owner().map(|id| id.to_string()),
        kind: attachment.attachment_kind(),
        location: attachment.location().to_string(),
    }
}

fn effort_record(effort: &Effort) -> EffortRecord {
    EffortRecord {
        id: effort.id().to_string(),
        task: effort.task_id().to_string(),
        start: stamp_to_wire(effort.start()),
        stop: effort.stop().map(stamp_to_wire),
    }
}

// ---- load --------------------------------------------------------------

/// Materialises a workspace from a document string. Dangling references
/// are logged and skipped; no events are published.
pub fn load_document(text: &str) -> Result<Workspace, StorageError> {
    let document: Document = serde_json::from_str(text)?;
    let mut workspace = Workspace::new();
    // Collected and dropped: loading stays silent on the bus.
    let mut scratch = EventBatch::new();

    // Pass one: materialise every record with its own attributes.
    for record in &document.tasks {
        let Some(id) = wire_id(&record.composite.id) else {
            continue;
        };
        let mut task = Task::with_id(id, record.composite.subject.clone());
        load_core(task.core_mut(), &record.composite, &mut scratch);
        task.set_planned_start_date(wire_to_date(&record.planned_start_date), &mut scratch);
        task.set_due_date(wire_to_date(&record.due_date), &mut scratch);
        task.set_actual_start_date(wire_to_date(&record.actual_start_date), &mut scratch);
        task.set_completion_date(wire_to_date(&record.completion_date), &mut scratch);
        task.set_percentage_complete(record.percentage_complete, &mut scratch);
        task.set_budget(parse_time_delta(&record.budget), &mut scratch);
        task.set_hourly_fee_cents(record.hourly_fee_cents, &mut scratch);
        task.set_fixed_fee_cents(record.fixed_fee_cents, &mut scratch);
        task.set_priority(record.priority, &mut scratch);
        task.set_recurrence(record.recurrence, &mut scratch);
        task.set_reminder(
            record.reminder.as_deref().and_then(wire_to_stamp),
            &mut scratch,
        );
        insert_logged(workspace.tasks_mut().insert(task, &mut scratch));
    }
    for record in &document.notes {
        let Some(id) = wire_id(&record.composite.id) else {
            continue;
        };
        let mut note = Note::with_id(id, record.composite.subject.clone());
        load_core(note.core_mut(), &record.composite, &mut scratch);
        note.core_mut().owner = record.owner.as_deref().and_then(wire_id);
        insert_logged(workspace.notes_mut().insert(note, &mut scratch));
    }
    for record in &document.categories {
        let Some(id) = wire_id(&record.composite.id) else {
            continue;
        };
        let mut category = Category::with_id(id, record.composite.subject.clone());
        load_core(category.core_mut(), &record.composite, &mut scratch);
        category.set_filtered(record.filtered, &mut scratch);
        category.set_exclusive_subcategories(record.exclusive_subcategories, &mut scratch);
        insert_logged(workspace.categories_mut().insert(category, &mut scratch));
    }
    for record in &document.attachments {
        let Some(id) = wire_id(&record.composite.id) else {
            continue;
        };
        let mut attachment = Attachment::with_id(
            id,
            record.kind,
            record.location.clone(),
            record.composite.subject.clone(),
        );
        load_core(attachment.core_mut(), &record.composite, &mut scratch);
        attachment.core_mut().owner = record.owner.as_deref().and_then(wire_id);
        insert_logged(workspace.attachments_mut().insert(attachment, &mut scratch));
    }

    // Pass two: resolve every cross-record reference.
    resolve_parents(&mut workspace, &document);
    resolve_owners(&mut workspace);
    for record in &document.categories {
        let Some(category) = wire_id(&record.composite.id) else {
            continue;
        };
        for member in &record.categorizables {
            let Some(member) = wire_id(member) else {
                continue;
            };
            if workspace
                .add_category_link(category, member, Some(&mut scratch))
                .is_err()
            {
                warn!(
                    "event=dangling_member module=storage category={} member={} status=skipped",
                    category, member
                );
            }
        }
    }
    for record in &document.tasks {
        let Some(task) = wire_id(&record.composite.id) else {
            continue;
        };
        for prerequisite in &record.prerequisites {
            let Some(prerequisite) = wire_id(prerequisite) else {
                continue;
            };
            if workspace
                .add_prerequisite(task, prerequisite, Some(&mut scratch))
                .is_err()
            {
                warn!(
                    "event=dangling_prerequisite module=storage task={} prerequisite={} status=skipped",
                    task, prerequisite
                );
            }
        }
    }
    for record in &document.efforts {
        let (Some(id), Some(task)) = (wire_id(&record.id), wire_id(&record.task)) else {
            continue;
        };
        let Some(start) = wire_to_stamp(&record.start) else {
            warn!(
                "event=bad_effort_stamp module=storage effort={} status=skipped",
                id
            );
            continue;
        };
        let stop = record.stop.as_deref().and_then(wire_to_stamp);
        let effort = Effort::with_id(id, task, start, stop);
        if workspace.add_effort(effort, Some(&mut scratch)).is_err() {
            warn!(
                "event=dangling_effort module=storage effort={} task={} status=skipped",
                id, task
            );
        }
    }

    info!(
        "event=document_loaded module=storage tasks={} notes={} categories={} attachments={} efforts={}",
        workspace.tasks().len(),
        workspace.notes().len(),
        workspace.categories().len(),
        workspace.attachments().len(),
        workspace.efforts().len()
    );
    Ok(workspace)
}

pub fn load_from_path(path: &Path) -> Result<Workspace, StorageError> {
    let text = fs::read_to_string(path)?;
    let mut workspace = load_document(&text)?;
    workspace.set_working_directory(path.parent().map(|parent| parent.to_path_buf()));
    Ok(workspace)
}

fn load_core(core: &mut CompositeCore, record: &CompositeRecord, scratch: &mut EventBatch) {
    core.set_description(record.description.clone(), scratch);
    core.set_foreground_color(record.foreground_color, scratch);
    core.set_background_color(record.background_color, scratch);
    core.set_font(record.font.clone(), scratch);
    core.set_icon(record.icon.clone(), scratch);
    core.set_selected_icon(record.selected_icon.clone(), scratch);
}

fn resolve_parents(workspace: &mut Workspace, document: &Document) {
    let pairs: Vec<(String, Option<String>)> = document
        .tasks
        .iter()
        .map(|record| (record.composite.id.clone(), record.composite.parent.clone()))
        .chain(
            document
                .notes
                .iter()
                .map(|record| (record.composite.id.clone(), record.composite.parent.clone())),
        )
        .chain(
            document
                .categories
                .iter()
                .map(|record| (record.composite.id.clone(), record.composite.parent.clone())),
        )
        .chain(
            document
                .attachments
                .iter()
                .map(|record| (record.composite.id.clone(), record.composite.parent.clone())),
        )
        .collect();

    for (child, parent) in pairs {
        let (Some(child), Some(parent)) = (wire_id(&child), parent.as_deref().and_then(wire_id))
        else {
            continue;
        };
        let same_kind = match (workspace.kind_of(child), workspace.kind_of(parent)) {
            (Some(child_kind), Some(parent_kind)) => child_kind == parent_kind,
            _ => false,
        };
        if !same_kind || workspace.would_create_cycle(child, parent) {
            warn!(
                "event=dangling_parent module=storage child={} parent={} status=skipped",
                child, parent
            );
            continue;
        }
        if let Some(core) = workspace.core_mut(child) {
            core.parent = Some(parent);
        }
        if let Some(core) = workspace.core_mut(parent) {
            core.children.push(child);
        }
    }
}

/// Rebuilds the owner-side note/attachment lists from the records'
/// back-references.
fn resolve_owners(workspace: &mut Workspace) {
    let note_owners: Vec<(EntityId, Option<EntityId>)> = workspace
        .notes()
        .iter()
        .map(|note| (note.id(), note.core().owner()))
        .collect();
    for (note, owner) in note_owners {
        let Some(owner) = owner else {
            continue;
        };
        match workspace.core_mut(owner) {
            Some(core) => core.notes.push(note),
            None => {
                warn!(
                    "event=dangling_owner module=storage owned={} owner={} status=cleared",
                    note, owner
                );
                if let Some(core) = workspace.core_mut(note) {
                    core.owner = None;
                }
            }
        }
    }
    let attachment_owners: Vec<(EntityId, Option<EntityId>)> = workspace
        .attachments()
        .iter()
        .map(|attachment| (attachment.id(), attachment.core().owner()))
        .collect();
    for (attachment, owner) in attachment_owners {
        let Some(owner) = owner else {
            continue;
        };
        match workspace.core_mut(owner) {
            Some(core) => core.attachments.push(attachment),
            None => {
                warn!(
                    "event=dangling_owner module=storage owned={} owner={} status=cleared",
                    attachment, owner
                );
                if let Some(core) = workspace.core_mut(attachment) {
                    core.owner = None;
                }
            }
        }
    }
}

fn insert_logged(result: Result<EntityId, crate::error::DomainError>) {
    if let Err(error) = result {
        warn!("event=duplicate_record module=storage status=skipped error={error}");
    }
}

// ---- wire conversions --------------------------------------------------

fn wire_id(value: &str) -> Option<EntityId> {
    match Uuid::parse_str(value) {
        Ok(id) => Some(id),
        Err(_) => {
            warn!("event=bad_id module=storage value={value:?} status=skipped");
            None
        }
    }
}

fn date_to_wire(date: Date) -> Option<String> {
    date.naive().map(|naive| naive.format("%Y-%m-%d").to_string())
}

fn wire_to_date(value: &Option<String>) -> Date {
    match value {
        Some(text) => parse_date(text, Date::Infinite),
        None => Date::Infinite,
    }
}

fn stamp_to_wire(stamp: NaiveDateTime) -> String {
    stamp.format(STAMP_FORMAT).to_string()
}

fn wire_to_stamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, STAMP_FORMAT).ok()
}
