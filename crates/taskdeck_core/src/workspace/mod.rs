//! Workspace: the root aggregate owning every entity pool and the bus.
//!
//! # Responsibility
//! - Own the task/note/category/attachment/effort pools and the event bus.
//! - Provide every mutation entry point, batching staged events and
//!   sending them atomically when the caller did not supply a batch.
//! - Maintain the tree invariants: parent/children agreement, forest
//!   shape, cascading removal of descendants and owned entities.
//!
//! # Invariants
//! - `child.parent == p` iff `child ∈ p.children`, for every composite.
//! - The parent/children graph is a forest; cycle-creating links are
//!   refused before any state changes.
//! - Removal of a composite removes all descendants, owned notes, owned
//!   attachments and owned efforts in one batched delivery wave.

pub mod categories;
pub mod tasks;

use crate::appearance::{FontSpec, Rgba};
use crate::collection::Collection;
use crate::error::DomainError;
use crate::event::{EventBatch, EventBus, Payload};
use crate::model::attachment::Attachment;
use crate::model::category::Category;
use crate::model::composite::{Composite, CompositeCore, Entity};
use crate::model::effort::Effort;
use crate::model::note::Note;
use crate::model::task::Task;
use crate::model::{EntityId, EntityKind, EFFORT_TRACK_STOP};
use log::{info, warn};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// In-memory domain model of one task file.
pub struct Workspace {
    bus: EventBus,
    tasks: Collection<Task>,
    notes: Collection<Note>,
    categories: Collection<Category>,
    attachments: Collection<Attachment>,
    efforts: Collection<Effort>,
    working_directory: Option<PathBuf>,
}

/// Everything detached by one cascading removal, kept whole so undo can
/// put it back exactly as it was.
#[derive(Debug)]
pub struct RemovedGraph {
    /// Root composite the removal started from.
    root: EntityId,
    pub(crate) tasks: Vec<Task>,
    pub(crate) notes: Vec<Note>,
    pub(crate) categories: Vec<Category>,
    pub(crate) attachments: Vec<Attachment>,
    pub(crate) efforts: Vec<Effort>,
    /// Parent and child-list position the root was detached from.
    parent_link: Option<(EntityId, usize)>,
    /// (task, prerequisite) pairs scrubbed from surviving tasks.
    scrubbed_prerequisites: Vec<(EntityId, EntityId)>,
}

impl RemovedGraph {
    fn new(root: EntityId) -> RemovedGraph {
        RemovedGraph {
            root,
            tasks: Vec::new(),
            notes: Vec::new(),
            categories: Vec::new(),
            attachments: Vec::new(),
            efforts: Vec::new(),
            parent_link: None,
            scrubbed_prerequisites: Vec::new(),
        }
    }

    pub fn root(&self) -> EntityId {
        self.root
    }

    /// Ids of all removed entities, every kind mixed.
    pub fn ids(&self) -> Vec<EntityId> {
        self.tasks
            .iter()
            .map(|task| task.id())
            .chain(self.notes.iter().map(|note| note.id()))
            .chain(self.categories.iter().map(|category| category.id()))
            .chain(self.attachments.iter().map(|attachment| attachment.id()))
            .chain(self.efforts.iter().map(|effort| effort.id()))
            .collect()
    }
}

impl Default for Workspace {
    fn default() -> Workspace {
        Workspace::new()
    }
}

impl Workspace {
    pub fn new() -> Workspace {
        Workspace {
            bus: EventBus::new(),
            tasks: Collection::new(EntityKind::Task),
            notes: Collection::new(EntityKind::Note),
            categories: Collection::new(EntityKind::Category),
            attachments: Collection::new(EntityKind::Attachment),
            efforts: Collection::new(EntityKind::Effort),
            working_directory: None,
        }
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn tasks(&self) -> &Collection<Task> {
        &self.tasks
    }

    pub fn notes(&self) -> &Collection<Note> {
        &self.notes
    }

    pub fn categories(&self) -> &Collection<Category> {
        &self.categories
    }

    pub fn attachments(&self) -> &Collection<Attachment> {
        &self.attachments
    }

    pub fn efforts(&self) -> &Collection<Effort> {
        &self.efforts
    }

    pub(crate) fn tasks_mut(&mut self) -> &mut Collection<Task> {
        &mut self.tasks
    }

    pub(crate) fn notes_mut(&mut self) -> &mut Collection<Note> {
        &mut self.notes
    }

    pub(crate) fn categories_mut(&mut self) -> &mut Collection<Category> {
        &mut self.categories
    }

    pub(crate) fn attachments_mut(&mut self) -> &mut Collection<Attachment> {
        &mut self.attachments
    }

    /// Directory that relative file-attachment locations resolve against.
    pub fn working_directory(&self) -> Option<&PathBuf> {
        self.working_directory.as_ref()
    }

    pub fn set_working_directory(&mut self, directory: Option<PathBuf>) {
        self.working_directory = directory;
    }

    /// Runs `operation` against the supplied batch, or against a private
    /// one that is sent before returning (the atomic-mutation guarantee).
    pub(crate) fn transact<R>(
        &mut self,
        batch: Option<&mut EventBatch>,
        operation: impl FnOnce(&mut Workspace, &mut EventBatch) -> Result<R, DomainError>,
    ) -> Result<R, DomainError> {
        match batch {
            Some(batch) => operation(self, batch),
            None => {
                let mut local = EventBatch::new();
                let result = operation(self, &mut local)?;
                local.send(&self.bus);
                Ok(result)
            }
        }
    }

    // ---- entity lookup across pools ------------------------------------

    pub fn kind_of(&self, id: EntityId) -> Option<EntityKind> {
        if self.tasks.contains(id) {
            Some(EntityKind::Task)
        } else if self.notes.contains(id) {
            Some(EntityKind::Note)
        } else if self.categories.contains(id) {
            Some(EntityKind::Category)
        } else if self.attachments.contains(id) {
            Some(EntityKind::Attachment)
        } else if self.efforts.contains(id) {
            Some(EntityKind::Effort)
        } else {
            None
        }
    }

    pub(crate) fn core(&self, id: EntityId) -> Option<&CompositeCore> {
        self.tasks
            .get(id)
            .map(Composite::core)
            .or_else(|| self.notes.get(id).map(Composite::core))
            .or_else(|| self.categories.get(id).map(Composite::core))
            .or_else(|| self.attachments.get(id).map(Composite::core))
    }

    pub(crate) fn core_mut(&mut self, id: EntityId) -> Option<&mut CompositeCore> {
        if self.tasks.contains(id) {
            return self.tasks.get_mut(id).map(Composite::core_mut);
        }
        if self.notes.contains(id) {
            return self.notes.get_mut(id).map(Composite::core_mut);
        }
        if self.categories.contains(id) {
            return self.categories.get_mut(id).map(Composite::core_mut);
        }
        if self.attachments.contains(id) {
            return self.attachments.get_mut(id).map(Composite::core_mut);
        }
        None
    }

    fn existing_core(&self, id: EntityId) -> Result<&CompositeCore, DomainError> {
        match self.core(id) {
            Some(core) => Ok(core),
            None if self.efforts.contains(id) => Err(DomainError::NotComposite(id)),
            None => Err(DomainError::UnknownEntity(id)),
        }
    }

    fn existing_core_mut(&mut self, id: EntityId) -> Result<&mut CompositeCore, DomainError> {
        if self.efforts.contains(id) {
            return Err(DomainError::NotComposite(id));
        }
        self.core_mut(id).ok_or(DomainError::UnknownEntity(id))
    }

    // ---- generic composite setters -------------------------------------

    pub fn set_subject(
        &mut self,
        id: EntityId,
        value: &str,
        batch: Option<&mut EventBatch>,
    ) -> Result<(), DomainError> {
        self.transact(batch, |ws, batch| {
            let core = ws.existing_core_mut(id)?;
            core.set_subject(value, batch);
            Ok(())
        })
    }

    pub fn set_description(
        &mut self,
        id: EntityId,
        value: &str,
        batch: Option<&mut EventBatch>,
    ) -> Result<(), DomainError> {
        self.transact(batch, |ws, batch| {
            let core = ws.existing_core_mut(id)?;
            core.set_description(value, batch);
            Ok(())
        })
    }

    pub fn set_foreground_color(
        &mut self,
        id: EntityId,
        value: Option<Rgba>,
        batch: Option<&mut EventBatch>,
    ) -> Result<(), DomainError> {
        self.transact(batch, |ws, batch| {
            let core = ws.existing_core_mut(id)?;
            core.set_foreground_color(value, batch);
            Ok(())
        })
    }

    pub fn set_background_color(
        &mut self,
        id: EntityId,
        value: Option<Rgba>,
        batch: Option<&mut EventBatch>,
    ) -> Result<(), DomainError> {
        self.transact(batch, |ws, batch| {
            let core = ws.existing_core_mut(id)?;
            core.set_background_color(value, batch);
            Ok(())
        })
    }

    pub fn set_font(
        &mut self,
        id: EntityId,
        value: Option<FontSpec>,
        batch: Option<&mut EventBatch>,
    ) -> Result<(), DomainError> {
        self.transact(batch, |ws, batch| {
            let core = ws.existing_core_mut(id)?;
            core.set_font(value, batch);
            Ok(())
        })
    }

    pub fn set_icon(
        &mut self,
        id: EntityId,
        value: &str,
        batch: Option<&mut EventBatch>,
    ) -> Result<(), DomainError> {
        self.transact(batch, |ws, batch| {
            let core = ws.existing_core_mut(id)?;
            core.set_icon(value, batch);
            Ok(())
        })
    }

    pub fn set_selected_icon(
        &mut self,
        id: EntityId,
        value: &str,
        batch: Option<&mut EventBatch>,
    ) -> Result<(), DomainError> {
        self.transact(batch, |ws, batch| {
            let core = ws.existing_core_mut(id)?;
            core.set_selected_icon(value, batch);
            Ok(())
        })
    }

    // ---- entity creation -----------------------------------------------

    /// Inserts a top-level task and re-establishes any category links the
    /// task claims.
    pub fn add_task(
        &mut self,
        task: Task,
        batch: Option<&mut EventBatch>,
    ) -> Result<EntityId, DomainError> {
        self.transact(batch, |ws, batch| {
            let id = ws.tasks.insert(task, batch)?;
            ws.relink_claimed_categories(id, batch);
            Ok(id)
        })
    }

    pub fn add_note(
        &mut self,
        note: Note,
        batch: Option<&mut EventBatch>,
    ) -> Result<EntityId, DomainError> {
        self.transact(batch, |ws, batch| {
            let id = ws.notes.insert(note, batch)?;
            ws.relink_claimed_categories(id, batch);
            Ok(id)
        })
    }

    pub fn add_category(
        &mut self,
        category: Category,
        batch: Option<&mut EventBatch>,
    ) -> Result<EntityId, DomainError> {
        self.transact(batch, |ws, batch| ws.categories.insert(category, batch))
    }

    /// Inserts a note owned by an existing composite.
    pub fn add_note_to(
        &mut self,
        owner: EntityId,
        mut note: Note,
        batch: Option<&mut EventBatch>,
    ) -> Result<EntityId, DomainError> {
        self.transact(batch, |ws, batch| {
            ws.existing_core(owner)?;
            note.core_mut().owner = Some(owner);
            let id = ws.notes.insert(note, batch)?;
            ws.core_mut(owner)
                .expect("owner existence checked above")
                .notes
                .push(id);
            ws.relink_claimed_categories(id, batch);
            Ok(id)
        })
    }

    /// Inserts an attachment owned by an existing composite.
    pub fn add_attachment_to(
        &mut self,
        owner: EntityId,
        mut attachment: Attachment,
        batch: Option<&mut EventBatch>,
    ) -> Result<EntityId, DomainError> {
        self.transact(batch, |ws, batch| {
            ws.existing_core(owner)?;
            attachment.core_mut().owner = Some(owner);
            let id = ws.attachments.insert(attachment, batch)?;
            ws.core_mut(owner)
                .expect("owner existence checked above")
                .attachments
                .push(id);
            ws.relink_claimed_categories(id, batch);
            Ok(id)
        })
    }

    // ---- tree operations -----------------------------------------------

    /// Links `child` under `parent`. Both must exist, be composites of the
    /// same kind, and the link must keep the graph a forest.
    pub fn add_child(
        &mut self,
        parent: EntityId,
        child: EntityId,
        batch: Option<&mut EventBatch>,
    ) -> Result<(), DomainError> {
        self.transact(batch, |ws, batch| {
            let parent_kind = ws.existing_core(parent)?.kind();
            let child_core = ws.existing_core(child)?;
            if child_core.kind() != parent_kind {
                return Err(DomainError::WrongKind {
                    id: child,
                    expected: parent_kind,
                    actual: child_core.kind(),
                });
            }
            if let Some(existing) = child_core.parent() {
                return Err(DomainError::AlreadyHasParent {
                    child,
                    parent: existing,
                });
            }
            if ws.would_create_cycle(child, parent) {
                return Err(DomainError::CycleDetected { child, parent });
            }

            ws.core_mut(child)
                .expect("child existence checked above")
                .parent = Some(parent);
            let parent_core = ws.core_mut(parent).expect("parent existence checked above");
            parent_core.children.push(child);
            batch.stage(
                parent_kind.children_added_event(),
                parent,
                Payload::Ids(vec![child]),
            );
            Ok(())
        })
    }

    /// Unlinks `child` from `parent`, making it a root.
    pub fn remove_child(
        &mut self,
        parent: EntityId,
        child: EntityId,
        batch: Option<&mut EventBatch>,
    ) -> Result<(), DomainError> {
        self.transact(batch, |ws, batch| {
            let parent_kind = ws.existing_core(parent)?.kind();
            let child_core = ws.existing_core(child)?;
            if child_core.parent() != Some(parent) {
                return Err(DomainError::NotAChild { child, parent });
            }

            ws.core_mut(child)
                .expect("child existence checked above")
                .parent = None;
            let parent_core = ws.core_mut(parent).expect("parent existence checked above");
            parent_core.children.retain(|candidate| *candidate != child);
            batch.stage(
                parent_kind.children_removed_event(),
                parent,
                Payload::Ids(vec![child]),
            );
            Ok(())
        })
    }

    /// Ancestor chain of `id`, root first.
    pub fn ancestors(&self, id: EntityId) -> Vec<EntityId> {
        let mut chain = Vec::new();
        let mut cursor = self.core(id).and_then(CompositeCore::parent);
        let mut visited = BTreeSet::new();
        while let Some(current) = cursor {
            if !visited.insert(current) {
                break;
            }
            chain.push(current);
            cursor = self.core(current).and_then(CompositeCore::parent);
        }
        chain.reverse();
        chain
    }

    /// Descendants of `id` in pre-order, excluding `id` itself.
    pub fn descendants(&self, id: EntityId) -> Vec<EntityId> {
        let mut result = Vec::new();
        let mut visited = BTreeSet::new();
        visited.insert(id);
        let mut stack: Vec<EntityId> = self
            .core(id)
            .map(|core| core.children().iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            result.push(current);
            if let Some(core) = self.core(current) {
                stack.extend(core.children().iter().rev().copied());
            }
        }
        result
    }

    /// Ancestors, `id` itself and descendants. The relation tree-aware
    /// filters and inherited appearance are defined over.
    pub fn family(&self, id: EntityId) -> Vec<EntityId> {
        let mut result = self.ancestors(id);
        result.push(id);
        result.extend(self.descendants(id));
        result
    }

    pub(crate) fn would_create_cycle(&self, child: EntityId, candidate_parent: EntityId) -> bool {
        let mut visited = BTreeSet::new();
        let mut cursor = Some(candidate_parent);
        while let Some(current) = cursor {
            if current == child {
                return true;
            }
            if !visited.insert(current) {
                return true;
            }
            cursor = self.core(current).and_then(CompositeCore::parent);
        }
        false
    }

    // ---- cascading removal and restore ---------------------------------

    /// Removes a composite, all its descendants and everything they own,
    /// in one batched delivery wave. Returns the detached graph for undo.
    ///
    /// Removed categories unlink all their members; removed categorizables
    /// unlink from all surviving categories; removed tasks are scrubbed
    /// from surviving prerequisite sets.
    pub fn remove_composite(
        &mut self,
        id: EntityId,
        batch: Option<&mut EventBatch>,
    ) -> Result<RemovedGraph, DomainError> {
        self.transact(batch, |ws, batch| {
            let root_kind = ws.existing_core(id)?.kind();
            let (composite_ids, effort_ids) = ws.collect_removal(id);

            let mut graph = RemovedGraph::new(id);

            // Detach the root from a surviving parent before anything moves.
            if let Some(parent) = ws.core(id).and_then(CompositeCore::parent) {
                let position = ws
                    .core(parent)
                    .map(|core| {
                        core.children()
                            .iter()
                            .position(|candidate| *candidate == id)
                            .unwrap_or(core.children().len())
                    })
                    .unwrap_or(0);
                let parent_core = ws.core_mut(parent).expect("parent resolved above");
                parent_core.children.retain(|candidate| *candidate != id);
                batch.stage(
                    root_kind.children_removed_event(),
                    parent,
                    Payload::Ids(vec![id]),
                );
                graph.parent_link = Some((parent, position));
            }

            // Owner back-links of removed notes/attachments on survivors.
            for composite_id in &composite_ids {
                if let Some(owner) = ws.core(*composite_id).and_then(CompositeCore::owner) {
                    if composite_ids.contains(&owner) {
                        continue;
                    }
                    if let Some(owner_core) = ws.core_mut(owner) {
                        owner_core.notes.retain(|candidate| candidate != composite_id);
                        owner_core
                            .attachments
                            .retain(|candidate| candidate != composite_id);
                    }
                }
            }

            // Removed categories release their members; removed members
            // leave surviving categories. Both directions in this batch.
            for composite_id in &composite_ids {
                let members = ws
                    .categories
                    .get(*composite_id)
                    .map(Category::categorizable_ids)
                    .unwrap_or_default();
                for member in members {
                    if !composite_ids.contains(&member) {
                        ws.unlink_member_side(member, *composite_id, batch);
                    }
                }
            }
            ws.unlink_categories_for_removal(&composite_ids, batch);
            graph.scrubbed_prerequisites = ws.scrub_prerequisites(&composite_ids, batch);

            for effort_id in &effort_ids {
                if let Some(effort) = ws.efforts.remove(*effort_id, batch) {
                    // Removing a tracking effort counts as a stop, same as
                    // remove_effort.
                    if effort.is_tracking() {
                        batch.stage(
                            EFFORT_TRACK_STOP,
                            *effort_id,
                            Payload::Ids(vec![effort.task_id()]),
                        );
                    }
                    graph.efforts.push(effort);
                }
            }
            for composite_id in &composite_ids {
                if let Some(task) = ws.tasks.remove(*composite_id, batch) {
                    graph.tasks.push(task);
                } else if let Some(note) = ws.notes.remove(*composite_id, batch) {
                    graph.notes.push(note);
                } else if let Some(category) = ws.categories.remove(*composite_id, batch) {
                    graph.categories.push(category);
                } else if let Some(attachment) = ws.attachments.remove(*composite_id, batch) {
                    graph.attachments.push(attachment);
                }
            }

            info!(
                "event=composite_removed module=workspace kind={} root={} composites={} efforts={}",
                root_kind.label(),
                id,
                composite_ids.len(),
                effort_ids.len()
            );
            Ok(graph)
        })
    }

    /// Puts a previously removed graph back, re-establishing parent,
    /// owner, category and prerequisite links. Ids must still be free.
    pub fn restore_graph(
        &mut self,
        graph: RemovedGraph,
        batch: Option<&mut EventBatch>,
    ) -> Result<(), DomainError> {
        self.transact(batch, |ws, batch| {
            for id in graph.ids() {
                if ws.kind_of(id).is_some() {
                    return Err(DomainError::DuplicateEntity(id));
                }
            }

            let root = graph.root;
            let root_link = graph.parent_link;

            for task in graph.tasks {
                let id = task.id();
                ws.tasks.insert(task, batch)?;
                ws.relink_claimed_categories(id, batch);
            }
            for note in graph.notes {
                let id = note.id();
                let owner = note.core().owner();
                ws.notes.insert(note, batch)?;
                ws.relink_claimed_categories(id, batch);
                ws.relink_owner(owner, id, true);
            }
            for attachment in graph.attachments {
                let id = attachment.id();
                let owner = attachment.core().owner();
                ws.attachments.insert(attachment, batch)?;
                ws.relink_claimed_categories(id, batch);
                ws.relink_owner(owner, id, false);
            }
            for category in graph.categories {
                let id = category.id();
                let members = category.categorizable_ids();
                ws.categories.insert(category, batch)?;
                for member in members {
                    ws.relink_member_side(member, id, batch);
                }
            }
            for effort in graph.efforts {
                ws.efforts.insert(effort, batch)?;
            }

            if let Some((parent, position)) = root_link {
                let kind = ws
                    .core(parent)
                    .map(CompositeCore::kind)
                    .ok_or(DomainError::UnknownEntity(parent))?;
                let parent_core = ws.core_mut(parent).expect("parent resolved above");
                let position = position.min(parent_core.children.len());
                parent_core.children.insert(position, root);
                batch.stage(kind.children_added_event(), parent, Payload::Ids(vec![root]));
            }

            for (task_id, prerequisite) in graph.scrubbed_prerequisites {
                if let Some(task) = ws.tasks.get_mut(task_id) {
                    task.prerequisites.insert(task_id, prerequisite, batch);
                }
            }
            Ok(())
        })
    }

    fn relink_owner(&mut self, owner: Option<EntityId>, id: EntityId, as_note: bool) {
        let Some(owner) = owner else {
            return;
        };
        let Some(owner_core) = self.core_mut(owner) else {
            warn!(
                "event=owner_missing module=workspace owned={} owner={} status=skipped",
                id, owner
            );
            return;
        };
        let list = if as_note {
            &mut owner_core.notes
        } else {
            &mut owner_core.attachments
        };
        if !list.contains(&id) {
            list.push(id);
        }
    }

    /// All composites of the subtree rooted at `id` (including owned notes
    /// and attachments, recursively) plus the efforts they own.
    fn collect_removal(&self, id: EntityId) -> (Vec<EntityId>, Vec<EntityId>) {
        let mut composites = Vec::new();
        let mut efforts = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if composites.contains(&current) {
                continue;
            }
            composites.push(current);
            if let Some(core) = self.core(current) {
                stack.extend(core.children().iter().copied());
                stack.extend(core.notes().iter().copied());
                stack.extend(core.attachments().iter().copied());
            }
            if let Some(task) = self.tasks.get(current) {
                efforts.extend(task.effort_ids().iter().copied());
            }
        }
        (composites, efforts)
    }
}
