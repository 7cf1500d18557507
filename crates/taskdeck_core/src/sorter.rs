//! Sorters: lazy ordered views over one entity kind.
//!
//! # Responsibility
//! - Keep an ordered id view of one collection, sorted by a chain of
//!   typed sort keys.
//! - Observe only the events that can affect the order, mark the view
//!   dirty and recompute on demand.
//!
//! # Invariants
//! - Equal keys preserve collection insertion order (the sort is stable).
//! - String keys compare case-insensitively.
//! - Effort views fall back to start-descending, then the owning task's
//!   recursive subject.

use crate::event::{Event, EventBus, EventType, Payload, SubscriptionToken};
use crate::model::{EntityId, EntityKind};
use crate::time::{Date, TimeDelta};
use crate::workspace::Workspace;
use chrono::NaiveDateTime;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;
use uuid::Uuid;

/// Published with the sorter's own source id whenever a recompute yields a
/// different order. Payload is the full new order.
pub const SORTER_ORDER_CHANGED: EventType = "sorter.orderChanged";

/// What to sort by. Not every key applies to every kind; inapplicable keys
/// compare equal and fall through to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Subject,
    Description,
    PlannedStartDate,
    DueDate,
    CompletionDate,
    Priority,
    Budget,
    PercentageComplete,
    /// Effort start stamp, compared descending.
    EffortStart,
    /// Category member subjects, recursively collected and sorted.
    MemberSubjects,
}

/// One step of the sort chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub key: SortKey,
    /// Aggregate the key over the entity's subtree: subjects become the
    /// root-first path, dates take the subtree minimum, priority the
    /// maximum, budget the sum.
    pub recursive: bool,
}

impl SortSpec {
    pub fn new(key: SortKey) -> SortSpec {
        SortSpec {
            key,
            recursive: false,
        }
    }

    pub fn recursive(key: SortKey) -> SortSpec {
        SortSpec {
            key,
            recursive: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum KeyValue {
    Text(String),
    Int(i64),
    Date(Date),
    Delta(TimeDelta),
    /// Reversed start stamp so the derived ordering is newest-first.
    ReverseStamp(std::cmp::Reverse<NaiveDateTime>),
    None,
}

#[derive(Default)]
struct DirtyFlag {
    dirty: bool,
}

/// Ordered view over one entity kind.
pub struct Sorter {
    source: EntityId,
    kind: EntityKind,
    specs: Vec<SortSpec>,
    flag: Rc<RefCell<DirtyFlag>>,
    tokens: Vec<SubscriptionToken>,
    current: Vec<EntityId>,
}

impl Sorter {
    /// Builds the sorter and subscribes to the collection's add/remove
    /// events plus every attribute event the sort chain depends on.
    pub fn new(workspace: &Workspace, kind: EntityKind, specs: Vec<SortSpec>) -> Sorter {
        let flag = Rc::new(RefCell::new(DirtyFlag { dirty: true }));
        let bus = workspace.bus();
        let mut tokens = Vec::new();

        let collection_source = match kind {
            EntityKind::Task => workspace.tasks().source_id(),
            EntityKind::Note => workspace.notes().source_id(),
            EntityKind::Category => workspace.categories().source_id(),
            EntityKind::Attachment => workspace.attachments().source_id(),
            EntityKind::Effort => workspace.efforts().source_id(),
        };
        let mark = |flag: &Rc<RefCell<DirtyFlag>>| {
            let flag = Rc::clone(flag);
            move |_: &EventBus, _: &Event| flag.borrow_mut().dirty = true
        };
        tokens.push(bus.subscribe(kind.collection_added_event(), Some(collection_source), mark(&flag)));
        tokens.push(bus.subscribe(
            kind.collection_removed_event(),
            Some(collection_source),
            mark(&flag),
        ));
        for event_type in Self::key_events(kind, &specs) {
            tokens.push(bus.subscribe(event_type, None, mark(&flag)));
        }

        Sorter {
            source: Uuid::new_v4(),
            kind,
            specs,
            flag,
            tokens,
            current: Vec::new(),
        }
    }

    /// Event source id of the order-changed events.
    pub fn source_id(&self) -> EntityId {
        self.source
    }

    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// The sorted ids, recomputed if anything marked the view dirty. An
    /// actual order change publishes one order-changed event.
    pub fn ordered(&mut self, workspace: &Workspace) -> Vec<EntityId> {
        if self.flag.borrow().dirty {
            self.recompute(workspace);
        }
        self.current.clone()
    }

    /// Removes every bus registration.
    pub fn detach(&mut self, bus: &EventBus) {
        for token in self.tokens.drain(..) {
            bus.unsubscribe(token);
        }
    }

    fn recompute(&mut self, workspace: &Workspace) {
        let mut ids: Vec<EntityId> = match self.kind {
            EntityKind::Task => workspace.tasks().ids().to_vec(),
            EntityKind::Note => workspace.notes().ids().to_vec(),
            EntityKind::Category => workspace.categories().ids().to_vec(),
            EntityKind::Attachment => workspace.attachments().ids().to_vec(),
            EntityKind::Effort => workspace.efforts().ids().to_vec(),
        };

        let specs = self.effective_specs();
        ids.sort_by(|left, right| {
            for spec in &specs {
                let ordering = self
                    .key_value(workspace, *left, *spec)
                    .cmp(&self.key_value(workspace, *right, *spec));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });

        self.flag.borrow_mut().dirty = false;
        if ids != self.current {
            self.current = ids;
            let event = Event::new(
                SORTER_ORDER_CHANGED,
                self.source,
                Payload::Ids(self.current.clone()),
            );
            workspace.bus().publish(&event);
        }
    }

    /// Effort views always end on start-descending then owning-task
    /// subject, even with an empty chain.
    fn effective_specs(&self) -> Vec<SortSpec> {
        let mut specs = self.specs.clone();
        if self.kind == EntityKind::Effort {
            if !specs.iter().any(|spec| spec.key == SortKey::EffortStart) {
                specs.push(SortSpec::new(SortKey::EffortStart));
            }
            specs.push(SortSpec::recursive(SortKey::Subject));
        }
        specs
    }

    fn key_value(&self, workspace: &Workspace, id: EntityId, spec: SortSpec) -> KeyValue {
        if self.kind == EntityKind::Effort {
            let Some(effort) = workspace.efforts().get(id) else {
                return KeyValue::None;
            };
            return match spec.key {
                SortKey::EffortStart => {
                    KeyValue::ReverseStamp(std::cmp::Reverse(effort.start()))
                }
                // Everything else reads through the owning task.
                _ => self.composite_key(workspace, effort.task_id(), spec),
            };
        }
        self.composite_key(workspace, id, spec)
    }

    fn composite_key(&self, workspace: &Workspace, id: EntityId, spec: SortSpec) -> KeyValue {
        match spec.key {
            SortKey::Subject => KeyValue::Text(self.subject_key(workspace, id, spec.recursive)),
            SortKey::Description => workspace
                .core(id)
                .map(|core| KeyValue::Text(core.description().to_lowercase()))
                .unwrap_or(KeyValue::None),
            SortKey::PlannedStartDate => {
                self.date_key(workspace, id, spec.recursive, |task| task.planned_start_date())
            }
            SortKey::DueDate => self.date_key(workspace, id, spec.recursive, |task| task.due_date()),
            SortKey::CompletionDate => {
                self.date_key(workspace, id, spec.recursive, |task| task.completion_date())
            }
            SortKey::Priority => {
                let subtree = self.subtree(workspace, id, spec.recursive);
                subtree
                    .iter()
                    .filter_map(|id| workspace.tasks().get(*id))
                    .map(|task| task.priority() as i64)
                    .max()
                    .map(KeyValue::Int)
                    .unwrap_or(KeyValue::None)
            }
            SortKey::Budget => {
                let subtree = self.subtree(workspace, id, spec.recursive);
                let total = subtree
                    .iter()
                    .filter_map(|id| workspace.tasks().get(*id))
                    .fold(TimeDelta::ZERO, |total, task| total + task.budget());
                KeyValue::Delta(total)
            }
            SortKey::PercentageComplete => workspace
                .tasks()
                .get(id)
                .map(|task| KeyValue::Int(task.percentage_complete() as i64))
                .unwrap_or(KeyValue::None),
            SortKey::EffortStart => KeyValue::None,
            SortKey::MemberSubjects => {
                let mut subjects: Vec<String> = workspace
                    .category_member_ids(id, true)
                    .into_iter()
                    .filter_map(|member| workspace.core(member))
                    .map(|core| core.subject().to_lowercase())
                    .collect();
                subjects.sort();
                KeyValue::Text(subjects.join("|"))
            }
        }
    }

    /// Root-first subject path for recursive mode, plain subject otherwise.
    fn subject_key(&self, workspace: &Workspace, id: EntityId, recursive: bool) -> String {
        if !recursive {
            return workspace
                .core(id)
                .map(|core| core.subject().to_lowercase())
                .unwrap_or_default();
        }
        let mut parts: Vec<String> = workspace
            .ancestors(id)
            .into_iter()
            .chain(std::iter::once(id))
            .filter_map(|id| workspace.core(id))
            .map(|core| core.subject().to_lowercase())
            .collect();
        if parts.is_empty() {
            parts.push(String::new());
        }
        parts.join(" -> ")
    }

    fn date_key(
        &self,
        workspace: &Workspace,
        id: EntityId,
        recursive: bool,
        pick: fn(&crate::model::task::Task) -> Date,
    ) -> KeyValue {
        let subtree = self.subtree(workspace, id, recursive);
        subtree
            .iter()
            .filter_map(|id| workspace.tasks().get(*id))
            .map(pick)
            .min()
            .map(KeyValue::Date)
            .unwrap_or(KeyValue::None)
    }

    fn subtree(&self, workspace: &Workspace, id: EntityId, recursive: bool) -> Vec<EntityId> {
        if recursive {
            let mut ids = vec![id];
            ids.extend(workspace.descendants(id));
            ids
        } else {
            vec![id]
        }
    }

    /// The attribute events that can change the computed keys.
    fn key_events(kind: EntityKind, specs: &[SortSpec]) -> Vec<EventType> {
        let mut events: Vec<EventType> = Vec::new();
        let mut push = |event: EventType| {
            if !events.contains(&event) {
                events.push(event);
            }
        };
        let recursive = specs.iter().any(|spec| spec.recursive) || kind == EntityKind::Effort;
        if recursive {
            push(kind.children_added_event());
            push(kind.children_removed_event());
        }
        for spec in specs {
            match spec.key {
                SortKey::Subject => push(kind.subject_event()),
                SortKey::Description => push(kind.description_event()),
                SortKey::PlannedStartDate => push("task.plannedStartDateTime"),
                SortKey::DueDate => push("task.dueDateTime"),
                SortKey::CompletionDate => push("task.completionDateTime"),
                SortKey::Priority => push("task.priority"),
                SortKey::Budget => push("task.budget"),
                SortKey::PercentageComplete => push("task.percentageComplete"),
                SortKey::EffortStart => push("effort.start"),
                SortKey::MemberSubjects => {
                    push(crate::model::CATEGORY_MEMBER_ADDED);
                    push(crate::model::CATEGORY_MEMBER_REMOVED);
                    push("task.subject");
                    push("note.subject");
                }
            }
        }
        if kind == EntityKind::Effort {
            push("effort.start");
            push("effort.task");
            push("task.subject");
        }
        events
    }
}
