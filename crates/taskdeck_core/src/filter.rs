//! Category filter: a lazy derived view over tasks and notes.
//!
//! # Responsibility
//! - Track which categories the user toggled into the filter and reduce
//!   the task/note population to the matching items.
//! - Stay an observer: bus traffic only marks the view dirty, the actual
//!   recompute happens on demand against the workspace.
//!
//! # Invariants
//! - An empty filtered-category set includes every candidate.
//! - Recompute emits one add and one remove delta event at most, with the
//!   filter's own source id.
//! - After `detach` the filter holds no bus registrations.

use crate::event::{EventBatch, EventBus, EventType, Payload, SubscriptionToken};
use crate::model::composite::Entity;
use crate::model::{EntityId, CATEGORY_FILTER_CHANGED, CATEGORY_MEMBER_ADDED, CATEGORY_MEMBER_REMOVED};
use crate::workspace::Workspace;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;
use uuid::Uuid;

/// Delta events published by a recomputing filter, with the filter's own
/// source id.
pub const FILTER_ITEMS_ADDED: EventType = "filter.items.add";
pub const FILTER_ITEMS_REMOVED: EventType = "filter.items.remove";

/// How multiple filtered categories combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Include an item matching at least one filtered category.
    Any,
    /// Include an item only when every filtered category matches.
    All,
}

#[derive(Default)]
struct DirtyFlag {
    dirty: bool,
}

/// Observable category filter over the task and note populations.
pub struct CategoryFilter {
    source: EntityId,
    mode: FilterMode,
    tree_mode: bool,
    flag: Rc<RefCell<DirtyFlag>>,
    tokens: Vec<SubscriptionToken>,
    current: Vec<EntityId>,
}

impl CategoryFilter {
    /// Builds the filter and installs its bus subscriptions: collection
    /// add/remove for tasks, notes and categories, member changes and
    /// filter-flag changes on any category.
    pub fn new(workspace: &Workspace, mode: FilterMode, tree_mode: bool) -> CategoryFilter {
        let flag = Rc::new(RefCell::new(DirtyFlag { dirty: true }));
        let bus = workspace.bus();
        let mut tokens = Vec::new();

        let subscriptions: [(EventType, Option<EntityId>); 8] = [
            ("tasks.add", Some(workspace.tasks().source_id())),
            ("tasks.remove", Some(workspace.tasks().source_id())),
            ("notes.add", Some(workspace.notes().source_id())),
            ("notes.remove", Some(workspace.notes().source_id())),
            ("categories.add", Some(workspace.categories().source_id())),
            ("categories.remove", Some(workspace.categories().source_id())),
            (CATEGORY_MEMBER_ADDED, None),
            (CATEGORY_MEMBER_REMOVED, None),
        ];
        for (event_type, source) in subscriptions {
            let flag = Rc::clone(&flag);
            tokens.push(bus.subscribe(event_type, source, move |_, _| {
                flag.borrow_mut().dirty = true;
            }));
        }
        let filter_flag = Rc::clone(&flag);
        tokens.push(bus.subscribe(CATEGORY_FILTER_CHANGED, None, move |_, _| {
            filter_flag.borrow_mut().dirty = true;
        }));

        CategoryFilter {
            source: Uuid::new_v4(),
            mode,
            tree_mode,
            flag,
            tokens,
            current: Vec::new(),
        }
    }

    /// Event source id of this filter's delta events.
    pub fn source_id(&self) -> EntityId {
        self.source
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: FilterMode) {
        if self.mode != mode {
            self.mode = mode;
            self.flag.borrow_mut().dirty = true;
        }
    }

    pub fn tree_mode(&self) -> bool {
        self.tree_mode
    }

    pub fn set_tree_mode(&mut self, tree_mode: bool) {
        if self.tree_mode != tree_mode {
            self.tree_mode = tree_mode;
            self.flag.borrow_mut().dirty = true;
        }
    }

    /// The included ids, recomputed if anything marked the view dirty.
    /// Emits delta events describing what entered and left the view.
    pub fn items(&mut self, workspace: &Workspace) -> Vec<EntityId> {
        if self.flag.borrow().dirty {
            self.recompute(workspace);
        }
        self.current.clone()
    }

    /// Removes every bus registration. The filter stays usable as a plain
    /// (now permanently stale-free) snapshot.
    pub fn detach(&mut self, bus: &EventBus) {
        for token in self.tokens.drain(..) {
            bus.unsubscribe(token);
        }
    }

    fn recompute(&mut self, workspace: &Workspace) {
        let filtered: Vec<EntityId> = workspace
            .categories()
            .iter()
            .filter(|category| category.is_filtered())
            .map(|category| category.id())
            .collect();

        let candidates: Vec<EntityId> = workspace
            .tasks()
            .ids()
            .iter()
            .chain(workspace.notes().ids().iter())
            .copied()
            .collect();

        let next: Vec<EntityId> = candidates
            .into_iter()
            .filter(|item| self.matches(workspace, &filtered, *item))
            .collect();

        let previous: BTreeSet<EntityId> = self.current.iter().copied().collect();
        let current: BTreeSet<EntityId> = next.iter().copied().collect();
        let added: Vec<EntityId> = current.difference(&previous).copied().collect();
        let removed: Vec<EntityId> = previous.difference(&current).copied().collect();

        self.current = next;
        self.flag.borrow_mut().dirty = false;

        let mut batch = EventBatch::new();
        if !added.is_empty() {
            batch.stage(FILTER_ITEMS_ADDED, self.source, Payload::Ids(added));
        }
        if !removed.is_empty() {
            batch.stage(FILTER_ITEMS_REMOVED, self.source, Payload::Ids(removed));
        }
        batch.send(workspace.bus());
    }

    fn matches(&self, workspace: &Workspace, filtered: &[EntityId], item: EntityId) -> bool {
        if filtered.is_empty() {
            return true;
        }
        match self.mode {
            FilterMode::All => filtered
                .iter()
                .all(|category| workspace.category_contains(*category, item, self.tree_mode)),
            FilterMode::Any => filtered
                .iter()
                .any(|category| workspace.category_contains(*category, item, self.tree_mode)),
        }
    }
}
