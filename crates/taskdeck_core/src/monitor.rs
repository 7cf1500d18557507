//! Change monitor: added/removed/modified id bookkeeping for sync.
//!
//! # Responsibility
//! - Watch collection add/remove traffic for a set of entity kinds.
//! - Follow every modification event of the watched items.
//! - Keep the three id sets disjoint under all event interleavings.
//!
//! # Invariants
//! - An id never appears in more than one of `added`/`removed`/`modified`.
//! - An item added and removed between two resets leaves no trace.
//! - `reset` leaves all sets empty with modification subscriptions
//!   installed on the current membership.

use crate::event::{Event, EventBus, Handler, SubscriptionToken};
use crate::model::{EntityId, EntityKind};
use crate::workspace::Workspace;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

#[derive(Default)]
struct MonitorState {
    added: BTreeSet<EntityId>,
    removed: BTreeSet<EntityId>,
    modified: BTreeSet<EntityId>,
    item_tokens: HashMap<EntityId, Vec<SubscriptionToken>>,
}

/// Observes a workspace and accumulates which ids were added, removed or
/// modified since the last `reset`.
pub struct ChangeMonitor {
    kinds: Vec<EntityKind>,
    state: Rc<RefCell<MonitorState>>,
    modification_handler: Handler,
    collection_tokens: Vec<SubscriptionToken>,
}

impl ChangeMonitor {
    /// Starts watching the given kinds. Items already present count as
    /// committed: they are followed for modifications but not `added`.
    pub fn new(workspace: &Workspace, kinds: &[EntityKind]) -> ChangeMonitor {
        let state = Rc::new(RefCell::new(MonitorState::default()));
        let bus = workspace.bus();

        let handler_state = Rc::clone(&state);
        let modification_handler: Handler = Rc::new(RefCell::new(
            move |_: &EventBus, event: &Event| {
                let mut state = handler_state.borrow_mut();
                let id = event.source;
                if !state.added.contains(&id) {
                    state.modified.insert(id);
                }
            },
        ));

        let mut collection_tokens = Vec::new();
        for kind in kinds {
            let kind = *kind;
            let source = collection_source(workspace, kind);

            let add_state = Rc::clone(&state);
            let add_handler = Rc::clone(&modification_handler);
            collection_tokens.push(bus.subscribe(
                kind.collection_added_event(),
                Some(source),
                move |bus, event| {
                    for id in event.payload.ids().to_vec() {
                        let tokens = follow(bus, kind, id, &add_handler);
                        let mut state = add_state.borrow_mut();
                        state.added.insert(id);
                        state.removed.remove(&id);
                        state.modified.remove(&id);
                        state.item_tokens.insert(id, tokens);
                    }
                },
            ));

            let remove_state = Rc::clone(&state);
            collection_tokens.push(bus.subscribe(
                kind.collection_removed_event(),
                Some(source),
                move |bus, event| {
                    for id in event.payload.ids().to_vec() {
                        let tokens = {
                            let mut state = remove_state.borrow_mut();
                            let freshly_added = state.added.remove(&id);
                            state.modified.remove(&id);
                            if !freshly_added {
                                state.removed.insert(id);
                            }
                            state.item_tokens.remove(&id).unwrap_or_default()
                        };
                        for token in tokens {
                            bus.unsubscribe(token);
                        }
                    }
                },
            ));
        }

        let monitor = ChangeMonitor {
            kinds: kinds.to_vec(),
            state,
            modification_handler,
            collection_tokens,
        };
        monitor.follow_current(workspace);
        monitor
    }

    pub fn added(&self) -> BTreeSet<EntityId> {
        self.state.borrow().added.clone()
    }

    pub fn removed(&self) -> BTreeSet<EntityId> {
        self.state.borrow().removed.clone()
    }

    pub fn modified(&self) -> BTreeSet<EntityId> {
        self.state.borrow().modified.clone()
    }

    pub fn is_clean(&self) -> bool {
        let state = self.state.borrow();
        state.added.is_empty() && state.removed.is_empty() && state.modified.is_empty()
    }

    /// Empties all three sets and re-installs modification subscriptions on
    /// the current membership. Called after a successful sync or save.
    pub fn reset(&self, workspace: &Workspace) {
        let tokens: Vec<SubscriptionToken> = {
            let mut state = self.state.borrow_mut();
            state.added.clear();
            state.removed.clear();
            state.modified.clear();
            state
                .item_tokens
                .drain()
                .flat_map(|(_, tokens)| tokens)
                .collect()
        };
        let bus = workspace.bus();
        for token in tokens {
            bus.unsubscribe(token);
        }
        self.follow_current(workspace);
    }

    /// Removes every bus registration; the monitor stops observing.
    pub fn detach(&self, bus: &EventBus) {
        for token in &self.collection_tokens {
            bus.unsubscribe(*token);
        }
        let tokens: Vec<SubscriptionToken> = {
            let mut state = self.state.borrow_mut();
            state
                .item_tokens
                .drain()
                .flat_map(|(_, tokens)| tokens)
                .collect()
        };
        for token in tokens {
            bus.unsubscribe(token);
        }
    }

    fn follow_current(&self, workspace: &Workspace) {
        let bus = workspace.bus();
        for kind in &self.kinds {
            let ids: Vec<EntityId> = match kind {
                EntityKind::Task => workspace.tasks().ids().to_vec(),
                EntityKind::Note => workspace.notes().ids().to_vec(),
                EntityKind::Category => workspace.categories().ids().to_vec(),
                EntityKind::Attachment => workspace.attachments().ids().to_vec(),
                EntityKind::Effort => workspace.efforts().ids().to_vec(),
            };
            for id in ids {
                let tokens = follow(bus, *kind, id, &self.modification_handler);
                self.state.borrow_mut().item_tokens.insert(id, tokens);
            }
        }
    }
}

/// Subscribes the shared modification handler to every modification event
/// type of one item.
fn follow(
    bus: &EventBus,
    kind: EntityKind,
    id: EntityId,
    handler: &Handler,
) -> Vec<SubscriptionToken> {
    kind.modification_event_types()
        .iter()
        .map(|event_type| bus.subscribe_shared(event_type, Some(id), Rc::clone(handler)))
        .collect()
}

fn collection_source(workspace: &Workspace, kind: EntityKind) -> EntityId {
    match kind {
        EntityKind::Task => workspace.tasks().source_id(),
        EntityKind::Note => workspace.notes().source_id(),
        EntityKind::Category => workspace.categories().source_id(),
        EntityKind::Attachment => workspace.attachments().source_id(),
        EntityKind::Effort => workspace.efforts().source_id(),
    }
}
