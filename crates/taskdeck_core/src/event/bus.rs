//! Typed event registry with per-source subscriptions.
//!
//! # Responsibility
//! - Keep a registry of handlers per event type, split into per-source and
//!   any-source buckets.
//! - Dispatch events synchronously in registration order.
//!
//! # Invariants
//! - Subscription tokens are unique for the bus lifetime; `unsubscribe` by
//!   token touches exactly one registration.
//! - Registry changes made by a running handler only affect subsequent
//!   events, never the delivery in flight.
//! - A handler that cannot run (it is already being invoked further up the
//!   stack) is logged and skipped; the remaining handlers still run.

use crate::appearance::{FontSpec, Rgba};
use crate::model::{EntityId, Recurrence};
use crate::time::{Date, TimeDelta};
use chrono::NaiveDateTime;
use log::error;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Event types are stable strings, part of the embedder contract.
pub type EventType = &'static str;

/// Handler invoked for every matching event. Handlers receive the bus so
/// they may subscribe, unsubscribe or publish during dispatch.
pub type Handler = Rc<RefCell<dyn FnMut(&EventBus, &Event)>>;

/// Value carried by a change event.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Empty,
    Text(String),
    Int(i64),
    Flag(bool),
    Ids(Vec<EntityId>),
    Date(Date),
    Stamp(Option<NaiveDateTime>),
    Delta(TimeDelta),
    Color(Option<Rgba>),
    Font(Option<FontSpec>),
    Recurrence(Option<Recurrence>),
}

impl From<String> for Payload {
    fn from(value: String) -> Payload {
        Payload::Text(value)
    }
}

impl From<i64> for Payload {
    fn from(value: i64) -> Payload {
        Payload::Int(value)
    }
}

impl From<i32> for Payload {
    fn from(value: i32) -> Payload {
        Payload::Int(value as i64)
    }
}

impl From<u8> for Payload {
    fn from(value: u8) -> Payload {
        Payload::Int(value as i64)
    }
}

impl From<bool> for Payload {
    fn from(value: bool) -> Payload {
        Payload::Flag(value)
    }
}

impl From<Vec<EntityId>> for Payload {
    fn from(value: Vec<EntityId>) -> Payload {
        Payload::Ids(value)
    }
}

impl From<EntityId> for Payload {
    fn from(value: EntityId) -> Payload {
        Payload::Ids(vec![value])
    }
}

impl From<Date> for Payload {
    fn from(value: Date) -> Payload {
        Payload::Date(value)
    }
}

impl From<Option<NaiveDateTime>> for Payload {
    fn from(value: Option<NaiveDateTime>) -> Payload {
        Payload::Stamp(value)
    }
}

impl From<NaiveDateTime> for Payload {
    fn from(value: NaiveDateTime) -> Payload {
        Payload::Stamp(Some(value))
    }
}

impl From<TimeDelta> for Payload {
    fn from(value: TimeDelta) -> Payload {
        Payload::Delta(value)
    }
}

impl From<Option<Rgba>> for Payload {
    fn from(value: Option<Rgba>) -> Payload {
        Payload::Color(value)
    }
}

impl From<Option<FontSpec>> for Payload {
    fn from(value: Option<FontSpec>) -> Payload {
        Payload::Font(value)
    }
}

impl From<Option<Recurrence>> for Payload {
    fn from(value: Option<Recurrence>) -> Payload {
        Payload::Recurrence(value)
    }
}

impl Payload {
    /// The ids carried by this payload, empty for non-id payloads.
    pub fn ids(&self) -> &[EntityId] {
        match self {
            Payload::Ids(ids) => ids,
            _ => &[],
        }
    }
}

/// One delivered change notification.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub event_type: EventType,
    pub source: EntityId,
    pub payload: Payload,
}

impl Event {
    pub fn new(event_type: EventType, source: EntityId, payload: Payload) -> Event {
        Event {
            event_type,
            source,
            payload,
        }
    }
}

/// Opaque handle returned by `subscribe`, used to deregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionToken(u64);

struct Registration {
    token: SubscriptionToken,
    handler: Handler,
}

#[derive(Default)]
struct TypeEntry {
    any_source: Vec<Registration>,
    by_source: HashMap<EntityId, Vec<Registration>>,
}

#[derive(Default)]
struct BusInner {
    entries: HashMap<EventType, TypeEntry>,
    token_index: HashMap<u64, (EventType, Option<EntityId>)>,
    next_token: u64,
}

/// Single-threaded publish/subscribe bus.
///
/// Interior mutability keeps `publish` at `&self`, so mutating APIs can hold
/// `&mut` domain state and still send their staged batch afterwards.
#[derive(Default)]
pub struct EventBus {
    inner: RefCell<BusInner>,
}

impl EventBus {
    pub fn new() -> EventBus {
        EventBus::default()
    }

    /// Registers a handler for `event_type`, optionally narrowed to one
    /// source entity.
    pub fn subscribe<F>(
        &self,
        event_type: EventType,
        source: Option<EntityId>,
        handler: F,
    ) -> SubscriptionToken
    where
        F: FnMut(&EventBus, &Event) + 'static,
    {
        self.subscribe_shared(event_type, source, Rc::new(RefCell::new(handler)))
    }

    /// Registers an already shared handler. Observers that install the same
    /// handler under many (type, source) pairs use this to avoid one
    /// allocation per registration.
    pub fn subscribe_shared(
        &self,
        event_type: EventType,
        source: Option<EntityId>,
        handler: Handler,
    ) -> SubscriptionToken {
        let mut inner = self.inner.borrow_mut();
        inner.next_token += 1;
        let token = SubscriptionToken(inner.next_token);
        inner.token_index.insert(token.0, (event_type, source));
        let entry = inner.entries.entry(event_type).or_default();
        let registration = Registration { token, handler };
        match source {
            Some(source) => entry.by_source.entry(source).or_default().push(registration),
            None => entry.any_source.push(registration),
        }
        token
    }

    /// Removes the registration behind `token`. Unknown tokens are ignored.
    pub fn unsubscribe(&self, token: SubscriptionToken) {
        let mut inner = self.inner.borrow_mut();
        let Some((event_type, source)) = inner.token_index.remove(&token.0) else {
            return;
        };
        let Some(entry) = inner.entries.get_mut(event_type) else {
            return;
        };
        match source {
            Some(source) => {
                if let Some(bucket) = entry.by_source.get_mut(&source) {
                    bucket.retain(|registration| registration.token != token);
                    if bucket.is_empty() {
                        entry.by_source.remove(&source);
                    }
                }
            }
            None => entry.any_source.retain(|registration| registration.token != token),
        }
    }

    /// Delivers `event` to every matching handler before returning.
    ///
    /// Handlers run in registration order, any-source and per-source
    /// registrations interleaved by subscription age. The registry borrow is
    /// released before the first handler runs, so handlers may publish,
    /// subscribe and unsubscribe freely.
    pub fn publish(&self, event: &Event) {
        let matching = self.matching_handlers(event);
        for registration in matching {
            match registration.handler.try_borrow_mut() {
                Ok(mut handler) => (&mut *handler)(self, event),
                Err(_) => {
                    // Re-entrant delivery into the same handler; skip it so
                    // the rest of the wave still converges.
                    error!(
                        "event=handler_skipped module=event type={} source={} status=reentrant",
                        event.event_type, event.source
                    );
                }
            }
        }
    }

    /// Number of live registrations for an event type, mainly for tests
    /// and diagnostics.
    pub fn subscription_count(&self, event_type: EventType) -> usize {
        let inner = self.inner.borrow();
        inner
            .entries
            .get(event_type)
            .map(|entry| {
                entry.any_source.len()
                    + entry
                        .by_source
                        .values()
                        .map(|bucket| bucket.len())
                        .sum::<usize>()
            })
            .unwrap_or(0)
    }

    fn matching_handlers(&self, event: &Event) -> Vec<Registration> {
        let inner = self.inner.borrow();
        let Some(entry) = inner.entries.get(event.event_type) else {
            return Vec::new();
        };
        let mut matching: Vec<Registration> = entry
            .any_source
            .iter()
            .chain(entry.by_source.get(&event.source).into_iter().flatten())
            .map(|registration| Registration {
                token: registration.token,
                handler: Rc::clone(&registration.handler),
            })
            .collect();
        // Tokens are monotonic, so sorting restores registration order.
        matching.sort_by_key(|registration| registration.token.0);
        matching
    }
}
