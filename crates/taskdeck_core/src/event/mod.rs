//! Publish/subscribe substrate for domain change propagation.
//!
//! # Responsibility
//! - Route typed events to observers keyed by (event type, source).
//! - Batch staged events into one atomic delivery wave.
//!
//! # Invariants
//! - Delivery is synchronous and runs in registration order.
//! - One `send` never delivers the same merged event twice.
//! - A failing observer never blocks delivery to the remaining observers.

pub mod batch;
pub mod bus;

pub use batch::EventBatch;
pub use bus::{Event, EventBus, EventType, Handler, Payload, SubscriptionToken};
