//! Effort record: one span of time spent on a task.
//!
//! # Responsibility
//! - Track start/stop stamps and the owning task reference.
//! - Report the current duration; a tracking effort is measured against a
//!   caller-supplied clock.
//!
//! # Invariants
//! - `stop` is `None` while tracking, otherwise `start <= stop`.
//! - Appearance and categories delegate to the owning task; an effort has
//!   none of its own.

use crate::attribute::ValueCell;
use crate::event::EventBatch;
use crate::model::composite::Entity;
use crate::model::{EntityId, EntityKind};
use crate::time::TimeDelta;
use chrono::NaiveDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct Effort {
    id: EntityId,
    task: ValueCell<EntityId>,
    start: ValueCell<NaiveDateTime>,
    stop: ValueCell<Option<NaiveDateTime>>,
}

impl Effort {
    /// A new effort that is still tracking.
    pub fn tracking(task_id: EntityId, start: NaiveDateTime) -> Effort {
        Self::with_id(Uuid::new_v4(), task_id, start, None)
    }

    pub fn with_id(
        id: EntityId,
        task_id: EntityId,
        start: NaiveDateTime,
        stop: Option<NaiveDateTime>,
    ) -> Effort {
        Effort {
            id,
            task: ValueCell::new("effort.task", task_id),
            start: ValueCell::new("effort.start", start),
            stop: ValueCell::new("effort.stop", stop),
        }
    }

    pub fn task_id(&self) -> EntityId {
        *self.task.get()
    }

    pub fn start(&self) -> NaiveDateTime {
        *self.start.get()
    }

    pub fn stop(&self) -> Option<NaiveDateTime> {
        *self.stop.get()
    }

    pub fn is_tracking(&self) -> bool {
        self.stop().is_none()
    }

    pub(crate) fn set_task_id(&mut self, task_id: EntityId, batch: &mut EventBatch) -> bool {
        let id = self.id;
        self.task.set(id, task_id, batch)
    }

    pub(crate) fn set_start(&mut self, start: NaiveDateTime, batch: &mut EventBatch) -> bool {
        let id = self.id;
        self.start.set(id, start, batch)
    }

    pub(crate) fn set_stop(&mut self, stop: Option<NaiveDateTime>, batch: &mut EventBatch) -> bool {
        let id = self.id;
        self.stop.set(id, stop, batch)
    }

    /// Duration up to `now` for tracking efforts, or the recorded span.
    pub fn duration(&self, now: NaiveDateTime) -> TimeDelta {
        let end = self.stop().unwrap_or(now);
        TimeDelta::from_chrono(end.signed_duration_since(self.start()))
    }
}

impl Entity for Effort {
    fn id(&self) -> EntityId {
        self.id
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Effort
    }
}
