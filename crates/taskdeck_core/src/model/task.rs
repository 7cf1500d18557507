//! Task record.
//!
//! # Responsibility
//! - Carry the task-specific attributes (dates, progress, fees, priority,
//!   recurrence, reminder, prerequisites, categories, effort links).
//! - Stage the matching `task.*` events on every attribute change.
//!
//! # Invariants
//! - A task is completed iff its completion date is finite.
//! - `percentage_complete` stays within `0..=100`; out-of-range input is
//!   clamped, never rejected.
//! - Cross-task rules (prerequisite activity, tracking exclusivity) live in
//!   the workspace, which sees all tasks at once.

use crate::attribute::{SetCell, ValueCell};
use crate::event::EventBatch;
use crate::model::composite::{Composite, CompositeCore, Entity};
use crate::model::{EntityId, EntityKind, Recurrence};
use crate::time::{Date, TimeDelta};
use chrono::NaiveDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    core: CompositeCore,
    planned_start_date: ValueCell<Date>,
    due_date: ValueCell<Date>,
    actual_start_date: ValueCell<Date>,
    completion_date: ValueCell<Date>,
    percentage_complete: ValueCell<u8>,
    budget: ValueCell<TimeDelta>,
    hourly_fee_cents: ValueCell<i64>,
    fixed_fee_cents: ValueCell<i64>,
    priority: ValueCell<i32>,
    recurrence: ValueCell<Option<Recurrence>>,
    reminder: ValueCell<Option<NaiveDateTime>>,
    pub(crate) prerequisites: SetCell,
    pub(crate) categories: SetCell,
    /// Owned efforts, oldest first.
    pub(crate) efforts: Vec<EntityId>,
}

impl Task {
    pub fn new(subject: impl Into<String>) -> Task {
        Self::with_id(Uuid::new_v4(), subject)
    }

    pub fn with_id(id: EntityId, subject: impl Into<String>) -> Task {
        Task {
            core: CompositeCore::with_id(id, EntityKind::Task, subject),
            planned_start_date: ValueCell::new("task.plannedStartDateTime", Date::Infinite),
            due_date: ValueCell::new("task.dueDateTime", Date::Infinite),
            actual_start_date: ValueCell::new("task.actualStartDateTime", Date::Infinite),
            completion_date: ValueCell::new("task.completionDateTime", Date::Infinite),
            percentage_complete: ValueCell::new("task.percentageComplete", 0),
            budget: ValueCell::new("task.budget", TimeDelta::ZERO),
            hourly_fee_cents: ValueCell::new("task.hourlyFee", 0),
            fixed_fee_cents: ValueCell::new("task.fixedFee", 0),
            priority: ValueCell::new("task.priority", 0),
            recurrence: ValueCell::new("task.recurrence", None),
            reminder: ValueCell::new("task.reminder", None),
            prerequisites: SetCell::new(None, None, Some("task.prerequisites")),
            categories: SetCell::new(None, None, Some("task.categories")),
            efforts: Vec::new(),
        }
    }

    pub fn planned_start_date(&self) -> Date {
        *self.planned_start_date.get()
    }

    pub fn due_date(&self) -> Date {
        *self.due_date.get()
    }

    pub fn actual_start_date(&self) -> Date {
        *self.actual_start_date.get()
    }

    pub fn completion_date(&self) -> Date {
        *self.completion_date.get()
    }

    pub fn is_completed(&self) -> bool {
        self.completion_date().is_finite()
    }

    pub fn percentage_complete(&self) -> u8 {
        *self.percentage_complete.get()
    }

    pub fn budget(&self) -> TimeDelta {
        *self.budget.get()
    }

    pub fn hourly_fee_cents(&self) -> i64 {
        *self.hourly_fee_cents.get()
    }

    pub fn fixed_fee_cents(&self) -> i64 {
        *self.fixed_fee_cents.get()
    }

    pub fn priority(&self) -> i32 {
        *self.priority.get()
    }

    pub fn recurrence(&self) -> Option<Recurrence> {
        *self.recurrence.get()
    }

    pub fn reminder(&self) -> Option<NaiveDateTime> {
        *self.reminder.get()
    }

    pub fn prerequisite_ids(&self) -> Vec<EntityId> {
        self.prerequisites.ids().collect()
    }

    pub fn category_ids(&self) -> Vec<EntityId> {
        self.categories.ids().collect()
    }

    pub fn effort_ids(&self) -> &[EntityId] {
        &self.efforts
    }

    pub fn set_planned_start_date(&mut self, value: Date, batch: &mut EventBatch) -> bool {
        let id = self.id();
        self.planned_start_date.set(id, value, batch)
    }

    pub fn set_due_date(&mut self, value: Date, batch: &mut EventBatch) -> bool {
        let id = self.id();
        self.due_date.set(id, value, batch)
    }

    pub fn set_actual_start_date(&mut self, value: Date, batch: &mut EventBatch) -> bool {
        let id = self.id();
        self.actual_start_date.set(id, value, batch)
    }

    /// Writes the completion date. Completing (finite date) forces the
    /// percentage to 100; un-completing leaves it alone.
    pub fn set_completion_date(&mut self, value: Date, batch: &mut EventBatch) -> bool {
        let id = self.id();
        let changed = self.completion_date.set(id, value, batch);
        if changed && value.is_finite() {
            self.percentage_complete.set(id, 100, batch);
        }
        changed
    }

    /// Writes the progress percentage, clamped to `0..=100`.
    pub fn set_percentage_complete(&mut self, value: u8, batch: &mut EventBatch) -> bool {
        let id = self.id();
        self.percentage_complete.set(id, value.min(100), batch)
    }

    pub fn set_budget(&mut self, value: TimeDelta, batch: &mut EventBatch) -> bool {
        let id = self.id();
        self.budget.set(id, value, batch)
    }

    pub fn set_hourly_fee_cents(&mut self, value: i64, batch: &mut EventBatch) -> bool {
        let id = self.id();
        self.hourly_fee_cents.set(id, value, batch)
    }

    pub fn set_fixed_fee_cents(&mut self, value: i64, batch: &mut EventBatch) -> bool {
        let id = self.id();
        self.fixed_fee_cents.set(id, value, batch)
    }

    pub fn set_priority(&mut self, value: i32, batch: &mut EventBatch) -> bool {
        let id = self.id();
        self.priority.set(id, value, batch)
    }

    pub fn set_recurrence(&mut self, value: Option<Recurrence>, batch: &mut EventBatch) -> bool {
        let id = self.id();
        self.recurrence.set(id, value, batch)
    }

    pub fn set_reminder(&mut self, value: Option<NaiveDateTime>, batch: &mut EventBatch) -> bool {
        let id = self.id();
        self.reminder.set(id, value, batch)
    }
}

impl Entity for Task {
    fn id(&self) -> EntityId {
        self.core.id()
    }

    fn kind(&self) -> EntityKind {
        EntityKind::Task
    }
}

impl Composite for Task {
    fn core(&self) -> &CompositeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut CompositeCore {
        &mut self.core
    }
}

#[cfg(test)]
mod tests {
    use super::Task;
    use crate::event::EventBatch;
    use crate::time::Date;

    #[test]
    fn completing_forces_full_percentage() {
        let mut task = Task::new("ship it");
        let mut batch = EventBatch::new();
        assert!(!task.is_completed());

        task.set_completion_date(Date::from_ymd(2021, 6, 1), &mut batch);
        assert!(task.is_completed());
        assert_eq!(task.percentage_complete(), 100);
    }

    #[test]
    fn percentage_is_clamped() {
        let mut task = Task::new("t");
        let mut batch = EventBatch::new();
        task.set_percentage_complete(250, &mut batch);
        assert_eq!(task.percentage_complete(), 100);
    }
}
