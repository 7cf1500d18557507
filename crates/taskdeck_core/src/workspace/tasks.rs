//! Task rules that need the whole workspace: effort tracking, recurrence
//! and prerequisites.
//!
//! # Responsibility
//! - Expose the task attribute setters behind the batching contract.
//! - Enforce tracking exclusivity: at most one tracking effort per task.
//! - Advance recurring tasks instead of completing them.
//! - Derive task inactivity from prerequisite completion.
//!
//! # Invariants
//! - `effort.stop`, when set, never lies before `effort.start`.
//! - `task.efforts` and `effort.task` agree for every live effort.
//! - Track start/stop events use the effort as source and carry the owning
//!   task id, so one aggregate subscription sees all track traffic.

use crate::error::DomainError;
use crate::event::{EventBatch, Payload};
use crate::model::composite::Entity;
use crate::model::effort::Effort;
use crate::model::task::Task;
use crate::model::{
    EntityId, EntityKind, Recurrence, RecurrenceUnit, EFFORT_TRACK_START, EFFORT_TRACK_STOP,
};
use crate::time::{Date, TimeDelta};
use crate::workspace::Workspace;
use chrono::{Duration, Months, NaiveDateTime};
use log::info;

impl Workspace {
    fn expect_task_mut(&mut self, id: EntityId) -> Result<&mut Task, DomainError> {
        if self.tasks.contains(id) {
            return Ok(self.tasks.get_mut(id).expect("presence checked above"));
        }
        match self.kind_of(id) {
            Some(actual) => Err(DomainError::WrongKind {
                id,
                expected: EntityKind::Task,
                actual,
            }),
            None => Err(DomainError::UnknownEntity(id)),
        }
    }

    fn expect_effort_mut(&mut self, id: EntityId) -> Result<&mut Effort, DomainError> {
        if self.efforts.contains(id) {
            return Ok(self.efforts.get_mut(id).expect("presence checked above"));
        }
        match self.kind_of(id) {
            Some(actual) => Err(DomainError::WrongKind {
                id,
                expected: EntityKind::Effort,
                actual,
            }),
            None => Err(DomainError::UnknownEntity(id)),
        }
    }

    // ---- attribute setters ---------------------------------------------

    pub fn set_planned_start_date(
        &mut self,
        task: EntityId,
        value: Date,
        batch: Option<&mut EventBatch>,
    ) -> Result<(), DomainError> {
        self.transact(batch, |ws, batch| {
            ws.expect_task_mut(task)?.set_planned_start_date(value, batch);
            Ok(())
        })
    }

    pub fn set_due_date(
        &mut self,
        task: EntityId,
        value: Date,
        batch: Option<&mut EventBatch>,
    ) -> Result<(), DomainError> {
        self.transact(batch, |ws, batch| {
            ws.expect_task_mut(task)?.set_due_date(value, batch);
            Ok(())
        })
    }

    pub fn set_actual_start_date(
        &mut self,
        task: EntityId,
        value: Date,
        batch: Option<&mut EventBatch>,
    ) -> Result<(), DomainError> {
        self.transact(batch, |ws, batch| {
            ws.expect_task_mut(task)?.set_actual_start_date(value, batch);
            Ok(())
        })
    }

    pub fn set_completion_date(
        &mut self,
        task: EntityId,
        value: Date,
        batch: Option<&mut EventBatch>,
    ) -> Result<(), DomainError> {
        self.transact(batch, |ws, batch| {
            ws.expect_task_mut(task)?.set_completion_date(value, batch);
            Ok(())
        })
    }

    pub fn set_percentage_complete(
        &mut self,
        task: EntityId,
        value: u8,
        batch: Option<&mut EventBatch>,
    ) -> Result<(), DomainError> {
        self.transact(batch, |ws, batch| {
            ws.expect_task_mut(task)?.set_percentage_complete(value, batch);
            Ok(())
        })
    }

    pub fn set_budget(
        &mut self,
        task: EntityId,
        value: TimeDelta,
        batch: Option<&mut EventBatch>,
    ) -> Result<(), DomainError> {
        self.transact(batch, |ws, batch| {
            ws.expect_task_mut(task)?.set_budget(value, batch);
            Ok(())
        })
    }

    pub fn set_hourly_fee_cents(
        &mut self,
        task: EntityId,
        value: i64,
        batch: Option<&mut EventBatch>,
    ) -> Result<(), DomainError> {
        self.transact(batch, |ws, batch| {
            ws.expect_task_mut(task)?.set_hourly_fee_cents(value, batch);
            Ok(())
        })
    }

    pub fn set_fixed_fee_cents(
        &mut self,
        task: EntityId,
        value: i64,
        batch: Option<&mut EventBatch>,
    ) -> Result<(), DomainError> {
        self.transact(batch, |ws, batch| {
            ws.expect_task_mut(task)?.set_fixed_fee_cents(value, batch);
            Ok(())
        })
    }

    pub fn set_priority(
        &mut self,
        task: EntityId,
        value: i32,
        batch: Option<&mut EventBatch>,
    ) -> Result<(), DomainError> {
        self.transact(batch, |ws, batch| {
            ws.expect_task_mut(task)?.set_priority(value, batch);
            Ok(())
        })
    }

    pub fn set_recurrence(
        &mut self,
        task: EntityId,
        value: Option<Recurrence>,
        batch: Option<&mut EventBatch>,
    ) -> Result<(), DomainError> {
        self.transact(batch, |ws, batch| {
            ws.expect_task_mut(task)?.set_recurrence(value, batch);
            Ok(())
        })
    }

    pub fn set_reminder(
        &mut self,
        task: EntityId,
        value: Option<NaiveDateTime>,
        batch: Option<&mut EventBatch>,
    ) -> Result<(), DomainError> {
        self.transact(batch, |ws, batch| {
            ws.expect_task_mut(task)?.set_reminder(value, batch);
            Ok(())
        })
    }

    // ---- prerequisites -------------------------------------------------

    pub fn add_prerequisite(
        &mut self,
        task: EntityId,
        prerequisite: EntityId,
        batch: Option<&mut EventBatch>,
    ) -> Result<(), DomainError> {
        self.transact(batch, |ws, batch| {
            ws.expect_task_mut(prerequisite)?;
            let record = ws.expect_task_mut(task)?;
            record.prerequisites.insert(task, prerequisite, batch);
            Ok(())
        })
    }

    pub fn remove_prerequisite(
        &mut self,
        task: EntityId,
        prerequisite: EntityId,
        batch: Option<&mut EventBatch>,
    ) -> Result<(), DomainError> {
        self.transact(batch, |ws, batch| {
            let record = ws.expect_task_mut(task)?;
            record.prerequisites.remove(task, prerequisite, batch);
            Ok(())
        })
    }

    /// A task is inactive while any prerequisite is not yet completed.
    /// Prerequisite ids that no longer resolve are ignored.
    pub fn task_is_inactive(&self, task: EntityId) -> bool {
        let Some(record) = self.tasks.get(task) else {
            return false;
        };
        record
            .prerequisite_ids()
            .into_iter()
            .filter_map(|id| self.tasks.get(id))
            .any(|prerequisite| !prerequisite.is_completed())
    }

    // ---- completion and recurrence -------------------------------------

    /// Completes a task, or advances it when it recurs.
    ///
    /// A recurring task keeps its completion date infinite: the planned,
    /// due and actual start dates shift by one period and the percentage
    /// resets. A bounded recurrence counts down; at zero it is cleared and
    /// the task completes for real.
    pub fn mark_completed(
        &mut self,
        task: EntityId,
        completion: Date,
        batch: Option<&mut EventBatch>,
    ) -> Result<(), DomainError> {
        self.transact(batch, |ws, batch| {
            let record = ws.expect_task_mut(task)?;
            let Some(recurrence) = record.recurrence() else {
                record.set_completion_date(completion, batch);
                return Ok(());
            };
            if matches!(recurrence.max, Some(remaining) if remaining <= 1) {
                record.set_recurrence(None, batch);
                record.set_completion_date(completion, batch);
                return Ok(());
            }

            let planned = advance_date(record.planned_start_date(), recurrence);
            let due = advance_date(record.due_date(), recurrence);
            let actual = advance_date(record.actual_start_date(), recurrence);
            record.set_planned_start_date(planned, batch);
            record.set_due_date(due, batch);
            record.set_actual_start_date(actual, batch);
            record.set_percentage_complete(0, batch);
            if let Some(remaining) = recurrence.max {
                record.set_recurrence(
                    Some(Recurrence {
                        max: Some(remaining - 1),
                        ..recurrence
                    }),
                    batch,
                );
            }
            info!(
                "event=task_recurred module=workspace task={} unit={:?} amount={}",
                task, recurrence.unit, recurrence.amount
            );
            Ok(())
        })
    }

    // ---- effort tracking -----------------------------------------------

    /// The tracking effort of `task`, if one exists.
    pub fn tracking_effort(&self, task: EntityId) -> Option<EntityId> {
        let record = self.tasks.get(task)?;
        record
            .effort_ids()
            .iter()
            .copied()
            .find(|id| self.efforts.get(*id).map(Effort::is_tracking).unwrap_or(false))
    }

    /// Starts tracking a new effort on `task`. Any effort already tracking
    /// on the task is stopped at the new effort's start stamp.
    pub fn start_tracking(
        &mut self,
        task: EntityId,
        start: NaiveDateTime,
        batch: Option<&mut EventBatch>,
    ) -> Result<EntityId, DomainError> {
        self.add_effort(Effort::tracking(task, start), batch)
    }

    /// Stops the tracking effort of `task`, if any. Returns whether an
    /// effort was actually stopped.
    pub fn stop_tracking(
        &mut self,
        task: EntityId,
        stop: NaiveDateTime,
        batch: Option<&mut EventBatch>,
    ) -> Result<bool, DomainError> {
        self.transact(batch, |ws, batch| {
            ws.expect_task_mut(task)?;
            let Some(effort_id) = ws.tracking_effort(task) else {
                return Ok(false);
            };
            ws.stop_one(effort_id, task, stop, batch)?;
            Ok(true)
        })
    }

    /// Inserts an effort under its owning task. A tracking effort first
    /// stops whatever the task was tracking.
    pub fn add_effort(
        &mut self,
        effort: Effort,
        batch: Option<&mut EventBatch>,
    ) -> Result<EntityId, DomainError> {
        self.transact(batch, |ws, batch| {
            let task = effort.task_id();
            ws.expect_task_mut(task)?;
            if let Some(stop) = effort.stop() {
                if stop < effort.start() {
                    return Err(DomainError::StopBeforeStart(effort.id()));
                }
            }
            if effort.is_tracking() {
                if let Some(previous) = ws.tracking_effort(task) {
                    ws.stop_one(previous, task, effort.start(), batch)?;
                }
            }
            let tracking = effort.is_tracking();
            let id = ws.efforts.insert(effort, batch)?;
            let record = ws.expect_task_mut(task)?;
            record.efforts.push(id);
            let efforts = record.efforts.clone();
            batch.stage("task.efforts", task, Payload::Ids(efforts));
            if tracking {
                batch.stage(EFFORT_TRACK_START, id, Payload::Ids(vec![task]));
            }
            Ok(id)
        })
    }

    /// Removes an effort. Removing a tracking effort counts as a stop.
    pub fn remove_effort(
        &mut self,
        effort_id: EntityId,
        batch: Option<&mut EventBatch>,
    ) -> Result<Effort, DomainError> {
        self.transact(batch, |ws, batch| {
            ws.expect_effort_mut(effort_id)?;
            let effort = ws
                .efforts
                .remove(effort_id, batch)
                .ok_or(DomainError::UnknownEntity(effort_id))?;
            let task = effort.task_id();
            if let Some(record) = ws.tasks.get_mut(task) {
                record.efforts.retain(|candidate| *candidate != effort_id);
                let efforts = record.efforts.clone();
                batch.stage("task.efforts", task, Payload::Ids(efforts));
            }
            if effort.is_tracking() {
                batch.stage(EFFORT_TRACK_STOP, effort_id, Payload::Ids(vec![task]));
            }
            Ok(effort)
        })
    }

    pub fn set_effort_start(
        &mut self,
        effort_id: EntityId,
        start: NaiveDateTime,
        batch: Option<&mut EventBatch>,
    ) -> Result<(), DomainError> {
        self.transact(batch, |ws, batch| {
            let effort = ws.expect_effort_mut(effort_id)?;
            if let Some(stop) = effort.stop() {
                if stop < start {
                    return Err(DomainError::StopBeforeStart(effort_id));
                }
            }
            effort.set_start(start, batch);
            Ok(())
        })
    }

    /// Writes the stop stamp. Clearing it resumes tracking, which stops any
    /// other effort tracking on the same task.
    pub fn set_effort_stop(
        &mut self,
        effort_id: EntityId,
        stop: Option<NaiveDateTime>,
        batch: Option<&mut EventBatch>,
    ) -> Result<(), DomainError> {
        self.transact(batch, |ws, batch| {
            let effort = ws.expect_effort_mut(effort_id)?;
            let was_tracking = effort.is_tracking();
            let task = effort.task_id();
            let start = effort.start();
            match stop {
                Some(stop) if stop < start => Err(DomainError::StopBeforeStart(effort_id)),
                Some(stop) => {
                    if effort.set_stop(Some(stop), batch) && was_tracking {
                        batch.stage(EFFORT_TRACK_STOP, effort_id, Payload::Ids(vec![task]));
                    }
                    Ok(())
                }
                None => {
                    if was_tracking {
                        return Ok(());
                    }
                    if let Some(previous) = ws.tracking_effort(task) {
                        ws.stop_one(previous, task, start, batch)?;
                    }
                    let effort = ws.expect_effort_mut(effort_id)?;
                    effort.set_stop(None, batch);
                    batch.stage(EFFORT_TRACK_START, effort_id, Payload::Ids(vec![task]));
                    Ok(())
                }
            }
        })
    }

    /// Moves an effort to another task, keeping both effort lists in step.
    pub fn set_effort_task(
        &mut self,
        effort_id: EntityId,
        task: EntityId,
        batch: Option<&mut EventBatch>,
    ) -> Result<(), DomainError> {
        self.transact(batch, |ws, batch| {
            ws.expect_task_mut(task)?;
            let effort = ws.expect_effort_mut(effort_id)?;
            let previous = effort.task_id();
            if previous == task {
                return Ok(());
            }
            let tracking = effort.is_tracking();
            let start = effort.start();
            if tracking {
                if let Some(other) = ws.tracking_effort(task) {
                    ws.stop_one(other, task, start, batch)?;
                }
            }
            let effort = ws.expect_effort_mut(effort_id)?;
            effort.set_task_id(task, batch);
            if let Some(record) = ws.tasks.get_mut(previous) {
                record.efforts.retain(|candidate| *candidate != effort_id);
                let efforts = record.efforts.clone();
                batch.stage("task.efforts", previous, Payload::Ids(efforts));
            }
            let record = ws.expect_task_mut(task)?;
            record.efforts.push(effort_id);
            let efforts = record.efforts.clone();
            batch.stage("task.efforts", task, Payload::Ids(efforts));
            Ok(())
        })
    }

    /// Total effort duration of a task, optionally including descendants.
    /// Tracking efforts count up to `now`.
    pub fn time_spent(&self, task: EntityId, recursive: bool, now: NaiveDateTime) -> TimeDelta {
        let mut subjects = vec![task];
        if recursive {
            subjects.extend(self.descendants(task));
        }
        let mut total = TimeDelta::ZERO;
        for subject in subjects {
            let Some(record) = self.tasks.get(subject) else {
                continue;
            };
            for effort_id in record.effort_ids() {
                if let Some(effort) = self.efforts.get(*effort_id) {
                    total = total + effort.duration(now);
                }
            }
        }
        total
    }

    fn stop_one(
        &mut self,
        effort_id: EntityId,
        task: EntityId,
        stop: NaiveDateTime,
        batch: &mut EventBatch,
    ) -> Result<(), DomainError> {
        let effort = self.expect_effort_mut(effort_id)?;
        let stop = stop.max(effort.start());
        effort.set_stop(Some(stop), batch);
        batch.stage(EFFORT_TRACK_STOP, effort_id, Payload::Ids(vec![task]));
        Ok(())
    }
}

/// One recurrence period forward; `Infinite` stays put.
fn advance_date(date: Date, recurrence: Recurrence) -> Date {
    let Some(naive) = date.naive() else {
        return date;
    };
    let amount = recurrence.amount.max(1);
    let shifted = match recurrence.unit {
        RecurrenceUnit::Daily => naive.checked_add_signed(Duration::days(amount as i64)),
        RecurrenceUnit::Weekly => naive.checked_add_signed(Duration::days(7 * amount as i64)),
        RecurrenceUnit::Monthly => naive.checked_add_months(Months::new(amount)),
        RecurrenceUnit::Yearly => naive.checked_add_months(Months::new(12 * amount)),
    };
    shifted.map(Date::Finite).unwrap_or(Date::Infinite)
}

#[cfg(test)]
mod tests {
    use super::advance_date;
    use crate::model::{Recurrence, RecurrenceUnit};
    use crate::time::Date;

    #[test]
    fn monthly_advance_clamps_to_month_end() {
        let recurrence = Recurrence::new(RecurrenceUnit::Monthly, 1);
        assert_eq!(
            advance_date(Date::from_ymd(2021, 1, 31), recurrence),
            Date::from_ymd(2021, 2, 28)
        );
    }

    #[test]
    fn infinite_dates_do_not_advance() {
        let recurrence = Recurrence::new(RecurrenceUnit::Daily, 1);
        assert_eq!(advance_date(Date::Infinite, recurrence), Date::Infinite);
    }
}
