use chrono::NaiveDateTime;
use std::cell::RefCell;
use std::rc::Rc;
use taskdeck_core::{
    Date, DomainError, Effort, Recurrence, RecurrenceUnit, Task, TimeDelta, Workspace,
};

fn stamp(spec: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(spec, "%Y-%m-%d %H:%M:%S").unwrap()
}

#[test]
fn starting_a_second_effort_stops_the_first() {
    let mut ws = Workspace::new();
    let task = ws.add_task(Task::new("t"), None).unwrap();

    let starts = Rc::new(RefCell::new(0u32));
    let stops = Rc::new(RefCell::new(0u32));
    let start_sink = Rc::clone(&starts);
    ws.bus().subscribe("effort.track.start", None, move |_, _| {
        *start_sink.borrow_mut() += 1;
    });
    let stop_sink = Rc::clone(&stops);
    ws.bus().subscribe("effort.track.stop", None, move |_, _| {
        *stop_sink.borrow_mut() += 1;
    });

    let first = ws.start_tracking(task, stamp("2021-05-01 09:00:00"), None).unwrap();
    assert_eq!(*starts.borrow(), 1);

    let second = ws.start_tracking(task, stamp("2021-05-01 10:30:00"), None).unwrap();
    assert_eq!(*starts.borrow(), 2);
    assert_eq!(*stops.borrow(), 1);

    let first_record = ws.efforts().get(first).unwrap();
    assert_eq!(first_record.stop(), Some(stamp("2021-05-01 10:30:00")));
    assert!(ws.efforts().get(second).unwrap().is_tracking());
    assert_eq!(ws.tracking_effort(task), Some(second));
}

#[test]
fn stop_tracking_reports_whether_anything_was_running() {
    let mut ws = Workspace::new();
    let task = ws.add_task(Task::new("t"), None).unwrap();
    assert!(!ws.stop_tracking(task, stamp("2021-05-01 09:00:00"), None).unwrap());

    ws.start_tracking(task, stamp("2021-05-01 09:00:00"), None).unwrap();
    assert!(ws.stop_tracking(task, stamp("2021-05-01 09:45:00"), None).unwrap());
    assert_eq!(ws.tracking_effort(task), None);
}

#[test]
fn effort_stop_never_precedes_start() {
    let mut ws = Workspace::new();
    let task = ws.add_task(Task::new("t"), None).unwrap();
    let effort = Effort::with_id(
        uuid::Uuid::new_v4(),
        task,
        stamp("2021-05-01 10:00:00"),
        Some(stamp("2021-05-01 09:00:00")),
    );
    let err = ws.add_effort(effort, None).unwrap_err();
    assert!(matches!(err, DomainError::StopBeforeStart(_)));

    let effort = ws.start_tracking(task, stamp("2021-05-01 10:00:00"), None).unwrap();
    let err = ws
        .set_effort_stop(effort, Some(stamp("2021-05-01 09:59:59")), None)
        .unwrap_err();
    assert!(matches!(err, DomainError::StopBeforeStart(_)));
}

#[test]
fn clearing_the_stop_stamp_resumes_tracking_exclusively() {
    let mut ws = Workspace::new();
    let task = ws.add_task(Task::new("t"), None).unwrap();
    let first = ws.start_tracking(task, stamp("2021-05-01 09:00:00"), None).unwrap();
    ws.stop_tracking(task, stamp("2021-05-01 10:00:00"), None).unwrap();
    let second = ws.start_tracking(task, stamp("2021-05-01 11:00:00"), None).unwrap();

    ws.set_effort_stop(first, None, None).unwrap();

    assert!(ws.efforts().get(first).unwrap().is_tracking());
    assert!(!ws.efforts().get(second).unwrap().is_tracking());
    assert_eq!(ws.tracking_effort(task), Some(first));
}

#[test]
fn moving_an_effort_keeps_both_task_lists_in_step() {
    let mut ws = Workspace::new();
    let from = ws.add_task(Task::new("from"), None).unwrap();
    let to = ws.add_task(Task::new("to"), None).unwrap();
    let effort = ws
        .add_effort(
            Effort::with_id(
                uuid::Uuid::new_v4(),
                from,
                stamp("2021-05-01 09:00:00"),
                Some(stamp("2021-05-01 09:30:00")),
            ),
            None,
        )
        .unwrap();

    ws.set_effort_task(effort, to, None).unwrap();

    assert!(ws.tasks().get(from).unwrap().effort_ids().is_empty());
    assert_eq!(ws.tasks().get(to).unwrap().effort_ids(), &[effort]);
    assert_eq!(ws.efforts().get(effort).unwrap().task_id(), to);
}

#[test]
fn time_spent_sums_the_subtree_and_counts_tracking_up_to_now() {
    let mut ws = Workspace::new();
    let parent = ws.add_task(Task::new("p"), None).unwrap();
    let child = ws.add_task(Task::new("c"), None).unwrap();
    ws.add_child(parent, child, None).unwrap();
    ws.add_effort(
        Effort::with_id(
            uuid::Uuid::new_v4(),
            parent,
            stamp("2021-05-01 09:00:00"),
            Some(stamp("2021-05-01 10:00:00")),
        ),
        None,
    )
    .unwrap();
    ws.start_tracking(child, stamp("2021-05-01 11:00:00"), None).unwrap();
    let now = stamp("2021-05-01 11:30:00");

    assert_eq!(ws.time_spent(parent, false, now), TimeDelta::from_hours(1));
    assert_eq!(
        ws.time_spent(parent, true, now),
        TimeDelta::from_seconds(90 * 60)
    );
}

#[test]
fn tasks_wait_for_their_prerequisites() {
    let mut ws = Workspace::new();
    let prerequisite = ws.add_task(Task::new("first"), None).unwrap();
    let task = ws.add_task(Task::new("second"), None).unwrap();
    ws.add_prerequisite(task, prerequisite, None).unwrap();

    assert!(ws.task_is_inactive(task));
    ws.mark_completed(prerequisite, Date::from_ymd(2021, 5, 1), None).unwrap();
    assert!(!ws.task_is_inactive(task));

    ws.remove_prerequisite(task, prerequisite, None).unwrap();
    assert!(ws.tasks().get(task).unwrap().prerequisite_ids().is_empty());
}

#[test]
fn only_tasks_qualify_as_prerequisites() {
    let mut ws = Workspace::new();
    let task = ws.add_task(Task::new("t"), None).unwrap();
    let note = ws.add_note(taskdeck_core::Note::new("n"), None).unwrap();
    let err = ws.add_prerequisite(task, note, None).unwrap_err();
    assert!(matches!(err, DomainError::WrongKind { .. }));
}

#[test]
fn completing_a_recurring_task_advances_it_instead() {
    let mut ws = Workspace::new();
    let task = ws.add_task(Task::new("water plants"), None).unwrap();
    ws.set_planned_start_date(task, Date::from_ymd(2021, 5, 1), None).unwrap();
    ws.set_due_date(task, Date::from_ymd(2021, 5, 8), None).unwrap();
    ws.set_percentage_complete(task, 40, None).unwrap();
    ws.set_recurrence(task, Some(Recurrence::new(RecurrenceUnit::Weekly, 1)), None)
        .unwrap();

    ws.mark_completed(task, Date::from_ymd(2021, 5, 7), None).unwrap();

    let record = ws.tasks().get(task).unwrap();
    assert!(!record.is_completed());
    assert_eq!(record.planned_start_date(), Date::from_ymd(2021, 5, 8));
    assert_eq!(record.due_date(), Date::from_ymd(2021, 5, 15));
    assert_eq!(record.percentage_complete(), 0);
}

#[test]
fn bounded_recurrence_counts_down_to_a_real_completion() {
    let mut ws = Workspace::new();
    let task = ws.add_task(Task::new("t"), None).unwrap();
    ws.set_due_date(task, Date::from_ymd(2021, 5, 1), None).unwrap();
    ws.set_recurrence(
        task,
        Some(Recurrence::with_max(RecurrenceUnit::Daily, 1, 2)),
        None,
    )
    .unwrap();

    ws.mark_completed(task, Date::from_ymd(2021, 5, 1), None).unwrap();
    let record = ws.tasks().get(task).unwrap();
    assert!(!record.is_completed());
    assert_eq!(record.due_date(), Date::from_ymd(2021, 5, 2));
    assert_eq!(record.recurrence().unwrap().max, Some(1));

    ws.mark_completed(task, Date::from_ymd(2021, 5, 2), None).unwrap();
    let record = ws.tasks().get(task).unwrap();
    assert!(record.is_completed());
    assert_eq!(record.recurrence(), None);
    assert_eq!(record.percentage_complete(), 100);
}

#[test]
fn removing_a_tracking_task_announces_the_stop() {
    let mut ws = Workspace::new();
    let task = ws.add_task(Task::new("t"), None).unwrap();
    ws.start_tracking(task, stamp("2021-05-01 09:00:00"), None).unwrap();

    let stops = Rc::new(RefCell::new(0u32));
    let sink = Rc::clone(&stops);
    ws.bus().subscribe("effort.track.stop", None, move |_, _| {
        *sink.borrow_mut() += 1;
    });

    ws.remove_composite(task, None).unwrap();
    assert_eq!(*stops.borrow(), 1);
}

#[test]
fn removing_a_task_takes_its_efforts_along() {
    let mut ws = Workspace::new();
    let task = ws.add_task(Task::new("t"), None).unwrap();
    let effort = ws.start_tracking(task, stamp("2021-05-01 09:00:00"), None).unwrap();

    let graph = ws.remove_composite(task, None).unwrap();
    assert!(ws.efforts().get(effort).is_none());

    ws.restore_graph(graph, None).unwrap();
    assert!(ws.efforts().get(effort).unwrap().is_tracking());
    assert_eq!(ws.tasks().get(task).unwrap().effort_ids(), &[effort]);
}
