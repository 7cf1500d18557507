use std::collections::BTreeSet;
use taskdeck_core::{
    Category, ChangeMonitor, CommandHistory, Composite, Date, DeleteCommand, EditSubjectCommand,
    EntityKind, MarkCompletedCommand, NewTaskCommand, Recurrence, RecurrenceUnit, Task,
    ToggleCategoryCommand, Workspace,
};

fn ids(values: &[taskdeck_core::EntityId]) -> BTreeSet<taskdeck_core::EntityId> {
    values.iter().copied().collect()
}

#[test]
fn monitor_keeps_the_three_sets_disjoint() {
    let mut ws = Workspace::new();
    let committed = ws.add_task(Task::new("committed"), None).unwrap();
    let monitor = ChangeMonitor::new(&ws, &[EntityKind::Task]);
    assert!(monitor.is_clean());

    let fresh = ws.add_task(Task::new("fresh"), None).unwrap();
    ws.set_subject(fresh, "fresh, renamed", None).unwrap();
    ws.set_subject(committed, "committed, renamed", None).unwrap();

    // A modified fresh item stays in added only.
    assert_eq!(monitor.added(), ids(&[fresh]));
    assert_eq!(monitor.modified(), ids(&[committed]));
    assert!(monitor.removed().is_empty());

    ws.remove_composite(committed, None).unwrap();
    assert_eq!(monitor.removed(), ids(&[committed]));
    assert!(monitor.modified().is_empty());

    monitor.detach(ws.bus());
}

#[test]
fn adding_and_removing_between_resets_leaves_no_trace() {
    let mut ws = Workspace::new();
    let monitor = ChangeMonitor::new(&ws, &[EntityKind::Task]);

    let task = ws.add_task(Task::new("ephemeral"), None).unwrap();
    ws.remove_composite(task, None).unwrap();

    assert!(monitor.is_clean());
    monitor.detach(ws.bus());
}

#[test]
fn removing_a_committed_subtree_records_every_member() {
    let mut ws = Workspace::new();
    let parent = ws.add_task(Task::new("P"), None).unwrap();
    let child = ws.add_task(Task::new("C"), None).unwrap();
    ws.add_child(parent, child, None).unwrap();
    let monitor = ChangeMonitor::new(&ws, &[EntityKind::Task]);

    ws.remove_composite(parent, None).unwrap();

    assert_eq!(monitor.removed(), ids(&[parent, child]));
    assert!(monitor.added().is_empty());
    monitor.detach(ws.bus());
}

#[test]
fn reset_starts_a_fresh_round_and_keeps_following() {
    let mut ws = Workspace::new();
    let monitor = ChangeMonitor::new(&ws, &[EntityKind::Task]);
    let task = ws.add_task(Task::new("t"), None).unwrap();
    assert_eq!(monitor.added(), ids(&[task]));

    monitor.reset(&ws);
    assert!(monitor.is_clean());

    // The item now counts as committed.
    ws.set_subject(task, "renamed", None).unwrap();
    assert_eq!(monitor.modified(), ids(&[task]));
    monitor.detach(ws.bus());
}

#[test]
fn monitor_watches_only_its_kinds() {
    let mut ws = Workspace::new();
    let monitor = ChangeMonitor::new(&ws, &[EntityKind::Note]);
    ws.add_task(Task::new("t"), None).unwrap();
    assert!(monitor.is_clean());
    monitor.detach(ws.bus());
}

#[test]
fn delete_undo_redo_round_trips_the_observable_state() {
    let mut ws = Workspace::new();
    let mut history = CommandHistory::new();
    let parent = ws.add_task(Task::new("parent"), None).unwrap();
    let child = ws.add_task(Task::new("child"), None).unwrap();
    ws.add_child(parent, child, None).unwrap();
    let category = ws.add_category(Category::new("K"), None).unwrap();
    ws.add_category_link(category, child, None).unwrap();

    history.run(&mut ws, Box::new(DeleteCommand::new(parent))).unwrap();
    assert!(ws.tasks().is_empty());
    assert!(ws.categories().get(category).unwrap().categorizable_ids().is_empty());

    assert!(history.undo(&mut ws).unwrap());
    assert_eq!(ws.tasks().get(parent).unwrap().core().subject(), "parent");
    assert_eq!(ws.tasks().get(child).unwrap().category_ids(), vec![category]);
    assert_eq!(
        ws.categories().get(category).unwrap().categorizable_ids(),
        vec![child]
    );

    assert!(history.redo(&mut ws).unwrap());
    assert!(ws.tasks().is_empty());
}

#[test]
fn new_task_command_survives_an_undo_redo_cycle() {
    let mut ws = Workspace::new();
    let mut history = CommandHistory::new();
    history.run(&mut ws, Box::new(NewTaskCommand::new("groceries"))).unwrap();
    let task = ws.tasks().ids()[0];

    history.undo(&mut ws).unwrap();
    assert!(ws.tasks().is_empty());

    history.redo(&mut ws).unwrap();
    assert_eq!(ws.tasks().get(task).unwrap().core().subject(), "groceries");
}

#[test]
fn edit_subject_undo_restores_the_previous_name() {
    let mut ws = Workspace::new();
    let mut history = CommandHistory::new();
    let task = ws.add_task(Task::new("before"), None).unwrap();

    history
        .run(&mut ws, Box::new(EditSubjectCommand::new(task, "after")))
        .unwrap();
    assert_eq!(ws.tasks().get(task).unwrap().core().subject(), "after");

    history.undo(&mut ws).unwrap();
    assert_eq!(ws.tasks().get(task).unwrap().core().subject(), "before");
}

#[test]
fn toggle_category_flips_and_its_undo_flips_back() {
    let mut ws = Workspace::new();
    let mut history = CommandHistory::new();
    let category = ws.add_category(Category::new("K"), None).unwrap();
    let task = ws.add_task(Task::new("t"), None).unwrap();

    history
        .run(&mut ws, Box::new(ToggleCategoryCommand::new(category, task)))
        .unwrap();
    assert_eq!(ws.tasks().get(task).unwrap().category_ids(), vec![category]);

    history
        .run(&mut ws, Box::new(ToggleCategoryCommand::new(category, task)))
        .unwrap();
    assert!(ws.tasks().get(task).unwrap().category_ids().is_empty());

    history.undo(&mut ws).unwrap();
    assert_eq!(ws.tasks().get(task).unwrap().category_ids(), vec![category]);
    history.undo(&mut ws).unwrap();
    assert!(ws.tasks().get(task).unwrap().category_ids().is_empty());
}

#[test]
fn undoing_a_recurring_completion_restores_the_old_schedule() {
    let mut ws = Workspace::new();
    let mut history = CommandHistory::new();
    let task = ws.add_task(Task::new("weekly"), None).unwrap();
    ws.set_due_date(task, Date::from_ymd(2021, 5, 8), None).unwrap();
    ws.set_percentage_complete(task, 60, None).unwrap();
    ws.set_recurrence(task, Some(Recurrence::new(RecurrenceUnit::Weekly, 1)), None)
        .unwrap();

    history
        .run(
            &mut ws,
            Box::new(MarkCompletedCommand::new(task, Date::from_ymd(2021, 5, 7))),
        )
        .unwrap();
    assert_eq!(ws.tasks().get(task).unwrap().due_date(), Date::from_ymd(2021, 5, 15));

    history.undo(&mut ws).unwrap();
    let record = ws.tasks().get(task).unwrap();
    assert_eq!(record.due_date(), Date::from_ymd(2021, 5, 8));
    assert_eq!(record.percentage_complete(), 60);
    assert_eq!(
        record.recurrence(),
        Some(Recurrence::new(RecurrenceUnit::Weekly, 1))
    );
    assert!(!record.is_completed());
}
