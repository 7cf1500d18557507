use std::cell::RefCell;
use std::rc::Rc;
use taskdeck_core::{Category, CategoryFilter, FilterMode, Note, Payload, Rgba, Task, Workspace};

#[test]
fn membership_is_bidirectional_with_exactly_two_events() {
    let mut ws = Workspace::new();
    let work = ws.add_category(Category::new("Work"), None).unwrap();
    let task = ws.add_task(Task::new("T"), None).unwrap();

    let member_events = Rc::new(RefCell::new(Vec::new()));
    let category_sink = Rc::clone(&member_events);
    ws.bus()
        .subscribe("category.categorizable.add", Some(work), move |_, event| {
            category_sink.borrow_mut().push(event.payload.clone());
        });
    let item_events = Rc::new(RefCell::new(0u32));
    let item_sink = Rc::clone(&item_events);
    ws.bus()
        .subscribe("task.categories", Some(task), move |_, _| {
            *item_sink.borrow_mut() += 1;
        });

    ws.add_category_link(work, task, None).unwrap();

    assert_eq!(
        ws.categories().get(work).unwrap().categorizable_ids(),
        vec![task]
    );
    assert_eq!(ws.tasks().get(task).unwrap().category_ids(), vec![work]);
    assert_eq!(*member_events.borrow(), vec![Payload::Ids(vec![task])]);
    assert_eq!(*item_events.borrow(), 1);
}

#[test]
fn removing_a_link_clears_both_sides() {
    let mut ws = Workspace::new();
    let category = ws.add_category(Category::new("K"), None).unwrap();
    let note = ws.add_note(Note::new("n"), None).unwrap();
    ws.add_category_link(category, note, None).unwrap();

    ws.remove_category_link(category, note, None).unwrap();

    assert!(ws.categories().get(category).unwrap().categorizable_ids().is_empty());
    assert!(ws.notes().get(note).unwrap().category_ids().is_empty());
}

#[test]
fn contains_in_tree_mode_sees_the_whole_family() {
    let mut ws = Workspace::new();
    let category = ws.add_category(Category::new("K"), None).unwrap();
    let parent = ws.add_task(Task::new("P"), None).unwrap();
    let child = ws.add_task(Task::new("C"), None).unwrap();
    ws.add_child(parent, child, None).unwrap();
    ws.add_category_link(category, child, None).unwrap();

    assert!(ws.category_contains(category, child, false));
    assert!(!ws.category_contains(category, parent, false));
    assert!(ws.category_contains(category, parent, true));

    // Tree-mode containment always traces back to a flat member somewhere
    // in the family.
    let flat_somewhere = ws
        .family(parent)
        .iter()
        .any(|id| ws.category_contains(category, *id, false));
    assert!(flat_somewhere);
}

#[test]
fn exclusive_subcategories_keep_members_out_of_the_parent() {
    let mut ws = Workspace::new();
    let parent = ws.add_category(Category::new("parent"), None).unwrap();
    let child = ws.add_category(Category::new("child"), None).unwrap();
    ws.add_child(parent, child, None).unwrap();
    let task = ws.add_task(Task::new("t"), None).unwrap();
    ws.add_category_link(child, task, None).unwrap();

    assert!(ws.category_contains(parent, task, false));

    ws.set_exclusive_subcategories(parent, true, None).unwrap();
    assert!(!ws.category_contains(parent, task, false));
    assert!(ws.category_contains(child, task, false));
}

#[test]
fn filter_tree_mode_includes_ancestors_of_matches() {
    let mut ws = Workspace::new();
    let parent = ws.add_task(Task::new("P"), None).unwrap();
    let child = ws.add_task(Task::new("C"), None).unwrap();
    ws.add_child(parent, child, None).unwrap();
    let category = ws.add_category(Category::new("K"), None).unwrap();
    ws.add_category_link(category, child, None).unwrap();
    ws.set_category_filtered(category, true, None).unwrap();

    let mut tree = CategoryFilter::new(&ws, FilterMode::Any, true);
    assert_eq!(tree.items(&ws), vec![parent, child]);

    let mut flat = CategoryFilter::new(&ws, FilterMode::Any, false);
    assert_eq!(flat.items(&ws), vec![child]);
}

#[test]
fn empty_filter_includes_everything() {
    let mut ws = Workspace::new();
    let task = ws.add_task(Task::new("t"), None).unwrap();
    let note = ws.add_note(Note::new("n"), None).unwrap();
    let mut filter = CategoryFilter::new(&ws, FilterMode::All, false);
    assert_eq!(filter.items(&ws), vec![task, note]);
}

#[test]
fn all_mode_requires_every_filtered_category() {
    let mut ws = Workspace::new();
    let both = ws.add_task(Task::new("both"), None).unwrap();
    let one = ws.add_task(Task::new("one"), None).unwrap();
    let home = ws.add_category(Category::new("home"), None).unwrap();
    let urgent = ws.add_category(Category::new("urgent"), None).unwrap();
    ws.add_category_link(home, both, None).unwrap();
    ws.add_category_link(urgent, both, None).unwrap();
    ws.add_category_link(home, one, None).unwrap();
    ws.set_category_filtered(home, true, None).unwrap();
    ws.set_category_filtered(urgent, true, None).unwrap();

    let mut all = CategoryFilter::new(&ws, FilterMode::All, false);
    assert_eq!(all.items(&ws), vec![both]);
    let mut any = CategoryFilter::new(&ws, FilterMode::Any, false);
    assert_eq!(any.items(&ws), vec![both, one]);
}

#[test]
fn filter_goes_stale_on_flag_changes_and_emits_deltas() {
    let mut ws = Workspace::new();
    let task = ws.add_task(Task::new("t"), None).unwrap();
    let other = ws.add_task(Task::new("u"), None).unwrap();
    let category = ws.add_category(Category::new("K"), None).unwrap();
    ws.add_category_link(category, task, None).unwrap();

    let mut filter = CategoryFilter::new(&ws, FilterMode::Any, false);
    assert_eq!(filter.items(&ws), vec![task, other]);

    let removed = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&removed);
    ws.bus().subscribe(
        taskdeck_core::filter::FILTER_ITEMS_REMOVED,
        Some(filter.source_id()),
        move |_, event| {
            sink.borrow_mut().push(event.payload.clone());
        },
    );

    ws.set_category_filtered(category, true, None).unwrap();
    assert_eq!(filter.items(&ws), vec![task]);
    assert_eq!(*removed.borrow(), vec![Payload::Ids(vec![other])]);
}

#[test]
fn removing_a_category_unlinks_surviving_members() {
    let mut ws = Workspace::new();
    let category = ws.add_category(Category::new("K"), None).unwrap();
    let task = ws.add_task(Task::new("t"), None).unwrap();
    ws.add_category_link(category, task, None).unwrap();

    let graph = ws.remove_composite(category, None).unwrap();
    assert!(ws.tasks().get(task).unwrap().category_ids().is_empty());

    ws.restore_graph(graph, None).unwrap();
    assert_eq!(ws.tasks().get(task).unwrap().category_ids(), vec![category]);
    assert_eq!(
        ws.categories().get(category).unwrap().categorizable_ids(),
        vec![task]
    );
}

#[test]
fn effective_color_falls_back_to_category_mix() {
    let mut ws = Workspace::new();
    let red = ws.add_category(Category::new("red"), None).unwrap();
    let blue = ws.add_category(Category::new("blue"), None).unwrap();
    ws.set_foreground_color(red, Some(Rgba::opaque(255, 0, 0)), None)
        .unwrap();
    ws.set_foreground_color(blue, Some(Rgba::opaque(0, 0, 255)), None)
        .unwrap();
    let task = ws.add_task(Task::new("t"), None).unwrap();
    ws.add_category_link(red, task, None).unwrap();
    ws.add_category_link(blue, task, None).unwrap();

    assert_eq!(
        ws.effective_foreground_color(task, false),
        Some(Rgba::opaque(127, 0, 127))
    );

    // Own colour wins over the mix.
    ws.set_foreground_color(task, Some(Rgba::opaque(1, 2, 3)), None)
        .unwrap();
    assert_eq!(
        ws.effective_foreground_color(task, false),
        Some(Rgba::opaque(1, 2, 3))
    );
}

#[test]
fn effective_color_inherits_from_parent_in_tree_mode_only() {
    let mut ws = Workspace::new();
    let parent = ws.add_task(Task::new("p"), None).unwrap();
    let child = ws.add_task(Task::new("c"), None).unwrap();
    ws.add_child(parent, child, None).unwrap();
    ws.set_background_color(parent, Some(Rgba::opaque(9, 9, 9)), None)
        .unwrap();

    assert_eq!(
        ws.effective_background_color(child, true),
        Some(Rgba::opaque(9, 9, 9))
    );
    assert_eq!(ws.effective_background_color(child, false), None);
}

#[test]
fn effort_appearance_delegates_to_the_owning_task() {
    let mut ws = Workspace::new();
    let task = ws.add_task(Task::new("t"), None).unwrap();
    ws.set_foreground_color(task, Some(Rgba::opaque(5, 6, 7)), None)
        .unwrap();
    let start = chrono::NaiveDate::from_ymd_opt(2021, 3, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    let effort = ws.start_tracking(task, start, None).unwrap();

    assert_eq!(
        ws.effective_foreground_color(effort, false),
        Some(Rgba::opaque(5, 6, 7))
    );
}
